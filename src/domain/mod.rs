//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    AdminRole, BackupSet, GeneralStats, GroupMetadata, GroupSettings, GroupSnapshot, GroupStats,
    MessageKind, MessageRecord, Participant,
};
pub use errors::DomainError;
