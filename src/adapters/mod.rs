//! Infrastructure adapters. Implement outbound ports.
//!
//! Filesystem storage, transport boundary, maintenance console. Map errors to DomainError.

pub mod persistence;
pub mod transport;
pub mod ui;
