//! groupkeeper: flat-file group state engine for a chat bot, Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
