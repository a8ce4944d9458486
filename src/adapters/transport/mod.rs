//! Transport boundary. Raw protocol payloads, their mapping to domain entities, inbound
//! intake and an in-memory gateway. The live protocol client implements `GroupGateway`
//! outside this crate.

pub mod intake;
pub mod mapper;
pub mod mock_gateway;
pub mod payload;

pub use intake::{IntakeSummary, MessageIntake};
pub use mock_gateway::MockGateway;
