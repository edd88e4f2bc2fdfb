//! Planning poker real-time engine: wire events, the voting round state
//! machine and the session coordinator.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod voting;

pub use coordinator::SessionCoordinator;
pub use error::RealtimeError;
pub use events::{ClientEvent, RoomSnapshot, RoomTarget, RoundView, ServerEvent, VotingState};
pub use voting::VotingRounds;
