//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod chat_message_repo;
pub mod participant_repo;
pub mod planning_session_repo;
pub mod project_repo;
pub mod topic_repo;
pub mod user_repo;
pub mod vote_repo;
pub mod voting_round_repo;

pub use chat_message_repo::ChatMessageRepo;
pub use participant_repo::ParticipantRepo;
pub use planning_session_repo::PlanningSessionRepo;
pub use project_repo::{ProjectMemberRepo, ProjectRepo};
pub use topic_repo::TopicRepo;
pub use user_repo::UserRepo;
pub use vote_repo::VoteRepo;
pub use voting_round_repo::VotingRoundRepo;
