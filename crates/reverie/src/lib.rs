//! Reverie - Long-term memory engine for game NPCs
//!
//! This crate turns a stream of in-game experiences into tiered, searchable
//! memory records and assembles budgeted memory context for dialogue prompts.

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod retrieval;
pub mod search;
pub mod store;
pub mod testing;
pub mod validate;

pub use config::MemoryConfig;
pub use engine::{MemoryEngine, TieredMemories};
pub use error::MemoryError;
pub use record::{EventInput, MemoryRecord, RelationshipState, RetrievalQuery, Tier};
