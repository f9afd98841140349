//! Record types, classification, and text derivation

pub mod classify;
pub mod truncate;
pub mod types;

pub use classify::{Classification, classify};
pub use truncate::derive_short_text;
pub use types::{
    AttrKey, AttrValue, EventInput, MemoryRecord, RelationshipDelta, RelationshipState,
    RetrievalQuery, Tier,
};
