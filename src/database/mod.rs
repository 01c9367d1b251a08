pub mod lancedb;

pub use lancedb::{Collection, CollectionStore, ScoredChunk};
