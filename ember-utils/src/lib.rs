//! Shared leaf types for the ember tile-world engine.
//!
//! This crate holds the position and identifier newtypes, the 2D vector
//! math, and the deduplicating FIFO used by the higher layers. It has no
//! knowledge of chunks, lighting, or scheduling.

pub mod math;
pub mod queue_set;
mod types;

pub use queue_set::QueueSet;
pub use types::{ChunkPos, TileId, TilePos, WallId};
