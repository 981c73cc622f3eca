//! Incremental flood-fill light propagation over the world raster.

pub mod direction;
pub mod engine;
pub mod queue;
pub mod worker;

pub use direction::Direction;
pub use engine::{LightEngine, MAX_LIGHT};
pub use queue::LightQueue;
pub use worker::LightWorker;
