//! Core of the ember tile-world engine: concurrent chunk streaming and
//! incremental flood-fill lighting.
//!
//! The crate is built from four cooperating pieces:
//!
//! - [`scheduler::TaskScheduler`] — a fixed-size worker pool draining a
//!   priority queue of opaque work items, with tag-indexed completion
//!   buckets and targeted blocking waits.
//! - [`chunk::ChunkLoader`] — the per-chunk phase state machine
//!   (`NeedsLoading -> NeedsLighting -> ReadyToDraw`) that submits load and
//!   light work while honouring spatial dependencies.
//! - [`light::LightEngine`] — the incremental light propagation engine over
//!   the shared world raster, supporting both addition and removal of light
//!   sources without a full recompute.
//! - [`world::WorldRaster`] — the shared per-tile grid all of the above
//!   read and write through scoped guards.
//!
//! Rendering, input, persistence, and simulation are external collaborators;
//! they consume phase events and light snapshots and never touch the raster
//! directly.

pub mod chunk;
pub mod config;
pub mod light;
pub mod scheduler;
pub mod tile;
pub mod world;
