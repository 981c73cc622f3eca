//! The shared world raster and its storage boundary.

pub mod raster;
pub mod store;

pub use raster::{Cell, LightSnapshot, RasterReader, RasterWriter, Region, WorldRaster};
pub use store::{MemoryStore, StoredCell, WorldStore};
