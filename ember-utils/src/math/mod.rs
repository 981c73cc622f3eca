//! Small vector math shared across the engine.

pub mod vector2;

pub use vector2::Vector2;
