//! The tile catalogue: per-material properties consumed by lighting.

use ember_utils::TileId;

/// Static properties of one tile material.
#[derive(Debug, Clone)]
pub struct TileKind {
    /// Human-readable material name.
    pub name: &'static str,
    /// How much of the passing light this material absorbs, in `0.0..=1.0`.
    /// Air is `0.0`; a fully opaque block is `1.0`.
    pub opacity: f32,
    /// Base light intensity emitted by this material, `0.0` for non-emitters.
    pub luminance: f32,
    /// Whether the material blocks movement. Unused by lighting, kept for
    /// the physics collaborator.
    pub solid: bool,
}

/// Registry of tile materials, indexed by [`TileId`].
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct TileCatalogue {
    kinds: Vec<TileKind>,
}

impl TileCatalogue {
    /// The id every raster cell starts from.
    pub const AIR: TileId = TileId(0);

    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Creates a catalogue with the built-in material set.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalogue = Self::new();
        catalogue.register(TileKind {
            name: "air",
            opacity: 0.0,
            luminance: 0.0,
            solid: false,
        });
        catalogue.register(TileKind {
            name: "dirt",
            opacity: 0.7,
            luminance: 0.0,
            solid: true,
        });
        catalogue.register(TileKind {
            name: "stone",
            opacity: 0.8,
            luminance: 0.0,
            solid: true,
        });
        catalogue.register(TileKind {
            name: "glass",
            opacity: 0.1,
            luminance: 0.0,
            solid: true,
        });
        catalogue.register(TileKind {
            name: "torch",
            opacity: 0.0,
            luminance: 1.0,
            solid: false,
        });
        catalogue
    }

    /// Registers a material and returns its id.
    pub fn register(&mut self, kind: TileKind) -> TileId {
        let id = TileId(self.kinds.len() as u16);
        self.kinds.push(kind);
        id
    }

    /// Looks up a material by id.
    #[must_use]
    pub fn by_id(&self, id: TileId) -> Option<&TileKind> {
        self.kinds.get(id.0 as usize)
    }

    /// Looks up a material by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<TileId> {
        self.kinds
            .iter()
            .position(|kind| kind.name == name)
            .map(|index| TileId(index as u16))
    }

    /// Returns the opacity for an id. Unknown ids are treated as transparent,
    /// matching the flood-fill's boundary behaviour.
    #[must_use]
    #[inline]
    pub fn opacity(&self, id: TileId) -> f32 {
        self.by_id(id).map_or(0.0, |kind| kind.opacity)
    }

    /// Returns the emitted intensity for an id, `0.0` when unknown.
    #[must_use]
    #[inline]
    pub fn luminance(&self, id: TileId) -> f32 {
        self.by_id(id).map_or(0.0, |kind| kind.luminance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let catalogue = TileCatalogue::with_defaults();

        let air = catalogue.by_name("air").expect("air registered");
        assert_eq!(air, TileCatalogue::AIR);
        assert_eq!(catalogue.opacity(air), 0.0);

        let torch = catalogue.by_name("torch").expect("torch registered");
        assert!(catalogue.luminance(torch) > 0.0);
    }

    #[test]
    fn test_unknown_id_is_transparent() {
        let catalogue = TileCatalogue::with_defaults();
        let bogus = TileId(999);

        assert!(catalogue.by_id(bogus).is_none());
        assert_eq!(catalogue.opacity(bogus), 0.0);
        assert_eq!(catalogue.luminance(bogus), 0.0);
    }
}
