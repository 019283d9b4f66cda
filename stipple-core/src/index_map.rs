//! Dense W×H grid mapping each pixel to its owning generator index.

/// Immutable nearest-generator assignment for a W×H pixel grid.
///
/// `get(x, y)` always returns an index in `0..count()`; backends are
/// responsible for upholding that invariant when building one.
#[derive(Debug, Clone)]
pub struct IndexMap {
    width: u32,
    height: u32,
    count: u32,
    data: Vec<u32>,
}

impl IndexMap {
    /// Build an index map from row-major pixel assignments.
    ///
    /// Panics if `data.len() != width*height` or any entry is out of
    /// `0..count` — both are backend bugs, not user errors.
    pub fn new(width: u32, height: u32, count: u32, data: Vec<u32>) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "index map data length must equal width*height"
        );
        debug_assert!(
            data.iter().all(|&i| i < count),
            "index map entry out of range"
        );
        Self {
            width,
            height,
            count,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of distinct generator indices this map may carry.
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }
}
