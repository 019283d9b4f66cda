//! Voronoi partition engine: assigns every pixel of a W×H grid to its
//! nearest generator.
//!
//! The reference tool does this by rendering a right circular cone per
//! generator with a depth test (an index-encoding GPU rasterization
//! trick); [`cone_slice_count`] reproduces its slice-count formula for the
//! GPU backend and as a documented reference, but a CPU backend is free to
//! compute the same nearest-site assignment directly, which is what
//! [`CpuBackend`] does.

use crate::error::Result;
use crate::index_map::IndexMap;
use crate::position::Position;

#[cfg(feature = "cpu")]
mod cpu;
#[cfg(feature = "gpu")]
mod gpu;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;

/// A backend that can rasterize a nearest-generator assignment.
///
/// Implementations own whatever long-lived resources they need (GPU
/// context, thread pool handle) and must be reusable across many
/// `partition` calls without reallocating unless the output size changes.
pub trait PartitionBackend {
    /// Assign every pixel of a `width`×`height` grid to the index of its
    /// nearest point in `points` (each normalized to [0,1]^2).
    ///
    /// Fails with [`crate::Error::EmptyGeneratorSet`] if `points` is empty.
    fn partition(&mut self, points: &[Position], width: u32, height: u32) -> Result<IndexMap>;
}

/// Cone radius covering the unit square from any interior apex: `sqrt(2)`.
pub const CONE_RADIUS: f64 = std::f64::consts::SQRT_2;

/// Number of cone slices so the radial sagitta (meshing error) is at most
/// one pixel on a grid whose larger dimension is `max(width, height)`.
///
/// `n` is chosen as the smallest integer with
/// `r * (1 - cos(pi/n)) <= 1/max(width, height)`, which algebraically
/// reduces to `n = ceil(pi / acos(1 - 1/(r*max(w,h))))`.
pub fn cone_slice_count(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height).max(1) as f64;
    let r = CONE_RADIUS;
    let arg = (1.0 - 1.0 / (r * max_dim)).clamp(-1.0, 1.0);
    (std::f64::consts::PI / arg.acos()).ceil() as u32
}

/// Encode a generator index into an (r,g,b) byte triple, as the cone
/// rasterizer's fragment shader would write it.
pub fn encode_index(index: u32) -> (u8, u8, u8) {
    (
        ((index >> 16) & 0xFF) as u8,
        ((index >> 8) & 0xFF) as u8,
        (index & 0xFF) as u8,
    )
}

/// Inverse of [`encode_index`].
pub fn decode_index(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_encoding_round_trips() {
        for i in [0u32, 1, 255, 256, 65535, 65536, (1 << 24) - 1] {
            let (r, g, b) = encode_index(i);
            assert_eq!(decode_index(r, g, b), i, "round trip failed for {i}");
        }
    }

    #[test]
    fn cone_slice_count_grows_with_resolution() {
        let small = cone_slice_count(16, 16);
        let large = cone_slice_count(4096, 4096);
        assert!(large > small);
        assert!(small >= 3);
    }
}
