//! Weighted Linde-Buzo-Gray stippling core.
//!
//! Converts a grayscale density image into a set of stipples whose local
//! density approximates the input's darkness, by iteratively relaxing a
//! point set over a weighted Voronoi partition (Deussen, Spicker & Zheng,
//! "Weighted Linde-Buzo-Gray Stippling", SIGGRAPH Asia 2017).
//!
//! The pipeline has three stages, leaves first:
//!   - [`partition`]: assign every pixel to its nearest generator point.
//!   - [`cell`]: accumulate per-cell area, density and image moments.
//!   - [`controller`]: apply the split/keep/merge rule and iterate to a
//!     fixed point.
//!
//! No I/O happens in this crate; `stipple-cli` owns image decoding,
//! argument parsing and export.

mod cell;
mod controller;
mod density;
mod error;
mod index_map;
mod params;
mod position;
mod stipple;

pub mod partition;

pub use cell::{accumulate, VoronoiCell};
pub use controller::{run, ControllerState, Status};
pub use density::DensityImage;
pub use error::{Error, Result};
pub use index_map::IndexMap;
pub use params::StipplingParams;
pub use partition::{cone_slice_count, PartitionBackend};
#[cfg(feature = "cpu")]
pub use partition::CpuBackend;
#[cfg(feature = "gpu")]
pub use partition::GpuBackend;
pub use position::Position;
pub use stipple::{Stipple, StippleTag};
