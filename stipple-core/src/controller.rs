//! LBG iteration controller: the outer relaxation loop tying the partition
//! engine and cell accumulator together into split/keep/merge decisions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cell::{accumulate, VoronoiCell};
use crate::density::DensityImage;
use crate::error::Result;
use crate::params::StipplingParams;
use crate::partition::PartitionBackend;
use crate::position::Position;
use crate::stipple::{Stipple, StippleTag};

/// Offset XORed into the seed to derive the split-jitter RNG stream from
/// the same user-facing seed as the initial-placement stream, so the two
/// streams stay independent without asking the caller for two numbers.
const JITTER_STREAM_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

const JITTER_RANGE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Finished,
}

/// Per-iteration progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub iteration: usize,
    pub size: usize,
    pub splits: usize,
    pub merges: usize,
    pub hysteresis: f64,
    /// `Running` for every iteration but the one that reaches a fixed point
    /// or the iteration cap; `Finished` on that last one. A caller does not
    /// need to inspect this to know when `run` returns, but it surfaces the
    /// Idle/Running/Finished state machine to progress reporters that
    /// display it.
    pub state: ControllerState,
}

struct Working {
    position: Position,
    size: f64,
}

fn place_initial_points(params: &StipplingParams, rng: &mut ChaCha8Rng) -> Vec<Working> {
    (0..params.initial_points)
        .map(|_| {
            let x = rng.gen_range(0.01..0.99);
            let y = rng.gen_range(0.01..0.99);
            Working {
                position: Position::new(x, y),
                size: params.initial_point_size,
            }
        })
        .collect()
}

fn split_value_upper(diameter: f64, hysteresis: f64, super_sampling_factor: u32) -> f64 {
    let area = std::f64::consts::PI * (diameter * diameter / 4.0);
    let s = super_sampling_factor as f64;
    (1.0 + hysteresis / 2.0) * area * s * s
}

fn split_value_lower(diameter: f64, hysteresis: f64, super_sampling_factor: u32) -> f64 {
    let area = std::f64::consts::PI * (diameter * diameter / 4.0);
    let s = super_sampling_factor as f64;
    (1.0 - hysteresis / 2.0) * area * s * s
}

/// Relax `working` toward `cells`' centroids, updating adaptive point size,
/// then apply the split/keep/merge rule and return the next generation plus
/// how many of each decision were made.
#[allow(clippy::too_many_arguments)]
fn decide_next_generation(
    working: &[Working],
    cells: &[VoronoiCell],
    params: &StipplingParams,
    hysteresis: f64,
    width: u32,
    height: u32,
    jitter_rng: &mut ChaCha8Rng,
) -> (Vec<Stipple>, usize, usize) {
    let mut next = Vec::with_capacity(working.len());
    let mut splits = 0usize;
    let mut merges = 0usize;

    for (point, cell) in working.iter().zip(cells.iter()) {
        let centroid = if cell.area > 0 {
            cell.centroid
        } else {
            point.position
        };

        let size = if cell.area > 0 && params.adaptive_point_size {
            let avg_intensity_sqrt = (cell.sum_density / cell.area as f64).sqrt();
            params.point_size_min * (1.0 - avg_intensity_sqrt)
                + params.point_size_max * avg_intensity_sqrt
        } else {
            point.size
        };

        let total_density = cell.sum_density;

        if cell.area == 0 || total_density < split_value_lower(size, hysteresis, params.super_sampling_factor) {
            merges += 1;
            continue;
        }

        if total_density < split_value_upper(size, hysteresis, params.super_sampling_factor) {
            next.push(Stipple::new(centroid, size, StippleTag::Fresh));
            continue;
        }

        let area = (cell.area as f64).max(1.0);
        let circle_radius = (area / std::f64::consts::PI).sqrt();
        let half_offset = 0.5 * circle_radius;
        let theta = cell.orientation;
        let vx = half_offset * theta.cos();
        let vy = half_offset * theta.sin();
        let v_norm = Position::new(vx / width as f64, vy / height as f64);

        let seed1 = centroid.sub(v_norm).clamp_unit();
        let seed2 = centroid.add(v_norm).clamp_unit();

        let jitter = |rng: &mut ChaCha8Rng| {
            Position::new(
                rng.gen_range(-JITTER_RANGE..JITTER_RANGE),
                rng.gen_range(-JITTER_RANGE..JITTER_RANGE),
            )
        };

        next.push(Stipple::new(
            seed1.add(jitter(jitter_rng)).clamp_unit(),
            size,
            StippleTag::Split,
        ));
        next.push(Stipple::new(
            seed2.add(jitter(jitter_rng)).clamp_unit(),
            size,
            StippleTag::Split,
        ));
        splits += 1;
    }

    (next, splits, merges)
}

/// Run the full relaxation loop to completion (or cancellation).
///
/// `on_stipples` and `on_status` are invoked once per completed iteration,
/// in order, before the cancellation flag is checked. The returned vector
/// is the stipple set from the last emitted iteration.
///
/// `params.hysteresis_delta` is used exactly as given — callers who want the
/// reference tool's auto-derived default (`hysteresis / (max_iterations -
/// 1)`) should call [`StipplingParams::with_derived_hysteresis_delta`]
/// themselves before passing params in, rather than having it silently
/// overridden here.
pub fn run<B, OnStipples, OnStatus, IsCancelled>(
    backend: &mut B,
    density: &DensityImage,
    params: &StipplingParams,
    mut on_stipples: OnStipples,
    mut on_status: OnStatus,
    mut is_cancelled: IsCancelled,
) -> Result<Vec<Stipple>>
where
    B: PartitionBackend,
    OnStipples: FnMut(&[Stipple]),
    OnStatus: FnMut(&Status),
    IsCancelled: FnMut() -> bool,
{
    params.validate()?;

    let width = density.width();
    let height = density.height();

    let mut placement_rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut jitter_rng = ChaCha8Rng::seed_from_u64(params.seed ^ JITTER_STREAM_OFFSET);

    let mut working = place_initial_points(params, &mut placement_rng);
    let mut last_emitted: Vec<Stipple> = working
        .iter()
        .map(|w| Stipple::new(w.position, w.size, StippleTag::Fresh))
        .collect();

    for iter in 0..params.max_iterations {
        let points: Vec<Position> = working.iter().map(|w| w.position).collect();
        let map = backend.partition(&points, width, height)?;
        let cells = accumulate(&map, density);

        let hysteresis = if params.adaptive_hysteresis {
            params.hysteresis + iter as f64 * params.hysteresis_delta
        } else {
            params.hysteresis
        };

        let (next_stipples, splits, merges) =
            decide_next_generation(&working, &cells, params, hysteresis, width, height, &mut jitter_rng);

        on_stipples(&next_stipples);

        let converged = splits == 0 && merges == 0;
        let terminal = converged || next_stipples.is_empty() || iter + 1 >= params.max_iterations;
        let status = Status {
            iteration: iter + 1,
            size: next_stipples.len(),
            splits,
            merges,
            hysteresis,
            state: if terminal {
                ControllerState::Finished
            } else {
                ControllerState::Running
            },
        };
        on_status(&status);

        last_emitted = next_stipples;
        working = last_emitted
            .iter()
            .map(|s| Working {
                position: s.position,
                size: s.diameter,
            })
            .collect();

        if terminal {
            break;
        }
        if is_cancelled() {
            break;
        }
    }

    Ok(last_emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::CpuBackend;
    use image::{GrayImage, Luma};

    fn solid_density(w: u32, h: u32, gray: u8) -> DensityImage {
        DensityImage::from_luma(GrayImage::from_pixel(w, h, Luma([gray]))).unwrap()
    }

    #[test]
    fn white_image_converges_to_empty_set() {
        let density = solid_density(64, 64, 255);
        let params = StipplingParams {
            initial_points: 10,
            max_iterations: 5,
            hysteresis: 0.6,
            hysteresis_delta: 0.0,
            adaptive_hysteresis: false,
            super_sampling_factor: 1,
            initial_point_size: 4.0,
            adaptive_point_size: false,
            seed: 42,
            ..StipplingParams::default()
        };
        let mut backend = CpuBackend::new();
        let mut saw_merges = false;
        let result = run(
            &mut backend,
            &density,
            &params,
            |_stipples| {},
            |status| {
                if status.merges > 0 {
                    saw_merges = true;
                }
            },
            || false,
        )
        .unwrap();
        assert!(result.is_empty());
        assert!(saw_merges);
    }

    #[test]
    fn black_image_grows_stipple_count_monotonically() {
        let density = solid_density(64, 64, 0);
        let params = StipplingParams {
            initial_points: 1,
            max_iterations: 10,
            hysteresis: 0.6,
            hysteresis_delta: 0.06,
            adaptive_hysteresis: true,
            super_sampling_factor: 1,
            initial_point_size: 4.0,
            adaptive_point_size: false,
            seed: 7,
            ..StipplingParams::default()
        };
        let mut backend = CpuBackend::new();
        let mut sizes = vec![];
        let result = run(
            &mut backend,
            &density,
            &params,
            |_| {},
            |status| sizes.push(status.size),
            || false,
        )
        .unwrap();
        for pair in sizes.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(!result.is_empty());
    }

    #[test]
    fn cancellation_stops_after_requested_iteration() {
        use std::cell::Cell;

        let density = solid_density(64, 64, 0);
        let params = StipplingParams {
            initial_points: 1,
            max_iterations: 10,
            seed: 3,
            adaptive_point_size: false,
            ..StipplingParams::default()
        };
        let mut backend = CpuBackend::new();
        let iterations_seen = Cell::new(0usize);
        let result = run(
            &mut backend,
            &density,
            &params,
            |_| {},
            |status| iterations_seen.set(status.iteration),
            || iterations_seen.get() >= 3,
        )
        .unwrap();
        assert_eq!(iterations_seen.get(), 3);
        assert!(!result.is_empty());
    }

    #[test]
    fn determinism_across_repeated_runs() {
        let density = solid_density(32, 32, 64);
        let params = StipplingParams {
            initial_points: 4,
            max_iterations: 6,
            seed: 99,
            ..StipplingParams::default()
        };

        let run_once = || {
            let mut backend = CpuBackend::new();
            run(&mut backend, &density, &params, |_| {}, |_| {}, || false).unwrap()
        };

        let a = run_once();
        let b = run_once();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x.position.x - y.position.x).abs() < 1e-12);
            assert!((x.position.y - y.position.y).abs() < 1e-12);
        }
    }
}
