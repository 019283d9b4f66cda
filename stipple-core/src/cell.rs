//! Cell accumulator: converts an [`IndexMap`] plus [`DensityImage`] into
//! per-cell area, density sum, centroid and orientation.

use crate::density::DensityImage;
use crate::index_map::IndexMap;
use crate::position::Position;

/// Per-cell aggregate statistics produced by [`accumulate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiCell {
    pub centroid: Position,
    pub orientation: f64,
    pub area: u64,
    pub sum_density: f64,
}

impl Default for VoronoiCell {
    fn default() -> Self {
        Self {
            centroid: Position::new(0.0, 0.0),
            orientation: 0.0,
            area: 0,
            sum_density: 0.0,
        }
    }
}

/// Raw image moments accumulated per cell before centroid/orientation are
/// derived from them.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    m11: f64,
    m20: f64,
    m02: f64,
}

impl Moments {
    fn merge(mut self, other: Self) -> Self {
        self.m00 += other.m00;
        self.m10 += other.m10;
        self.m01 += other.m01;
        self.m11 += other.m11;
        self.m20 += other.m20;
        self.m02 += other.m02;
        self
    }
}

#[derive(Clone, Default)]
struct Accum {
    moments: Vec<Moments>,
    areas: Vec<u64>,
}

impl Accum {
    fn new(count: usize) -> Self {
        Self {
            moments: vec![Moments::default(); count],
            areas: vec![0u64; count],
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for i in 0..self.moments.len() {
            self.moments[i] = self.moments[i].merge(other.moments[i]);
            self.areas[i] += other.areas[i];
        }
        self
    }
}

fn accumulate_row(acc: &mut Accum, map: &IndexMap, density: &DensityImage, y: u32) {
    let width = map.width();
    for x in 0..width {
        let index = map.get(x, y) as usize;
        let w = density.weight(x, y);

        acc.areas[index] += 1;
        let m = &mut acc.moments[index];
        m.m00 += w;
        m.m10 += x as f64 * w;
        m.m01 += y as f64 * w;
        m.m11 += (x as f64) * (y as f64) * w;
        m.m20 += (x as f64) * (x as f64) * w;
        m.m02 += (y as f64) * (y as f64) * w;
    }
}

fn finish_cells(width: u32, height: u32, acc: Accum) -> Vec<VoronoiCell> {
    let mut cells = vec![VoronoiCell::default(); acc.areas.len()];
    for (i, cell) in cells.iter_mut().enumerate() {
        cell.area = acc.areas[i];
        let m = acc.moments[i];
        cell.sum_density = m.m00;
        if m.m00 <= 0.0 {
            continue;
        }

        let cx = m.m10 / m.m00;
        let cy = m.m01 / m.m00;
        let a = m.m20 / m.m00 - cx * cx;
        let b = 2.0 * (m.m11 / m.m00 - cx * cy);
        let c = m.m02 / m.m00 - cy * cy;
        cell.orientation = b.atan2(a - c) / 2.0;

        cell.centroid = Position::new(
            (cx + 0.5) / width as f64,
            (cy + 0.5) / height as f64,
        );
    }
    cells
}

/// Single pass over every pixel, producing one [`VoronoiCell`] per
/// generator index in `map`.
///
/// With the `parallel` feature, rows are folded across a rayon thread pool
/// and reduced at the end (per-thread local accumulators); floating point
/// summation order then depends on thread count, so `sum_density` may
/// differ by a few ULPs across runs with different thread counts, while
/// `area` (an exact integer sum) never does.
pub fn accumulate(map: &IndexMap, density: &DensityImage) -> Vec<VoronoiCell> {
    let count = map.count() as usize;
    let width = map.width();
    let height = map.height();

    #[cfg(feature = "parallel")]
    let acc = {
        use rayon::prelude::*;
        (0..height)
            .into_par_iter()
            .fold(
                || Accum::new(count),
                |mut acc, y| {
                    accumulate_row(&mut acc, map, density, y);
                    acc
                },
            )
            .reduce(|| Accum::new(count), Accum::merge)
    };

    #[cfg(not(feature = "parallel"))]
    let acc = {
        let mut acc = Accum::new(count);
        for y in 0..height {
            accumulate_row(&mut acc, map, density, y);
        }
        acc
    };

    finish_cells(width, height, acc)
}
