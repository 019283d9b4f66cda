//! WASM bindings for stipple-core.
//!
//! Exposes a single synchronous entry point that runs a complete stippling
//! pass and returns the final stipple set as flat typed arrays for
//! zero-copy JS interop. The browser preview owns animation and
//! incremental display; this binding only needs to run the algorithm and
//! hand back results, so it stays a thin wrapper rather than mirroring the
//! controller's full callback surface.

use wasm_bindgen::prelude::*;

use stipple_core::{CpuBackend, DensityImage, PartitionBackend, Position, StipplingParams};

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn rgba_to_gray_image(rgba: &[u8], width: u32, height: u32) -> Result<image::GrayImage, JsValue> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in rgba.chunks_exact(4) {
        rgb.push(pixel[0]);
        rgb.push(pixel[1]);
        rgb.push(pixel[2]);
    }
    let rgb_image = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| JsValue::from_str("rgba buffer size does not match width*height"))?;
    Ok(image::DynamicImage::ImageRgb8(rgb_image).to_luma8())
}

/// Flat result of one completed stippling run.
#[wasm_bindgen]
pub struct StippleResult {
    positions_flat: Vec<f64>,
    diameters: Vec<f64>,
    iterations_run: usize,
}

#[wasm_bindgen]
impl StippleResult {
    /// Flat [x0,y0, x1,y1, ...] stipple positions in normalized [0,1]^2.
    #[wasm_bindgen(getter)]
    pub fn positions(&self) -> Vec<f64> {
        self.positions_flat.clone()
    }

    /// Per-stipple diameter in density-image pixel units.
    #[wasm_bindgen(getter)]
    pub fn diameters(&self) -> Vec<f64> {
        self.diameters.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn iterations_run(&self) -> usize {
        self.iterations_run
    }

    #[wasm_bindgen(getter)]
    pub fn count(&self) -> usize {
        self.diameters.len()
    }
}

/// Stateless browser-facing entry point: decode RGBA pixels, run the full
/// relaxation loop with the given parameters, and return the final
/// stipple set.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn stipple_image(
    rgba_data: &[u8],
    width: u32,
    height: u32,
    initial_points: usize,
    max_iterations: usize,
    hysteresis: f64,
    adaptive_hysteresis: bool,
    point_size_min: f64,
    point_size_max: f64,
    adaptive_point_size: bool,
    seed: u32,
) -> Result<StippleResult, JsValue> {
    let gray = rgba_to_gray_image(rgba_data, width, height)?;
    let density = DensityImage::from_luma(gray).map_err(|e| JsValue::from_str(&e.to_string()))?;

    // No per-iteration hysteresis delta flag in this thin binding; derive
    // it the way the reference tool's own default does.
    let params = StipplingParams {
        initial_points,
        max_iterations,
        hysteresis,
        adaptive_hysteresis,
        point_size_min,
        point_size_max,
        adaptive_point_size,
        seed: seed as u64,
        ..StipplingParams::default()
    }
    .with_derived_hysteresis_delta();

    let mut backend = CpuBackend::new();
    let mut iterations_run = 0usize;
    let stipples = stipple_core::run(
        &mut backend,
        &density,
        &params,
        |_stipples| {},
        |status| iterations_run = status.iteration,
        || false,
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let mut positions_flat = Vec::with_capacity(stipples.len() * 2);
    let mut diameters = Vec::with_capacity(stipples.len());
    for s in &stipples {
        positions_flat.push(s.position.x);
        positions_flat.push(s.position.y);
        diameters.push(s.diameter);
    }

    Ok(StippleResult {
        positions_flat,
        diameters,
        iterations_run,
    })
}

/// Single nearest-generator partition for interactive preview of the
/// Voronoi mesh without running the full relaxation loop.
#[wasm_bindgen]
pub fn partition_preview(positions: &[f64], width: u32, height: u32) -> Result<Vec<u32>, JsValue> {
    let points: Vec<Position> = positions
        .chunks_exact(2)
        .map(|xy| Position::new(xy[0], xy[1]))
        .collect();
    let mut backend = CpuBackend::new();
    let map = backend
        .partition(&points, width, height)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(map.as_slice().to_vec())
}
