//! Rendering the final stipple set to a baseline raster (PNG) or vector
//! (SVG) output. This is a minimal, concrete exporter; a richer viewport
//! renderer is a collaborator-owned concern.

use std::fmt::Write as _;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use stipple_core::Stipple;

/// Composite filled black circles for every stipple onto a white
/// background at `(width, height)` resolution.
pub fn render_png(stipples: &[Stipple], width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for stipple in stipples {
        let cx = (stipple.position.x * width as f64).round() as i32;
        let cy = (stipple.position.y * height as f64).round() as i32;
        let radius = (stipple.diameter / 2.0).round().max(1.0) as i32;
        draw_filled_circle_mut(&mut image, (cx, cy), radius, Rgb([0, 0, 0]));
    }
    image
}

/// Render one `<circle>` per stipple into an SVG document sized
/// `viewport_width` x `viewport_height`, with stipple positions (normalized
/// to the density image) scaled into that viewport and radii scaled by the
/// same `viewport / density` factor, so stipples keep their size relative
/// to the drawing when the viewport differs from `(density_width,
/// density_height)`.
pub fn render_svg(
    stipples: &[Stipple],
    density_width: u32,
    density_height: u32,
    viewport_width: u32,
    viewport_height: u32,
) -> String {
    let scale_x = viewport_width as f64 / density_width as f64;
    let scale_y = viewport_height as f64 / density_height as f64;

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = viewport_width,
        h = viewport_height
    )
    .unwrap();
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#).unwrap();

    for stipple in stipples {
        let cx = stipple.position.x * viewport_width as f64;
        let cy = stipple.position.y * viewport_height as f64;
        let r = (stipple.diameter / 2.0) * scale_x.min(scale_y);
        writeln!(
            svg,
            r#"<circle cx="{cx:.3}" cy="{cy:.3}" r="{r:.3}" fill="black"/>"#
        )
        .unwrap();
    }

    writeln!(svg, "</svg>").unwrap();
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use stipple_core::{Position, StippleTag};

    #[test]
    fn render_png_keeps_background_white_with_no_stipples() {
        let image = render_png(&[], 8, 8);
        for pixel in image.pixels() {
            assert_eq!(*pixel, Rgb([255, 255, 255]));
        }
    }

    #[test]
    fn render_png_darkens_a_pixel_near_each_stipple() {
        let stipples = vec![Stipple::new(Position::new(0.5, 0.5), 4.0, StippleTag::Fresh)];
        let image = render_png(&stipples, 20, 20);
        assert_eq!(*image.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn render_svg_contains_one_circle_per_stipple() {
        let stipples = vec![
            Stipple::new(Position::new(0.25, 0.25), 2.0, StippleTag::Fresh),
            Stipple::new(Position::new(0.75, 0.75), 3.0, StippleTag::Split),
        ];
        let svg = render_svg(&stipples, 100, 100, 100, 100);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.starts_with("<svg"));
    }
}
