//! crates/doc_signer_core/src/geometry.rs
//!
//! Pure coordinate math for field placement. Positions are stored as
//! percentages of the page extent; widths and heights are stored in the
//! linear pixel units of the editing canvas and scaled by [`RasterScale`]
//! when drawn onto a raster of different resolution.

use crate::domain::Field;
use serde::{Deserialize, Serialize};

/// Minimum field width, in editing-canvas units.
pub const MIN_FIELD_WIDTH: f64 = 80.0;
/// Minimum field height, in editing-canvas units.
pub const MIN_FIELD_HEIGHT: f64 = 40.0;

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// The ratio between the resolution pages were rasterized at and the
/// resolution of the editing canvas fields were authored on.
///
/// Field widths/heights are multiplied by `factor()` at burn-in time.
/// The default (2.0 / 1.0) matches a rasterizer capturing pages at twice
/// the editing resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterScale {
    pub page_raster_scale: f32,
    pub editing_canvas_scale: f32,
}

impl RasterScale {
    pub fn new(page_raster_scale: f32, editing_canvas_scale: f32) -> Self {
        Self {
            page_raster_scale,
            editing_canvas_scale,
        }
    }

    pub fn factor(&self) -> f32 {
        self.page_raster_scale / self.editing_canvas_scale
    }
}

impl Default for RasterScale {
    fn default() -> Self {
        Self::new(2.0, 1.0)
    }
}

/// A field's footprint on a concrete page raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Clamps a normalized position component into 0..=100.
pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Clamps a field size to the minimums, preventing degenerate fields.
pub fn clamp_size(width: f64, height: f64) -> (f64, f64) {
    (width.max(MIN_FIELD_WIDTH), height.max(MIN_FIELD_HEIGHT))
}

/// Converts a percentage of a page extent into a pixel offset.
pub fn percent_to_pixel(percent: f64, extent_px: u32) -> f32 {
    (percent / 100.0 * extent_px as f64) as f32
}

/// Applies a drag delta (in editing-canvas pixels) to a stored position,
/// returning the clamped new percentage position. The UI layer hands the
/// core only this final delta.
pub fn drag_to_percent(
    x_percent: f64,
    y_percent: f64,
    delta_x_px: f64,
    delta_y_px: f64,
    canvas_width_px: f64,
    canvas_height_px: f64,
) -> (f64, f64) {
    let new_x = x_percent + delta_x_px / canvas_width_px * 100.0;
    let new_y = y_percent + delta_y_px / canvas_height_px * 100.0;
    (clamp_percent(new_x), clamp_percent(new_y))
}

/// Where a field lands on a page raster of the given pixel dimensions:
/// position from its percentages, size from its canvas units times the
/// compositing factor.
pub fn field_pixel_rect(
    field: &Field,
    page_width_px: u32,
    page_height_px: u32,
    scale: RasterScale,
) -> PixelRect {
    PixelRect {
        x: percent_to_pixel(field.x, page_width_px),
        y: percent_to_pixel(field.y, page_height_px),
        width: field.width as f32 * scale.factor(),
        height: field.height as f32 * scale.factor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use uuid::Uuid;

    fn field_at(x: f64, y: f64, width: f64, height: f64) -> Field {
        Field {
            id: Uuid::new_v4(),
            kind: FieldKind::Signature,
            page_number: 1,
            x,
            y,
            width,
            height,
            recipient_id: None,
            required: true,
            value: None,
        }
    }

    #[test]
    fn positions_clamp_to_the_page() {
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(104.2), 100.0);
        assert_eq!(clamp_percent(55.5), 55.5);
    }

    #[test]
    fn sizes_never_fall_below_the_minimums() {
        assert_eq!(clamp_size(10.0, 10.0), (MIN_FIELD_WIDTH, MIN_FIELD_HEIGHT));
        assert_eq!(clamp_size(200.0, 90.0), (200.0, 90.0));
    }

    #[test]
    fn percent_maps_linearly_onto_pixels() {
        assert_eq!(percent_to_pixel(10.0, 800), 80.0);
        assert_eq!(percent_to_pixel(0.0, 800), 0.0);
        assert_eq!(percent_to_pixel(100.0, 1000), 1000.0);
    }

    #[test]
    fn drag_deltas_convert_and_clamp() {
        let (x, y) = drag_to_percent(50.0, 50.0, 80.0, -100.0, 800.0, 1000.0);
        assert_eq!((x, y), (60.0, 40.0));

        let (x, y) = drag_to_percent(95.0, 2.0, 800.0, -500.0, 800.0, 1000.0);
        assert_eq!((x, y), (100.0, 0.0));
    }

    #[test]
    fn pixel_rect_couples_size_to_the_raster_scale() {
        let field = field_at(10.0, 10.0, 150.0, 40.0);
        let rect = field_pixel_rect(&field, 800, 1000, RasterScale::default());
        assert_eq!(rect.x, 80.0);
        assert_eq!(rect.y, 100.0);
        assert_eq!(rect.width, 300.0);
        assert_eq!(rect.height, 80.0);

        let unity = field_pixel_rect(&field, 800, 1000, RasterScale::new(1.0, 1.0));
        assert_eq!(unity.width, 150.0);
    }
}
