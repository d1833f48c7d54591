//! Bounding box and fit-to-view helpers

use serde::Serialize;

/// Axis-aligned bounding box of placed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Largest x.
    pub max_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest y.
    pub max_y: f64,
}

/// Zoom and offset that centre a layout in a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// Scale factor.
    pub zoom: f64,
    /// Horizontal offset from the viewport centre.
    pub offset_x: f64,
    /// Vertical offset from the viewport centre.
    pub offset_y: f64,
}

/// Pixel dimensions for a high-resolution export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportSize {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Scale from layout units to pixels.
    pub zoom: f64,
}

impl Bounds {
    /// Degenerate box at one point.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    /// Grow to include `(x, y)`.
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Box width.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Box height.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Box centre.
    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Zoom and offset fitting the box into a `width × height` viewport.
    ///
    /// Zoom never exceeds `max_zoom`; a degenerate box uses `max_zoom`.
    pub fn fit(&self, width: f64, height: f64, padding: f64, max_zoom: f64) -> Viewport {
        let scale = |avail: f64, extent: f64| {
            if extent > 0.0 {
                (avail - 2.0 * padding).max(0.0) / extent
            } else {
                f64::INFINITY
            }
        };
        let zoom = scale(width, self.width())
            .min(scale(height, self.height()))
            .min(max_zoom);
        let (cx, cy) = self.center();
        Viewport {
            zoom,
            offset_x: -cx * zoom,
            offset_y: -cy * zoom,
        }
    }

    /// Export dimensions whose longest side is `max_resolution` pixels.
    pub fn export_size(&self, max_resolution: u32, padding: u32) -> ExportSize {
        let (w, h) = (self.width().max(f64::EPSILON), self.height().max(f64::EPSILON));
        let inner = max_resolution.saturating_sub(padding.saturating_mul(2)) as f64;
        let margin = 2.0 * f64::from(padding);
        let aspect = w / h;

        let (inner_w, inner_h, zoom) = if aspect >= 1.0 {
            (inner, inner / aspect, inner / w)
        } else {
            (inner * aspect, inner, inner / h)
        };

        ExportSize {
            width: (inner_w + margin).ceil() as u32,
            height: (inner_h + margin).ceil() as u32,
            zoom,
        }
    }
}
