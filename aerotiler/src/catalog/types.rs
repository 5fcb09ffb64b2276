//! Catalog entity definitions
//!
//! Datasets and tilesets are immutable for the lifetime of a run; they are
//! created once at config load and only read afterwards.

/// A single ground control point: a pixel in the original source image and
/// the geographic coordinate it corresponds to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub lon: f64,
    pub lat: f64,
}

/// A polygon mask in source-image pixel space.
///
/// The first ring is the outer boundary (counter-clockwise); any remaining
/// rings are holes (clockwise) nested inside it. The winding convention is
/// preserved verbatim from the catalog file.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub rings: Vec<Vec<[f64; 2]>>,
}

impl Mask {
    /// The outer boundary ring.
    pub fn outer_ring(&self) -> &[[f64; 2]] {
        &self.rings[0]
    }

    /// Axis-aligned bounding box of the outer ring as
    /// `(min_x, min_y, max_x, max_y)` in source pixels.
    pub fn outer_bbox(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for &[x, y] in self.outer_ring() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        (min_x, min_y, max_x, max_y)
    }

    /// Outer-ring bbox area in square pixels, used as the work estimate when
    /// ordering pipeline jobs.
    pub fn bbox_area(&self) -> f64 {
        let (min_x, min_y, max_x, max_y) = self.outer_bbox();
        ((max_x - min_x) * (max_y - min_y)).max(0.0)
    }
}

/// Geographic clip bounds applied after reprojection.
///
/// Each side is independently optional; `None` leaves that side unclipped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoBounds {
    pub lon_min: Option<f64>,
    pub lat_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub lat_max: Option<f64>,
}

impl GeoBounds {
    /// True when no side is constrained.
    pub fn is_unbounded(&self) -> bool {
        self.lon_min.is_none()
            && self.lat_min.is_none()
            && self.lon_max.is_none()
            && self.lat_max.is_none()
    }
}

/// A chart definition: where to find the source raster and how to transform
/// it into a processed tile source.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Catalog key, e.g. "Seattle SEC".
    pub name: String,
    /// ZIP archive stem (without `.zip`).
    pub zip_file: String,
    /// Raster member name inside the archive.
    pub input_file: String,
    /// Processed raster filename under the temp directory.
    pub tmp_file: String,
    /// Optional pixel-space polygon mask.
    pub mask: Option<Mask>,
    /// Optional geographic clip bounds.
    pub geobound: Option<GeoBounds>,
    /// Ground control points; empty when the chart's own georeferencing is
    /// trusted.
    pub gcps: Vec<ControlPoint>,
    /// Highest zoom level at which this chart contributes base tiles. Also
    /// determines the processed raster's native resolution.
    pub max_lod: u8,
}

impl Dataset {
    /// Work estimate for job ordering: large masked charts first.
    pub fn work_estimate(&self) -> f64 {
        self.mask.as_ref().map(Mask::bbox_area).unwrap_or(0.0)
    }
}

/// A mosaic grouping: an ordered list of datasets rendered into one tile
/// tree over a zoom range.
#[derive(Debug, Clone)]
pub struct Tileset {
    /// Catalog key, e.g. "VFR Sectional Charts".
    pub name: String,
    /// Output subdirectory under the tile root, e.g. "sec".
    pub tile_path: String,
    pub zoom_min: u8,
    pub zoom_max: u8,
    /// Dataset names, in catalog order.
    pub datasets: Vec<String>,
}
