//! Geotag overlay for reported photos
//!
//! Burns a border rectangle and left-aligned location text onto the image
//! before it is stored, so the annotation travels with the photo itself.
//! Line order is fixed: Road, City, Country, coordinates, Tags; any line
//! whose source field is absent or blank is skipped.
//!
//! Output format follows the declared content type (PNG stays PNG, anything
//! else becomes JPEG). The bytes must decode as a raster image or the
//! operation fails with `UnreadableImage`.

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::io::Cursor;

use crate::types::{CivicError, Result};

const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

const FONT_SIZE: f32 = 24.0;
const PADDING: i32 = 10;
const LINE_HEIGHT: i32 = 30;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// True when the declared content type names a PNG. This is a content-type
/// sniff, not image-data inspection.
pub fn is_png(content_type: &str) -> bool {
    content_type.contains("png")
}

/// Burns location metadata onto raster images.
#[derive(Clone)]
pub struct GeotagAnnotator {
    font: FontRef<'static>,
}

impl GeotagAnnotator {
    pub fn new() -> Result<Self> {
        let font = FontRef::try_from_slice(FONT_BYTES)
            .map_err(|e| CivicError::Config(format!("Embedded font failed to load: {}", e)))?;
        Ok(Self { font })
    }

    /// Annotate `bytes` and re-encode. Deterministic for identical inputs up
    /// to platform font rendering.
    #[allow(clippy::too_many_arguments)]
    pub fn annotate(
        &self,
        bytes: &[u8],
        content_type: &str,
        road: Option<&str>,
        city: Option<&str>,
        country: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        tags: &[String],
    ) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CivicError::UnreadableImage(format!("Could not read image: {}", e)))?;
        let mut img = decoded.to_rgb8();

        let (width, height) = (img.width(), img.height());
        draw_hollow_rect_mut(&mut img, Rect::at(0, 0).of_size(width, height), WHITE);

        let scale = PxScale::from(FONT_SIZE);
        let mut y = PADDING;

        for line in overlay_lines(road, city, country, latitude, longitude, tags) {
            draw_text_mut(&mut img, WHITE, PADDING, y, scale, &self.font, &line);
            y += LINE_HEIGHT;
        }

        let format = if is_png(content_type) {
            ImageFormat::Png
        } else {
            ImageFormat::Jpeg
        };

        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), format)
            .map_err(|e| CivicError::Internal(format!("Image encode failed: {}", e)))?;

        Ok(out)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// The text lines in their fixed order, with absent/blank sources skipped.
fn overlay_lines(
    road: Option<&str>,
    city: Option<&str>,
    country: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    tags: &[String],
) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(road) = non_blank(road) {
        lines.push(format!("Road: {}", road));
    }
    if let Some(city) = non_blank(city) {
        lines.push(format!("City: {}", city));
    }
    if let Some(country) = non_blank(country) {
        lines.push(format!("Country: {}", country));
    }
    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        lines.push(format!("Lat: {:.6}, Lon: {:.6}", lat, lon));
    }
    if !tags.is_empty() {
        lines.push(format!("Tags: {}", tags.join(", ")));
    }

    lines
}
