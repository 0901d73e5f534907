//! Single-page PDF assembly around a captured raster.
//!
//! The page geometry is plain arithmetic in millimetres ([`fit_to_page`]); the
//! actual document is produced by `genpdf` through [`GenpdfAssembler`].

use std::path::PathBuf;

use image::GenericImageView;
use log::debug;
use thiserror::Error;

use genpdf::elements::Image;
use genpdf::{Mm, Position, Scale, Size};

use crate::fonts::{self, FontError};

/// Resolution `genpdf` assumes for embedded images.
const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// Page orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Supported paper formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    /// Page size for the given orientation.
    pub fn size(self, orientation: Orientation) -> PageSize {
        let (short, long) = match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::Letter => (215.9, 279.4),
        };

        match orientation {
            Orientation::Portrait => PageSize::new(short, long),
            Orientation::Landscape => PageSize::new(long, short),
        }
    }
}

/// Page dimensions in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }
}

/// Where the raster lands on the page, in millimetres from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Fits a `px_width` × `px_height` raster onto `page`.
///
/// A raster that fits at full page width is centred vertically.  A taller one
/// is scaled to the page height and centred horizontally.  Returns `None` for
/// rasters without area.
pub fn fit_to_page(px_width: u32, px_height: u32, page: PageSize) -> Option<Placement> {
    if px_width == 0 || px_height == 0 {
        return None;
    }

    let (px_width, px_height) = (px_width as f64, px_height as f64);
    let full_width_height = px_height * page.width_mm / px_width;

    let placement = if full_width_height > page.height_mm {
        let width = px_width * page.height_mm / px_height;
        Placement {
            x_mm: (page.width_mm - width) / 2.0,
            y_mm: 0.0,
            width_mm: width,
            height_mm: page.height_mm,
        }
    } else {
        Placement {
            x_mm: 0.0,
            y_mm: (page.height_mm - full_width_height) / 2.0,
            width_mm: page.width_mm,
            height_mm: full_width_height,
        }
    };

    Some(placement)
}

/// Scale factors that stretch a `px_width` × `px_height` image, embedded at
/// genpdf's default resolution, to the size of `placement`.
fn image_scale(px_width: u32, px_height: u32, placement: &Placement) -> (f64, f64) {
    let natural_width = MM_PER_INCH * f64::from(px_width) / DEFAULT_IMAGE_DPI;
    let natural_height = MM_PER_INCH * f64::from(px_height) / DEFAULT_IMAGE_DPI;
    (
        placement.width_mm / natural_width,
        placement.height_mm / natural_height,
    )
}

/// Failures while building the PDF.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to load fonts for the PDF document")]
    Fonts(#[from] FontError),
    #[error("failed to build the PDF document")]
    Pdf(#[from] genpdf::error::Error),
    #[error("cannot embed an image without pixels")]
    EmptyImage,
}

/// Turns a raster into the bytes of a one-page document.
pub trait PageAssembler {
    /// Size of the page the raster is placed on.
    fn page_size(&self) -> PageSize;

    /// Embeds `raster` at `placement` and returns the encoded document.
    fn assemble(
        &self,
        raster: image::DynamicImage,
        placement: Placement,
    ) -> Result<Vec<u8>, AssembleError>;
}

impl<A: PageAssembler + ?Sized> PageAssembler for &A {
    fn page_size(&self) -> PageSize {
        (**self).page_size()
    }

    fn assemble(
        &self,
        raster: image::DynamicImage,
        placement: Placement,
    ) -> Result<Vec<u8>, AssembleError> {
        (**self).assemble(raster, placement)
    }
}

/// [`PageAssembler`] backed by `genpdf`.
#[derive(Clone, Debug)]
pub struct GenpdfAssembler {
    format: PageFormat,
    orientation: Orientation,
    title: Option<String>,
    fonts_dir: Option<PathBuf>,
}

impl Default for GenpdfAssembler {
    fn default() -> Self {
        Self::new(PageFormat::A4, Orientation::Portrait)
    }
}

impl GenpdfAssembler {
    /// Creates an assembler for the given paper format and orientation.
    pub fn new(format: PageFormat, orientation: Orientation) -> Self {
        Self {
            format,
            orientation,
            title: None,
            fonts_dir: None,
        }
    }

    /// Sets the document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Loads fonts from `directory` before the default search paths.
    pub fn with_fonts_dir(mut self, directory: impl Into<Option<PathBuf>>) -> Self {
        self.fonts_dir = directory.into();
        self
    }

    fn image_element(
        raster: image::DynamicImage,
        placement: Placement,
    ) -> Result<Image, AssembleError> {
        let (px_width, px_height) = raster.dimensions();
        if px_width == 0 || px_height == 0 {
            return Err(AssembleError::EmptyImage);
        }

        let (scale_x, scale_y) = image_scale(px_width, px_height, &placement);
        let scale = Scale::new(scale_x, scale_y);

        let image = Image::from_dynamic_image(image::DynamicImage::ImageRgb8(raster.to_rgb8()))?
            .with_position(Position::new(
                mm_from_f64(placement.x_mm),
                mm_from_f64(placement.y_mm),
            ))
            .with_scale(scale);
        Ok(image)
    }
}

impl PageAssembler for GenpdfAssembler {
    fn page_size(&self) -> PageSize {
        self.format.size(self.orientation)
    }

    fn assemble(
        &self,
        raster: image::DynamicImage,
        placement: Placement,
    ) -> Result<Vec<u8>, AssembleError> {
        let family = fonts::default_font_family(self.fonts_dir.as_deref())?;
        let mut document = genpdf::Document::new(family);

        let page = self.page_size();
        document.set_paper_size(Size::new(
            mm_from_f64(page.width_mm),
            mm_from_f64(page.height_mm),
        ));
        if let Some(title) = &self.title {
            document.set_title(title.clone());
        }

        document.push(Self::image_element(raster, placement)?);

        let mut bytes = Vec::new();
        document.render(&mut bytes)?;
        debug!(
            "assembled {} byte PDF with image at ({:.1}, {:.1}) mm, {:.1} x {:.1} mm",
            bytes.len(),
            placement.x_mm,
            placement.y_mm,
            placement.width_mm,
            placement.height_mm
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: PageSize = PageSize {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn short_raster_is_centred_vertically_at_full_width() {
        let placement = fit_to_page(1600, 1000, A4).unwrap();
        assert!(close(placement.x_mm, 0.0));
        assert!(close(placement.width_mm, 210.0));
        assert!(close(placement.height_mm, 131.25));
        assert!(close(placement.y_mm, (297.0 - 131.25) / 2.0));
    }

    #[test]
    fn tall_raster_is_scaled_to_page_height() {
        let placement = fit_to_page(1000, 3000, A4).unwrap();
        assert!(close(placement.y_mm, 0.0));
        assert!(close(placement.height_mm, 297.0));
        assert!(close(placement.width_mm, 99.0));
        assert!(close(placement.x_mm, 55.5));
    }

    #[test]
    fn raster_with_page_aspect_fills_the_page() {
        let placement = fit_to_page(210, 297, A4).unwrap();
        assert!(close(placement.x_mm, 0.0));
        assert!(close(placement.y_mm, 0.0));
        assert!(close(placement.width_mm, 210.0));
        assert!(close(placement.height_mm, 297.0));
    }

    #[test]
    fn empty_raster_has_no_placement() {
        assert_eq!(fit_to_page(0, 10, A4), None);
        assert_eq!(fit_to_page(10, 0, A4), None);
    }

    #[test]
    fn image_scale_maps_natural_size_onto_placement() {
        // 1600 px at 300 dpi is 135.47 mm wide.
        let short = fit_to_page(1600, 1000, A4).unwrap();
        let (sx, sy) = image_scale(1600, 1000, &short);
        assert!(close(sx, 210.0 / (25.4 * 1600.0 / 300.0)));
        assert!(close(sy, sx));
        assert!(close(sy * 25.4 * 1000.0 / 300.0, short.height_mm));

        let tall = fit_to_page(1000, 3000, A4).unwrap();
        let (sx, sy) = image_scale(1000, 3000, &tall);
        assert!(close(sx * 25.4 * 1000.0 / 300.0, 99.0));
        assert!(close(sy * 25.4 * 3000.0 / 300.0, 297.0));
    }

    #[test]
    fn landscape_swaps_sides() {
        assert_eq!(
            PageFormat::A4.size(Orientation::Landscape),
            PageSize::new(297.0, 210.0)
        );
        assert_eq!(PageFormat::A4.size(Orientation::Portrait), A4);
    }
}
