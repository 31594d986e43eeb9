use crate::builder::build_image_pdf;
use crate::error::{RasterError, Result, WatermarkError};
use crate::geometry::PageSize;
use crate::options::Quality;
use crate::pdf;
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::Document;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Turns every page of a PDF into an image.
///
/// With `transparent` unset the page background is painted white.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        pdf: &[u8],
        dpi: u32,
        transparent: bool,
    ) -> std::result::Result<Vec<DynamicImage>, RasterError>;
}

/// Rasterizer backed by poppler's `pdftocairo`.
#[derive(Debug, Clone)]
pub struct Poppler {
    program: PathBuf,
}

impl Poppler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Poppler {
    fn default() -> Self {
        Self::new("pdftocairo")
    }
}

impl Rasterizer for Poppler {
    fn rasterize(
        &self,
        pdf: &[u8],
        dpi: u32,
        transparent: bool,
    ) -> std::result::Result<Vec<DynamicImage>, RasterError> {
        let dir = tempfile::tempdir().map_err(failed)?;
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, pdf).map_err(failed)?;
        let prefix = dir.path().join("page");

        let mut command = Command::new(&self.program);
        command.arg("-png");
        if transparent {
            command.arg("-transp");
        }
        let output = command
            .arg("-r")
            .arg(dpi.to_string())
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    RasterError::BackendUnavailable(self.program.display().to_string())
                }
                _ => failed(e),
            })?;
        if !output.status.success() {
            return Err(RasterError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // page-1.png, page-2.png, ... zero padded to a common width
        let mut pages: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .map_err(failed)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        pages.sort();
        debug!(pages = pages.len(), dpi, "rasterized document");

        pages
            .iter()
            .map(|p| image::open(p).map_err(failed))
            .collect()
    }
}

fn failed(e: impl std::fmt::Display) -> RasterError {
    RasterError::Failed(e.to_string())
}

fn page_images(
    pdf: &[u8],
    count: usize,
    dpi: u32,
    transparent: bool,
    rasterizer: &dyn Rasterizer,
) -> Result<Vec<DynamicImage>> {
    let images = rasterizer.rasterize(pdf, dpi, transparent)?;
    if images.len() != count {
        return Err(RasterError::Failed(format!(
            "expected {} page images, got {}",
            count,
            images.len()
        ))
        .into());
    }
    Ok(images)
}

/// Composite `img` over white, dropping its alpha channel.
fn on_white(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }
    let rgba = img.to_rgba8();
    let blend = |c: u8, a: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([blend(r, a), blend(g, a), blend(b, a)])
    });
    DynamicImage::ImageRgb8(rgb)
}

/// Rasterize `pdf` and rebuild it with one full-page image per page, each page
/// sized to `sizes`.
pub fn rasterize_document(
    pdf: &[u8],
    sizes: &[PageSize],
    dpi: u32,
    quality: Quality,
    rasterizer: &dyn Rasterizer,
) -> Result<Document> {
    let images = page_images(pdf, sizes.len(), dpi, false, rasterizer)?;
    let pages: Vec<(DynamicImage, PageSize)> = images
        .into_iter()
        .map(on_white)
        .zip(sizes.iter().copied())
        .collect();
    build_image_pdf(&pages, quality)
}

/// Replace a vector watermark layer with a transparent image of itself.
pub fn rasterize_layer(
    mut layer: Document,
    size: PageSize,
    dpi: u32,
    rasterizer: &dyn Rasterizer,
) -> Result<Document> {
    let bytes = pdf::to_bytes(&mut layer)?;
    let rebuilt = page_images(&bytes, 1, dpi, true, rasterizer).and_then(|images| {
        let pages: Vec<(DynamicImage, PageSize)> = images.into_iter().map(|img| (img, size)).collect();
        build_image_pdf(&pages, Quality::Lossless)
    });
    degrade(rebuilt, layer, "--unselectable")
}

/// Keep `fallback` when the backend is missing; propagate every other error.
pub fn degrade<T>(result: Result<T>, fallback: T, feature: &str) -> Result<T> {
    match result {
        Err(WatermarkError::Raster(RasterError::BackendUnavailable(program))) => {
            warn!(
                "{feature} requires poppler ({program}) to be installed, proceeding without it"
            );
            Ok(fallback)
        }
        other => other,
    }
}
