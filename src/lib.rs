pub mod builder;
pub mod canvas;
pub mod compositor;
pub mod draw;
pub mod error;
pub mod files;
pub mod font;
pub mod geometry;
pub mod handler;
pub mod layout;
pub mod options;
pub mod pdf;
pub mod raster;

pub use compositor::{add_watermark_to_pdf, watermark_document};
pub use error::{RasterError, Result, WatermarkError};
pub use files::FilesOptions;
pub use handler::{add_watermark_from_options, BatchReport};
pub use options::{
    Alignment, Color, DrawingOptions, GridOptions, InsertOptions, LayoutSpec, Quality,
    WatermarkContent,
};
pub use raster::{Poppler, Rasterizer};

use draw::render_watermark_page;
use lopdf::Document;
use wasm_bindgen::prelude::*;

fn layout_from_name(name: &str) -> Result<LayoutSpec> {
    match name {
        "grid" => Ok(GridOptions::default().into()),
        "insert" => Ok(InsertOptions::default().into()),
        other => Err(WatermarkError::UnsupportedLayout(other.to_string())),
    }
}

/// Watermark an in-memory PDF with text.
///
/// Standard fonts only and no rasterization, so it runs anywhere.
pub fn watermark_bytes(
    pdf_bytes: &[u8],
    text: &str,
    layout: &str,
    opacity: f64,
    angle: f64,
    text_color: &str,
    text_size: f64,
) -> Result<Vec<u8>> {
    let layout = layout_from_name(layout)?;
    let mut options = DrawingOptions::text(text);
    options.opacity = opacity;
    options.angle = angle;
    options.text_color = text_color.parse()?;
    options.font_size = text_size;
    options.validate()?;

    let mut doc = Document::load_mem(pdf_bytes)?;
    watermark_document(&mut doc, |size| render_watermark_page(size, &options, &layout))?;
    pdf::to_bytes(&mut doc)
}

#[wasm_bindgen]
pub fn watermark_pdf_bytes(
    pdf_bytes: &[u8],
    text: &str,
    layout: &str,
    opacity: f64,
    angle: f64,
    text_color: &str,
    text_size: f64,
) -> std::result::Result<Vec<u8>, JsValue> {
    watermark_bytes(pdf_bytes, text, layout, opacity, angle, text_color, text_size)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn get_page_count(pdf_bytes: &[u8]) -> std::result::Result<usize, JsValue> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(doc.get_pages().len())
}
