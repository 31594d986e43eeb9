//! Page-size batching: one watermark render per distinct page size, merged onto
//! every page of that size, with the original page order restored afterwards.

use crate::draw::render_watermark_page;
use crate::error::{Result, WatermarkError};
use crate::geometry::PageSize;
use crate::options::{DrawingOptions, LayoutSpec};
use crate::pdf;
use crate::raster::{degrade, rasterize_document, rasterize_layer, Rasterizer};
use lopdf::{Document, ObjectId};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Group page indices by size, groups in order of first appearance.
pub fn group_pages(sizes: &[PageSize]) -> Vec<(PageSize, Vec<usize>)> {
    let mut groups: Vec<(PageSize, Vec<usize>)> = Vec::new();
    let mut slot: HashMap<PageSize, usize> = HashMap::new();
    for (index, size) in sizes.iter().enumerate() {
        match slot.get(size) {
            Some(&g) => groups[g].1.push(index),
            None => {
                slot.insert(*size, groups.len());
                groups.push((*size, vec![index]));
            }
        }
    }
    groups
}

pub fn restore_order(mut placed: Vec<(usize, ObjectId)>) -> Vec<ObjectId> {
    placed.sort_by_key(|(index, _)| *index);
    placed.into_iter().map(|(_, id)| id).collect()
}

/// Stamp every page of `doc` with a watermark rendered by `render`.
///
/// `render` is called once per distinct page size and must return a one-page
/// document of that size. Returns the number of renders.
pub fn watermark_document<F>(doc: &mut Document, mut render: F) -> Result<usize>
where
    F: FnMut(PageSize) -> Result<Document>,
{
    let pages = pdf::pages(doc)?;
    if pages.is_empty() {
        return Err(WatermarkError::MalformedPdf("document has no pages".into()));
    }
    let sizes: Vec<PageSize> = pages.iter().map(|(_, bounds)| bounds.size()).collect();

    let mut forms: HashMap<PageSize, ObjectId> = HashMap::new();
    let mut placed = Vec::with_capacity(pages.len());
    for (size, indices) in group_pages(&sizes) {
        let form = match forms.get(&size) {
            Some(&id) => id,
            None => {
                let layer = render(size)?;
                let id = pdf::import_watermark(doc, &layer)?;
                forms.insert(size, id);
                id
            }
        };
        for index in indices {
            let page_id = pages[index].0;
            pdf::stamp_page(doc, page_id, form)?;
            placed.push((index, page_id));
        }
    }

    let order = restore_order(placed);
    pdf::rebuild_page_tree(doc, &order)?;
    debug!(pages = order.len(), renders = forms.len(), "watermarked document");
    Ok(forms.len())
}

/// Watermark the PDF at `input` and write the result to `output`.
pub fn add_watermark_to_pdf(
    input: &Path,
    output: &Path,
    options: &DrawingOptions,
    layout: &LayoutSpec,
    rasterizer: &dyn Rasterizer,
) -> Result<()> {
    if !input.is_file() {
        return Err(WatermarkError::NotFound(input.to_path_buf()));
    }

    let mut doc = Document::load(input)?;
    let sizes: Vec<PageSize> = pdf::pages(&doc)?
        .iter()
        .map(|(_, bounds)| bounds.size())
        .collect();

    // an image layer holds no text to select
    let flatten_layer =
        options.unselectable && !options.save_as_image && !options.content.is_image();
    watermark_document(&mut doc, |size| {
        let layer = render_watermark_page(size, options, layout)?;
        if flatten_layer {
            rasterize_layer(layer, size, options.dpi, rasterizer)
        } else {
            Ok(layer)
        }
    })?;

    let mut bytes = pdf::to_bytes(&mut doc)?;
    if options.save_as_image {
        let rebuilt = rasterize_document(&bytes, &sizes, options.dpi, options.quality, rasterizer);
        if let Some(mut image_doc) = degrade(rebuilt.map(Some), None, "--save-as-image")? {
            bytes = pdf::to_bytes(&mut image_doc)?;
        }
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, bytes)?;
    Ok(())
}
