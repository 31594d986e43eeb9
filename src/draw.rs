use crate::canvas::{PdfCanvas, Surface};
use crate::error::Result;
use crate::geometry::{change_base, PageSize, RotationMatrix};
use crate::layout::{self, Extent};
use crate::options::{DrawingOptions, LayoutSpec, WatermarkContent};
use lopdf::Document;
use tracing::debug;

/// Literal two-character marker separating lines of a text watermark.
pub const LINE_BREAK: &str = r"\n";

pub fn text_lines(text: &str) -> Vec<&str> {
    text.split(LINE_BREAK).collect()
}

/// Draw one watermark instance centered on the page point `(x, y)`.
///
/// The surface is expected to be rotated by `rotation` already.
pub fn draw_one_watermark<S: Surface>(
    surface: &mut S,
    x: f64,
    y: f64,
    rotation: &RotationMatrix,
    content: &WatermarkContent,
    image_size: (f64, f64),
) -> Result<()> {
    let (x, y) = change_base(x, y, rotation);

    match content {
        WatermarkContent::Text(text) => {
            let lines = text_lines(text);
            let leading = surface.leading();
            let mut line_y = y + (lines.len() - 1) as f64 * leading / 2.0;
            for line in lines {
                surface.draw_centred_string(x, line_y, line)?;
                line_y -= leading;
            }
        }
        WatermarkContent::Image(image) => {
            let (width, height) = image_size;
            surface.draw_image(image, x - width / 2.0, y - height / 2.0, width, height)?;
        }
    }
    Ok(())
}

fn extent<S: Surface>(surface: &S, options: &DrawingOptions) -> Extent {
    match &options.content {
        WatermarkContent::Text(text) => Extent::Text {
            width: text_lines(text)
                .into_iter()
                .map(|line| surface.string_width(line))
                .fold(0.0, f64::max),
        },
        WatermarkContent::Image(image) => {
            let (width, height) = image.size();
            Extent::Image {
                width,
                height,
                scale: options.image_scale,
            }
        }
    }
}

/// Draw every watermark instance for a page of `page` size.
pub fn draw_watermarks<S: Surface>(
    surface: &mut S,
    page: PageSize,
    options: &DrawingOptions,
    layout: &LayoutSpec,
) -> Result<usize> {
    let rotation = RotationMatrix::new(options.angle);

    surface.set_fill(options.text_color, options.opacity);
    surface.rotate(options.angle);

    let extent = extent(surface, options);
    let plan = layout::plan(layout, page, extent);
    let image_size = match (&options.content, plan.image_size) {
        (_, Some(size)) => size,
        (WatermarkContent::Image(image), None) => image.size(),
        (WatermarkContent::Text(_), None) => (0.0, 0.0),
    };

    for anchor in &plan.anchors {
        draw_one_watermark(
            surface,
            anchor.x,
            anchor.y,
            &rotation,
            &options.content,
            image_size,
        )?;
    }
    Ok(plan.anchors.len())
}

/// Render the watermark layer for one page size as a single-page PDF.
pub fn render_watermark_page(
    page: PageSize,
    options: &DrawingOptions,
    layout: &LayoutSpec,
) -> Result<Document> {
    let mut canvas = PdfCanvas::new(page, options.font.clone(), options.font_size);
    let count = draw_watermarks(&mut canvas, page, options, layout)?;
    debug!(
        width = page.width,
        height = page.height,
        instances = count,
        "rendered watermark page"
    );
    canvas.finish()
}
