use crate::geometry::{fit_image, PageSize};
use crate::options::{Alignment, GridOptions, InsertOptions, LayoutSpec};

/// Point a watermark instance is centered on, and the room it may fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub box_width: f64,
    pub box_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extent {
    /// Rendered width of the widest text line.
    Text { width: f64 },
    /// Intrinsic image size and the post-fit scale factor.
    Image { width: f64, height: f64, scale: f64 },
}

/// Anchors for one page size, plus the fitted image size when the content is
/// an image. The fit is computed once per plan and shared by every anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub anchors: Vec<Anchor>,
    pub image_size: Option<(f64, f64)>,
}

pub fn plan(layout: &LayoutSpec, page: PageSize, extent: Extent) -> LayoutPlan {
    match layout {
        LayoutSpec::Grid(grid) => plan_grid(grid, page, extent),
        LayoutSpec::Insert(insert) => plan_insert(insert, page, extent),
    }
}

pub fn cell_size(grid: &GridOptions, page: PageSize) -> (f64, f64) {
    (
        page.width / grid.horizontal_boxes as f64,
        page.height / grid.vertical_boxes as f64,
    )
}

/// Grid anchors, column by column.
///
/// Without margin the anchors sit on the cell corners `0..=N` of each axis, so
/// watermarks on the page edges are cut in half. With margin, index 0 is
/// skipped and every anchor moves back half a cell, which lands them on the
/// `N` cell centers.
pub fn grid_anchors(grid: &GridOptions, page: PageSize) -> Vec<Anchor> {
    let (cell_w, cell_h) = cell_size(grid, page);
    let start = if grid.margin { 1 } else { 0 };
    let (shift_x, shift_y) = if grid.margin {
        (cell_w / 2.0, cell_h / 2.0)
    } else {
        (0.0, 0.0)
    };

    let mut anchors = Vec::new();
    for i in start..=grid.horizontal_boxes {
        for j in start..=grid.vertical_boxes {
            anchors.push(Anchor {
                x: i as f64 * cell_w - shift_x,
                y: j as f64 * cell_h - shift_y,
                box_width: cell_w,
                box_height: cell_h,
            });
        }
    }
    anchors
}

fn plan_grid(grid: &GridOptions, page: PageSize, extent: Extent) -> LayoutPlan {
    let (cell_w, cell_h) = cell_size(grid, page);
    let image_size = match extent {
        Extent::Image {
            width,
            height,
            scale,
        } => Some(fit_image(width, height, cell_w, cell_h, scale)),
        Extent::Text { .. } => None,
    };

    LayoutPlan {
        anchors: grid_anchors(grid, page),
        image_size,
    }
}

/// Room available around an inserted watermark.
///
/// Horizontally, the side the watermark extends into: left of the anchor for
/// left alignment, right of it for right alignment, and twice the distance to
/// the closer edge when centered. Vertically it is always centered.
pub fn insert_box(insert: &InsertOptions, page: PageSize) -> (f64, f64) {
    let (x, y) = (insert.x, insert.y);
    let max_width = match insert.horizontal_alignment {
        Alignment::Left => x * page.width,
        Alignment::Right => (1.0 - x) * page.width,
        Alignment::Center => (2.0 * x * page.width).min(2.0 * (1.0 - x) * page.width),
    };
    let max_height = (2.0 * y * page.height).min(2.0 * (1.0 - y) * page.height);
    (max_width, max_height)
}

/// Shift from the anchor to the watermark center.
pub fn alignment_offset(alignment: Alignment, watermark_width: f64) -> f64 {
    match alignment {
        Alignment::Left => -watermark_width / 2.0,
        Alignment::Center => 0.0,
        Alignment::Right => watermark_width / 2.0,
    }
}

fn plan_insert(insert: &InsertOptions, page: PageSize, extent: Extent) -> LayoutPlan {
    let (box_width, box_height) = insert_box(insert, page);

    let (watermark_width, image_size) = match extent {
        Extent::Text { width } => (width, None),
        Extent::Image {
            width,
            height,
            scale,
        } => {
            let fitted = fit_image(width, height, box_width, box_height, scale);
            (fitted.0, Some(fitted))
        }
    };

    let anchor = Anchor {
        x: insert.x * page.width + alignment_offset(insert.horizontal_alignment, watermark_width),
        y: insert.y * page.height,
        box_width,
        box_height,
    };

    LayoutPlan {
        anchors: vec![anchor],
        image_size,
    }
}
