use crate::error::{Result, WatermarkError};
use crate::font::FontSpec;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Default values shared by the CLI and the library constructors.
pub mod defaults {
    pub const ANGLE: f64 = 45.0;
    pub const DPI: u32 = 300;
    pub const WORKERS: usize = 1;
    pub const HORIZONTAL_ALIGNMENT: &str = "center";
    pub const HORIZONTAL_BOXES: u32 = 3;
    pub const VERTICAL_BOXES: u32 = 6;
    pub const IMAGE_SCALE: f64 = 1.0;
    pub const MARGIN: bool = false;
    pub const OPACITY: f64 = 0.1;
    pub const TEXT_COLOR: &str = "#000000";
    pub const TEXT_FONT: &str = "Helvetica";
    pub const TEXT_SIZE: f64 = 12.0;
    pub const X: f64 = 0.5;
    pub const Y: f64 = 0.5;
    pub const QUALITY: &str = "lossless";
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decoded watermark image with its intrinsic pixel size.
#[derive(Clone)]
pub struct ImageHandle {
    image: Arc<DynamicImage>,
    width: u32,
    height: u32,
}

impl ImageHandle {
    pub fn new(image: DynamicImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(WatermarkError::config("watermark image has a zero dimension"));
        }
        Ok(Self {
            image: Arc::new(image),
            width,
            height,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::new(image::open(path)?)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    /// Whether both handles share the same decoded image.
    pub fn same_image(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("dimensions", &(self.width, self.height))
            .finish()
    }
}

/// What gets stamped. Exactly one kind per run.
#[derive(Debug, Clone)]
pub enum WatermarkContent {
    /// Literal text; the two characters `\n` separate lines.
    Text(String),
    Image(ImageHandle),
}

impl WatermarkContent {
    /// Treat `watermark` as an image path when it has an image extension and
    /// names an existing file relative to the working directory; otherwise it
    /// is literal text.
    pub fn resolve(watermark: &str) -> Result<Self> {
        let path = std::env::current_dir()?.join(watermark);
        if has_image_extension(watermark) && path.is_file() {
            Ok(Self::Image(ImageHandle::open(&path)?))
        } else {
            Ok(Self::Text(watermark.to_string()))
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Components scaled to `0.0..=1.0`, as PDF color operators expect.
    pub fn components(&self) -> [f64; 3] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        ]
    }
}

impl FromStr for Color {
    type Err = WatermarkError;

    /// Parses `#RGB` or `#RRGGBB`.
    fn from_str(hex: &str) -> Result<Self> {
        let invalid = || WatermarkError::config(format!("invalid hex color '{hex}'"));
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Lossless,
    Jpeg(u8),
}

impl FromStr for Quality {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "lossless" {
            return Ok(Quality::Lossless);
        }
        let q: u8 = s
            .parse()
            .map_err(|_| WatermarkError::config("quality must be 'lossless' or a number 1-100"))?;
        if !(1..=100).contains(&q) {
            return Err(WatermarkError::config("quality must be between 1 and 100"));
        }
        Ok(Quality::Jpeg(q))
    }
}

/// How the watermark looks, independent of where it goes.
#[derive(Debug, Clone)]
pub struct DrawingOptions {
    pub content: WatermarkContent,
    pub opacity: f64,
    /// Degrees, counter-clockwise.
    pub angle: f64,
    pub text_color: Color,
    pub font: FontSpec,
    pub font_size: f64,
    pub image_scale: f64,
    /// Rasterize the watermark layer before merging so its text cannot be selected.
    pub unselectable: bool,
    pub save_as_image: bool,
    pub dpi: u32,
    pub quality: Quality,
}

impl DrawingOptions {
    pub fn new(content: WatermarkContent) -> Self {
        Self {
            content,
            opacity: defaults::OPACITY,
            angle: defaults::ANGLE,
            text_color: Color::black(),
            font: FontSpec::default(),
            font_size: defaults::TEXT_SIZE,
            image_scale: defaults::IMAGE_SCALE,
            unselectable: false,
            save_as_image: false,
            dpi: defaults::DPI,
            quality: Quality::Lossless,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(WatermarkContent::Text(text.into()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::config("opacity must be between 0 and 1"));
        }
        if !self.angle.is_finite() {
            return Err(WatermarkError::config("angle must be a finite number"));
        }
        if !(self.font_size > 0.0) {
            return Err(WatermarkError::config("text size must be positive"));
        }
        if !(self.image_scale > 0.0) {
            return Err(WatermarkError::config("image scale must be positive"));
        }
        if self.dpi == 0 {
            return Err(WatermarkError::config("dpi must be at least 1"));
        }
        Ok(())
    }
}

/// Horizontal placement of an inserted watermark relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// The watermark extends left of the anchor, which marks its right edge.
    Left,
    Center,
    /// The watermark extends right of the anchor, which marks its left edge.
    Right,
}

impl FromStr for Alignment {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(WatermarkError::config(format!(
                "invalid alignment '{other}': horizontal alignment must be either left, right or center"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub horizontal_boxes: u32,
    pub vertical_boxes: u32,
    /// Inset the grid by half a cell so no watermark is cut at the edges.
    pub margin: bool,
}

impl GridOptions {
    pub fn new(horizontal_boxes: u32, vertical_boxes: u32, margin: bool) -> Result<Self> {
        if horizontal_boxes == 0 || vertical_boxes == 0 {
            return Err(WatermarkError::config("grid needs at least one box per axis"));
        }
        Ok(Self {
            horizontal_boxes,
            vertical_boxes,
            margin,
        })
    }
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            horizontal_boxes: defaults::HORIZONTAL_BOXES,
            vertical_boxes: defaults::VERTICAL_BOXES,
            margin: defaults::MARGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertOptions {
    pub x: f64,
    pub y: f64,
    pub horizontal_alignment: Alignment,
}

impl InsertOptions {
    pub fn new(x: f64, y: f64, horizontal_alignment: &str) -> Result<Self> {
        for (name, value) in [("x", x), ("y", y)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WatermarkError::config(format!(
                    "{name} must be between 0 and 1"
                )));
            }
        }
        Ok(Self {
            x,
            y,
            horizontal_alignment: horizontal_alignment.parse()?,
        })
    }
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            x: defaults::X,
            y: defaults::Y,
            horizontal_alignment: Alignment::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutSpec {
    Grid(GridOptions),
    Insert(InsertOptions),
}

impl From<GridOptions> for LayoutSpec {
    fn from(options: GridOptions) -> Self {
        Self::Grid(options)
    }
}

impl From<InsertOptions> for LayoutSpec {
    fn from(options: InsertOptions) -> Self {
        Self::Insert(options)
    }
}
