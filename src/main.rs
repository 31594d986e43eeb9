use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use pdf_watermark::font::FontSpec;
use pdf_watermark::options::defaults;
use pdf_watermark::{
    add_watermark_from_options, DrawingOptions, FilesOptions, GridOptions, InsertOptions,
    LayoutSpec, Poppler, WatermarkContent,
};
use tracing_subscriber::EnvFilter;

/// Add a watermark to one or more PDF files.
///
/// The watermark is repeated over a grid with `grid`, or placed once with `insert`.
#[derive(Parser)]
#[command(name = "pdf-watermark", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Repeat the watermark over a grid of boxes.
    Grid {
        /// Repetitions along the horizontal direction
        #[arg(long, default_value_t = defaults::HORIZONTAL_BOXES)]
        horizontal_boxes: u32,

        /// Repetitions along the vertical direction
        #[arg(short = 'v', long, default_value_t = defaults::VERTICAL_BOXES)]
        vertical_boxes: u32,

        /// Leave half a box of margin so no watermark is cut at the page edges
        #[arg(short, long, default_value_t = defaults::MARGIN)]
        margin: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Insert a single watermark at a position.
    Insert {
        /// Horizontal position, between 0 and 1
        #[arg(short, long, default_value_t = defaults::X)]
        x: f64,

        /// Vertical position, between 0 and 1
        #[arg(short, long, default_value_t = defaults::Y)]
        y: f64,

        /// left, right or center
        #[arg(long, default_value = defaults::HORIZONTAL_ALIGNMENT)]
        horizontal_alignment: String,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// PDF file or directory of PDF files
    file: String,

    /// Text, or the path of a png/jpg image
    watermark: String,

    /// File or folder to save results to; input files are overwritten by default
    #[arg(short, long)]
    save: Option<String>,

    /// Opacity between 0 (invisible) and 1 (opaque)
    #[arg(short, long, default_value_t = defaults::OPACITY)]
    opacity: f64,

    /// Inclination in degrees
    #[arg(short, long, default_value_t = defaults::ANGLE, allow_negative_numbers = true)]
    angle: f64,

    /// Text color as #RRGGBB or #RGB
    #[arg(long, default_value = defaults::TEXT_COLOR)]
    text_color: String,

    /// Standard font name or path to a .ttf file
    #[arg(long, default_value = defaults::TEXT_FONT)]
    text_font: String,

    #[arg(long, default_value_t = defaults::TEXT_SIZE)]
    text_size: f64,

    /// Draw the watermark layer as an image so its text cannot be selected
    #[arg(long)]
    unselectable: bool,

    /// Scale applied after the image is fitted to its box
    #[arg(long, default_value_t = defaults::IMAGE_SCALE)]
    image_scale: f64,

    /// Convert every output page to an image
    #[arg(long)]
    save_as_image: bool,

    /// Resolution used when rasterizing
    #[arg(long, default_value_t = defaults::DPI)]
    dpi: u32,

    /// Encoding of rasterized pages: "lossless" or 1-100 (JPEG)
    #[arg(long, default_value = defaults::QUALITY)]
    quality: String,

    /// List affected files without modifying them
    #[arg(long)]
    dry_run: bool,

    /// Number of files processed in parallel
    #[arg(long, default_value_t = defaults::WORKERS)]
    workers: usize,

    /// Log the files being processed
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    verbose: bool,
}

impl CommonArgs {
    fn drawing_options(&self) -> Result<DrawingOptions> {
        let content = WatermarkContent::resolve(&self.watermark)
            .with_context(|| format!("loading watermark '{}'", self.watermark))?;
        let mut options = DrawingOptions::new(content);
        options.opacity = self.opacity;
        options.angle = self.angle;
        options.text_color = self.text_color.parse()?;
        options.font = FontSpec::resolve(&self.text_font)?;
        options.font_size = self.text_size;
        options.unselectable = self.unselectable;
        options.image_scale = self.image_scale;
        options.save_as_image = self.save_as_image;
        options.dpi = self.dpi;
        options.quality = self.quality.parse()?;
        options.validate()?;
        Ok(options)
    }

    fn files_options(&self) -> Result<FilesOptions> {
        Ok(FilesOptions::new(
            &self.file,
            self.save.as_deref(),
            self.dry_run,
            self.workers,
        )?)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (layout, common): (LayoutSpec, CommonArgs) = match cli.command {
        Command::Grid {
            horizontal_boxes,
            vertical_boxes,
            margin,
            common,
        } => (
            GridOptions::new(horizontal_boxes, vertical_boxes, margin)?.into(),
            common,
        ),
        Command::Insert {
            x,
            y,
            horizontal_alignment,
            common,
        } => (InsertOptions::new(x, y, &horizontal_alignment)?.into(), common),
    };
    init_logging(common.verbose);

    let options = common.drawing_options()?;
    let files = common.files_options().context("resolving input files")?;

    let report = add_watermark_from_options(&files, &options, &layout, &Poppler::default())?;

    if files.dry_run {
        for (input, output) in &report.planned {
            if input == output {
                println!("modifying: {}", output.display());
            } else {
                println!("creating: {}", output.display());
            }
        }
        return Ok(());
    }

    if !report.is_success() {
        bail!(
            "{} of {} files failed",
            report.failures.len(),
            report.planned.len()
        );
    }
    Ok(())
}
