use crate::compositor::add_watermark_to_pdf;
use crate::error::{Result, WatermarkError};
use crate::files::FilesOptions;
use crate::options::{DrawingOptions, LayoutSpec};
use crate::raster::Rasterizer;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of a batch run. Every file is attempted; failures do not stop the
/// others.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub planned: Vec<(PathBuf, PathBuf)>,
    pub processed: usize,
    pub failures: Vec<(PathBuf, WatermarkError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn process_file(
    input: &Path,
    output: &Path,
    options: &DrawingOptions,
    layout: &LayoutSpec,
    rasterizer: &dyn Rasterizer,
) -> Result<()> {
    if input == output {
        info!("modifying: {}", output.display());
    } else {
        info!("creating: {}", output.display());
    }
    add_watermark_to_pdf(input, output, options, layout, rasterizer)
}

/// Watermark every file in `files`.
///
/// Option errors are returned before any file is touched. Per-file errors are
/// collected in the report.
pub fn add_watermark_from_options(
    files: &FilesOptions,
    options: &DrawingOptions,
    layout: &LayoutSpec,
    rasterizer: &dyn Rasterizer,
) -> Result<BatchReport> {
    options.validate()?;
    if options.unselectable && options.content.is_image() {
        warn!("--unselectable has no effect on image watermarks");
    }

    let mut report = BatchReport {
        planned: files.pairs().to_vec(),
        ..BatchReport::default()
    };
    if files.dry_run {
        return Ok(report);
    }

    let run = |(input, output): &(PathBuf, PathBuf)| {
        process_file(input, output, options, layout, rasterizer).map_err(|e| (input.clone(), e))
    };

    let results: Vec<std::result::Result<(), (PathBuf, WatermarkError)>> = if files.workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(files.workers)
            .build()
            .map_err(|e| WatermarkError::config(format!("cannot start worker pool: {e}")))?;
        pool.install(|| files.pairs().par_iter().map(run).collect())
    } else {
        files.pairs().iter().map(run).collect()
    };

    for result in results {
        match result {
            Ok(()) => report.processed += 1,
            Err((input, e)) => {
                error!("{}: {e}", input.display());
                report.failures.push((input, e));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;
    use crate::options::{GridOptions, ImageHandle, InsertOptions, WatermarkContent};
    use crate::pdf::tests::document_with_pages;
    use crate::raster::tests::MissingBackend;
    use image::{DynamicImage, Rgba, RgbaImage};
    use lopdf::Document;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run a dry batch with `options` and return what was logged.
    fn logged_dry_run(options: &DrawingOptions) -> String {
        let dir = tempfile::tempdir().unwrap();
        let files = pair_files(dir.path(), 1);
        let files = FilesOptions::from_pairs(files.pairs().to_vec(), true, 1).unwrap();

        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            add_watermark_from_options(&files, options, &GridOptions::default().into(), &MissingBackend)
                .unwrap();
        });

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn write_pdf(path: &Path, sizes: &[(f64, f64)]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        document_with_pages(sizes).save(path).unwrap();
    }

    fn pair_files(dir: &Path, n: usize) -> FilesOptions {
        let pairs = (0..n)
            .map(|i| {
                let input = dir.join(format!("in/{i}.pdf"));
                write_pdf(&input, &[(200.0 + i as f64, 300.0)]);
                (input, dir.join(format!("out/{i}.pdf")))
            })
            .collect();
        FilesOptions::from_pairs(pairs, false, 1).unwrap()
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = pair_files(dir.path(), 2);
        let files = FilesOptions::from_pairs(files.pairs().to_vec(), true, 1).unwrap();

        let report = add_watermark_from_options(
            &files,
            &DrawingOptions::text("watermark"),
            &GridOptions::default().into(),
            &MissingBackend,
        )
        .unwrap();

        assert_eq!(report.planned.len(), 2);
        assert_eq!(report.processed, 0);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let files = pair_files(dir.path(), 4);
        let options = DrawingOptions::text("watermark");
        let layout: LayoutSpec = InsertOptions::default().into();

        let sequential = add_watermark_from_options(&files, &options, &layout, &MissingBackend).unwrap();
        assert_eq!(sequential.processed, 4);
        let first: Vec<Vec<u8>> = files.pairs().iter().map(|(_, o)| std::fs::read(o).unwrap()).collect();

        let parallel = FilesOptions::from_pairs(files.pairs().to_vec(), false, 3).unwrap();
        let report = add_watermark_from_options(&parallel, &options, &layout, &MissingBackend).unwrap();
        assert!(report.is_success());
        let second: Vec<Vec<u8>> = files.pairs().iter().map(|(_, o)| std::fs::read(o).unwrap()).collect();
        assert_eq!(first, second);

        for (i, (_, output)) in files.pairs().iter().enumerate() {
            let doc = Document::load(output).unwrap();
            let (_, bounds) = crate::pdf::pages(&doc).unwrap()[0];
            assert_eq!(bounds.size(), PageSize::new(200.0 + i as f64, 300.0));
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        write_pdf(&good, &[(100.0, 100.0)]);
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();

        let files = FilesOptions::from_pairs(
            vec![
                (broken.clone(), dir.path().join("broken-out.pdf")),
                (good, dir.path().join("good-out.pdf")),
            ],
            false,
            1,
        )
        .unwrap();
        let report = add_watermark_from_options(
            &files,
            &DrawingOptions::text("watermark"),
            &GridOptions::default().into(),
            &MissingBackend,
        )
        .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, broken);
        assert!(dir.path().join("good-out.pdf").exists());
    }

    #[test]
    fn test_invalid_options_fail_before_any_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = pair_files(dir.path(), 1);
        let mut options = DrawingOptions::text("watermark");
        options.opacity = 2.0;

        let err = add_watermark_from_options(&files, &options, &GridOptions::default().into(), &MissingBackend)
            .unwrap_err();
        assert!(matches!(err, WatermarkError::Configuration(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_unselectable_image_logs_warning() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let mut options = DrawingOptions::new(WatermarkContent::Image(ImageHandle::new(image).unwrap()));
        options.unselectable = true;

        let logs = logged_dry_run(&options);
        assert!(logs.contains("WARN"));
        assert_eq!(logs.matches("--unselectable has no effect on image watermarks").count(), 1);
    }

    #[test]
    fn test_unselectable_text_logs_no_warning() {
        let mut options = DrawingOptions::text("watermark");
        options.unselectable = true;
        assert!(!logged_dry_run(&options).contains("--unselectable"));
    }
}
