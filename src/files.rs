use crate::error::{Result, WatermarkError};
use glob::{glob_with, MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[derive(Debug, Clone)]
pub struct FilesOptions {
    pairs: Vec<(PathBuf, PathBuf)>,
    pub dry_run: bool,
    pub workers: usize,
}

impl FilesOptions {
    /// Resolve `input` (a PDF file or a directory) and the optional `output`
    /// against the working directory.
    pub fn new(input: &str, output: Option<&str>, dry_run: bool, workers: usize) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let input = cwd.join(input);

        if !input.exists() {
            return Err(WatermarkError::NotFound(input));
        }
        let output_is_pdf = output.map(|o| is_pdf(Path::new(o)));
        if input.is_dir() {
            if output_is_pdf == Some(true) {
                return Err(WatermarkError::config(
                    "output must be a directory when input is a directory",
                ));
            }
        } else if input.is_file() && is_pdf(&input) {
            if output_is_pdf == Some(false) {
                return Err(WatermarkError::config(
                    "output must be a pdf file when input is a pdf file",
                ));
            }
        } else {
            return Err(WatermarkError::config("input must be a pdf file or a directory"));
        }

        let output = output.map(|o| cwd.join(o)).unwrap_or_else(|| input.clone());
        let pairs = if input.is_dir() {
            discover(&input, &output)?
        } else {
            vec![(input, output)]
        };
        Self::from_pairs(pairs, dry_run, workers)
    }

    /// Use explicit input/output pairs. Inputs and outputs must each be unique.
    pub fn from_pairs(pairs: Vec<(PathBuf, PathBuf)>, dry_run: bool, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(WatermarkError::config("workers must be at least 1"));
        }
        let inputs: HashSet<&PathBuf> = pairs.iter().map(|(i, _)| i).collect();
        if inputs.len() != pairs.len() {
            return Err(WatermarkError::config("input files must be unique"));
        }
        let outputs: HashSet<&PathBuf> = pairs.iter().map(|(_, o)| o).collect();
        if outputs.len() != pairs.len() {
            return Err(WatermarkError::config("output files must be unique"));
        }
        Ok(Self {
            pairs,
            dry_run,
            workers,
        })
    }

    pub fn pairs(&self) -> &[(PathBuf, PathBuf)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Every PDF below `input_dir`, paired with the same relative path under
/// `output_dir`.
fn discover(input_dir: &Path, output_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let root = input_dir
        .to_str()
        .ok_or_else(|| WatermarkError::config("input directory is not valid UTF-8"))?;
    let pattern = format!("{}/**/*.pdf", Pattern::escape(root));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut pairs = Vec::new();
    let entries = glob_with(&pattern, options)
        .map_err(|e| WatermarkError::config(format!("invalid input directory: {e}")))?;
    for path in entries.filter_map(|e| e.ok()).filter(|p| p.is_file()) {
        let relative = path
            .strip_prefix(input_dir)
            .map_err(|_| WatermarkError::config("discovered file outside the input directory"))?;
        let target = output_dir.join(relative);
        pairs.push((path, target));
    }
    pairs.sort();
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"%PDF-1.5").unwrap();
    }

    fn abs(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_single_file_defaults_to_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.pdf");
        touch(&input);

        let files = FilesOptions::new(&abs(&input), None, false, 1).unwrap();
        assert_eq!(files.pairs(), &[(input.clone(), input)]);
    }

    #[test]
    fn test_directory_is_mirrored() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        touch(&input.join("a.pdf"));
        touch(&input.join("nested/b.PDF"));
        touch(&input.join("nested/deeper/c.pdf"));
        touch(&input.join("notes.txt"));
        let output = dir.path().join("out");

        let files = FilesOptions::new(&abs(&input), Some(&abs(&output)), true, 2).unwrap();
        let expected = vec![
            (input.join("a.pdf"), output.join("a.pdf")),
            (input.join("nested/b.PDF"), output.join("nested/b.PDF")),
            (input.join("nested/deeper/c.pdf"), output.join("nested/deeper/c.pdf")),
        ];
        assert_eq!(files.pairs(), expected.as_slice());
        assert!(files.dry_run);
        assert_eq!(files.workers, 2);
        // output directories are only created when a file is written
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilesOptions::new(&abs(&dir.path().join("nope.pdf")), None, false, 1).unwrap_err();
        assert!(matches!(err, WatermarkError::NotFound(_)));
    }

    #[test]
    fn test_directory_with_pdf_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilesOptions::new(&abs(dir.path()), Some("out.pdf"), false, 1).unwrap_err();
        assert!(matches!(err, WatermarkError::Configuration(_)));
    }

    #[test]
    fn test_pdf_with_directory_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.pdf");
        touch(&input);
        let err = FilesOptions::new(&abs(&input), Some("out"), false, 1).unwrap_err();
        assert!(matches!(err, WatermarkError::Configuration(_)));
    }

    #[test]
    fn test_non_pdf_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        fs::write(&input, b"text").unwrap();
        let err = FilesOptions::new(&abs(&input), None, false, 1).unwrap_err();
        assert!(matches!(err, WatermarkError::Configuration(_)));
    }

    #[test]
    fn test_outputs_must_be_unique() {
        let pairs = vec![
            (PathBuf::from("/a.pdf"), PathBuf::from("/out.pdf")),
            (PathBuf::from("/b.pdf"), PathBuf::from("/out.pdf")),
        ];
        let err = FilesOptions::from_pairs(pairs, false, 1).unwrap_err();
        assert_eq!(err.to_string(), "configuration error: output files must be unique");
    }

    #[test]
    fn test_workers_must_be_positive() {
        let pairs = vec![(PathBuf::from("/a.pdf"), PathBuf::from("/a.pdf"))];
        assert!(FilesOptions::from_pairs(pairs, false, 0).is_err());
    }
}
