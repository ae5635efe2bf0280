use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pdf::outline::{flatten_outline, OutlineItem};

pub const PDF_EXTENSION: &str = "pdf";

const UNSAFE_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Make `name` usable as a single path component on every platform we write to.
///
/// Removes `\ / * ? : " < > |` and control characters, trims the ends, then
/// turns the remaining spaces into underscores.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !UNSAFE_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// "<stem>_extracted", used when no bookmark names the selection
pub fn fallback_base_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| sanitize_file_name(&s.to_string_lossy()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("{}_extracted", stem)
}

/// Base name (no extension) for pages extracted from a document.
///
/// Prefers the title of the first bookmark pointing at the first selected
/// page, falling back to `fallback`.
pub fn choose_output_name(outline: &[OutlineItem], selection: &[usize], fallback: &str) -> String {
    let Some(&first) = selection.first() else {
        return fallback.to_string();
    };

    let title = flatten_outline(outline)
        .into_iter()
        .find(|leaf| leaf.target_page == first)
        .map(|leaf| sanitize_file_name(leaf.title))
        .filter(|name| !name.is_empty());

    match title {
        Some(name) => {
            debug!(page = first + 1, name = %name, "naming output after bookmark");
            name
        }
        None => fallback.to_string(),
    }
}

/// First path of `{dir}/{base}.{ext}`, `{dir}/1_{base}.{ext}`,
/// `{dir}/2_{base}.{ext}`, … for which `exists` is false.
pub fn resolve_collision<F>(directory: &Path, base_name: &str, extension: &str, exists: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let candidate = directory.join(format!("{}.{}", base_name, extension));
    if !exists(&candidate) {
        return candidate;
    }

    let mut n: u64 = 1;
    loop {
        let candidate = directory.join(format!("{}_{}.{}", n, base_name, extension));
        if !exists(&candidate) {
            debug!(path = %candidate.display(), "output name taken, using numbered name");
            return candidate;
        }
        n += 1;
    }
}

/// Read-only existence probe against the real filesystem
pub fn fs_exists(path: &Path) -> bool {
    path.exists()
}

/// Where a result should go, before anything touches the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub directory: PathBuf,
    pub base_name: String,
}

impl OutputPlan {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        OutputPlan {
            directory: directory.into(),
            base_name: base_name.into(),
        }
    }

    /// Plan from an explicit output file: its parent becomes the directory
    /// and its sanitized stem the base name.
    pub fn from_output_file(path: &Path, default_name: &str) -> Self {
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let base_name = path
            .file_stem()
            .map(|s| sanitize_file_name(&s.to_string_lossy()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_name.to_string());
        OutputPlan::new(directory, base_name)
    }

    pub fn resolve<F>(&self, exists: F) -> PathBuf
    where
        F: Fn(&Path) -> bool,
    {
        resolve_collision(&self.directory, &self.base_name, PDF_EXTENSION, exists)
    }
}
