use crate::page_range::{parse_page_ranges, PageSelection, RangePolicy};
use crate::pdf::outline::OutlineItem;
use crate::pdf::{PageSink, PdfDocument};
use crate::plan::{choose_output_name, fallback_base_name, fs_exists, OutputPlan};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{ensure_directory, report_dropped};

#[derive(Debug, Default, Clone)]
pub struct ExtractOptions {
    /// Page range expression, e.g. "1-5,8,10-end"
    pub pages: String,
    /// Explicit output file; its stem replaces the bookmark-derived name
    pub output: Option<PathBuf>,
    /// Directory for the derived name; defaults to the source's directory
    pub output_dir: Option<PathBuf>,
    pub policy: RangePolicy,
}

/// A parsed selection together with the document it was parsed against
pub struct Selected {
    pub doc: PdfDocument,
    pub selection: PageSelection,
    pub outline: Vec<OutlineItem>,
}

#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub output_path: PathBuf,
    pub selection: PageSelection,
}

/// Open `input` and parse `pages` against it, refusing empty selections
pub fn select<P: AsRef<Path>>(input: P, pages: &str, policy: RangePolicy) -> Result<Selected> {
    let input = input.as_ref();
    let doc = PdfDocument::open(input)?;
    let total_pages = doc.page_count();

    let selection = parse_page_ranges(pages, total_pages, policy)?;
    report_dropped(selection.skipped_terms, selection.out_of_range, "page range term");

    if selection.is_empty() {
        bail!(
            "No pages selected by '{}' ({} has {} page(s))",
            pages,
            input.display(),
            total_pages
        );
    }

    // The outline only feeds the output name, so a broken one is not fatal
    let outline = doc.outline().unwrap_or_else(|e| {
        warn!("ignoring unreadable outline: {:#}", e);
        Vec::new()
    });

    Ok(Selected {
        doc,
        selection,
        outline,
    })
}

/// Where the extracted pages of `selected` would be written
pub fn output_plan(selected: &Selected, options: &ExtractOptions) -> OutputPlan {
    let source = selected.doc.path.as_path();
    let fallback = fallback_base_name(source);

    match &options.output {
        Some(file) => OutputPlan::from_output_file(file, &fallback),
        None => {
            let directory = options
                .output_dir
                .clone()
                .or_else(|| source.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            let base_name =
                choose_output_name(&selected.outline, &selected.selection.pages, &fallback);
            OutputPlan::new(directory, base_name)
        }
    }
}

pub fn extract<P: AsRef<Path>>(input: P, options: &ExtractOptions) -> Result<ExtractOutcome> {
    let selected = select(input, &options.pages, options.policy)?;

    let mut sink = PageSink::new();
    sink.append(&selected.doc.doc, &selected.selection.pages)?;
    let mut new_doc = sink.finish();

    let plan = output_plan(&selected, options);
    ensure_directory(&plan.directory)?;
    let output_path = plan.resolve(fs_exists);
    PdfDocument::save_new(&mut new_doc, &output_path)?;

    info!(
        path = %output_path.display(),
        pages = selected.selection.len(),
        "wrote extracted pages"
    );

    Ok(ExtractOutcome {
        output_path,
        selection: selected.selection,
    })
}

pub fn run<P: AsRef<Path>>(input: P, options: &ExtractOptions) -> Result<()> {
    let outcome = extract(input, options)?;

    println!(
        "Extracted {} page(s) to {}",
        outcome.selection.len(),
        outcome.output_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{write_pdf, OutlineSpec};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn options(pages: &str) -> ExtractOptions {
        ExtractOptions {
            pages: pages.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_named_after_bookmark() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_pdf(
            &source,
            12,
            &[
                OutlineSpec::new("Chapter 1", 0),
                OutlineSpec::new("Chapter 2", 5),
            ],
        );

        let first = extract(&source, &options("6-9")).unwrap();
        assert_eq!(first.selection.pages, vec![5, 6, 7, 8]);
        assert_eq!(first.output_path, dir.path().join("Chapter_2.pdf"));
        assert_eq!(PdfDocument::open(&first.output_path).unwrap().page_count(), 4);

        let second = extract(&source, &options("6-9")).unwrap();
        assert_eq!(second.output_path, dir.path().join("1_Chapter_2.pdf"));
        assert!(first.output_path.exists());
    }

    #[test]
    fn test_extract_falls_back_to_source_name() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("scan 01.pdf");
        write_pdf(&source, 5, &[OutlineSpec::new("Cover", 0)]);

        let outcome = extract(&source, &options("2, 4, 2")).unwrap();
        assert_eq!(outcome.output_path, dir.path().join("scan_01_extracted.pdf"));
        assert_eq!(PdfDocument::open(&outcome.output_path).unwrap().page_count(), 3);
    }

    #[test]
    fn test_extract_to_explicit_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        write_pdf(&source, 3, &[]);
        let target = dir.path().join("nested").join("picked.pdf");

        let opts = ExtractOptions {
            output: Some(target.clone()),
            ..options("1-end")
        };
        let outcome = extract(&source, &opts).unwrap();
        assert_eq!(outcome.output_path, target);

        let again = extract(&source, &opts).unwrap();
        assert_eq!(again.output_path, dir.path().join("nested").join("1_picked.pdf"));
    }

    #[test]
    fn test_extract_into_output_dir() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        write_pdf(&source, 3, &[]);
        let out_dir = dir.path().join("out");

        let opts = ExtractOptions {
            output_dir: Some(out_dir.clone()),
            ..options("3")
        };
        let outcome = extract(&source, &opts).unwrap();
        assert_eq!(outcome.output_path, out_dir.join("in_extracted.pdf"));
    }

    #[test]
    fn test_empty_selection_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        write_pdf(&source, 3, &[]);

        let err = extract(&source, &options("abc, 7-9")).unwrap_err();
        assert!(err.to_string().contains("No pages selected"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_strict_policy_surfaces_parse_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        write_pdf(&source, 3, &[]);

        let opts = ExtractOptions {
            policy: RangePolicy::Strict,
            ..options("1,5")
        };
        let err = extract(&source, &opts).unwrap_err();
        assert!(err.to_string().contains("outside the document"));
    }
}
