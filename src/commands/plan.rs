use crate::page_range::RangePolicy;
use crate::plan::fs_exists;
use anyhow::Result;
use std::path::{Path, PathBuf};

use super::extract::{output_plan, select, ExtractOptions};

/// What `extract` would do, without writing anything
#[derive(Debug, Clone)]
pub struct SelectionReport {
    pub page_count: usize,
    /// 1-based
    pub pages: Vec<usize>,
    pub skipped_terms: usize,
    pub out_of_range: usize,
    pub output_name: String,
    pub output_path: PathBuf,
}

pub fn report<P: AsRef<Path>>(input: P, pages: &str, policy: RangePolicy) -> Result<SelectionReport> {
    let selected = select(input, pages, policy)?;
    let options = ExtractOptions {
        pages: pages.to_string(),
        policy,
        ..Default::default()
    };
    let plan = output_plan(&selected, &options);

    Ok(SelectionReport {
        page_count: selected.doc.page_count(),
        pages: selected.selection.to_page_numbers(),
        skipped_terms: selected.selection.skipped_terms,
        out_of_range: selected.selection.out_of_range,
        output_name: plan.base_name.clone(),
        output_path: plan.resolve(fs_exists),
    })
}

pub fn run<P: AsRef<Path>>(input: P, pages: &str, policy: RangePolicy) -> Result<()> {
    let report = report(input, pages, policy)?;

    let listed: Vec<String> = report.pages.iter().map(|p| p.to_string()).collect();
    println!("Pages ({} of {}): {}", report.pages.len(), report.page_count, listed.join(", "));
    if report.skipped_terms > 0 {
        println!("Skipped terms: {}", report.skipped_terms);
    }
    if report.out_of_range > 0 {
        println!("Out of range: {}", report.out_of_range);
    }
    println!("Output: {}", report.output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{write_pdf, OutlineSpec};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_report_does_not_write() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_pdf(&source, 12, &[OutlineSpec::new("Chapter 2", 5)]);

        let report = report(&source, "6-9, x, 30", RangePolicy::Lenient).unwrap();
        assert_eq!(report.page_count, 12);
        assert_eq!(report.pages, vec![6, 7, 8, 9]);
        assert_eq!(report.skipped_terms, 1);
        assert_eq!(report.out_of_range, 1);
        assert_eq!(report.output_name, "Chapter_2");
        assert_eq!(report.output_path, dir.path().join("Chapter_2.pdf"));
        assert!(!report.output_path.exists());
    }
}
