use crate::page_range::RangePolicy;
use crate::pdf::{PageSink, PdfDocument};
use crate::plan::{fs_exists, plan_merge_order, MergePlan, OutputPlan};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ensure_directory, report_dropped};

const MERGED_NAME: &str = "merged";

#[derive(Debug, Default, Clone)]
pub struct MergeOptions {
    /// 1-based input numbers in append order, e.g. "1 2 1"
    pub order: Option<String>,
    pub output: Option<PathBuf>,
    /// Defaults to the first input's directory
    pub output_dir: Option<PathBuf>,
    pub policy: RangePolicy,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub output_path: PathBuf,
    pub plan: MergePlan,
    pub page_count: usize,
}

pub fn merge<P: AsRef<Path>>(inputs: &[P], options: &MergeOptions) -> Result<MergeOutcome> {
    if inputs.is_empty() {
        bail!("No input files specified");
    }

    let plan = plan_merge_order(inputs.len(), options.order.as_deref(), options.policy)?;
    report_dropped(plan.skipped_tokens, plan.out_of_range, "merge order entry");
    if plan.is_empty() {
        bail!(
            "No input files selected by merge order '{}'",
            options.order.as_deref().unwrap_or_default()
        );
    }

    // Each input is opened once however often it is repeated
    let mut docs: HashMap<usize, PdfDocument> = HashMap::new();
    for &index in &plan.order {
        if !docs.contains_key(&index) {
            docs.insert(index, PdfDocument::open(&inputs[index])?);
        }
    }

    let mut sink = PageSink::new();
    for &index in &plan.order {
        let doc = &docs[&index];
        let all_pages: Vec<usize> = (0..doc.page_count()).collect();
        sink.append(&doc.doc, &all_pages)?;
    }
    let page_count = sink.page_count();
    let mut merged = sink.finish();

    let output_plan = match &options.output {
        Some(file) => OutputPlan::from_output_file(file, MERGED_NAME),
        None => {
            let directory = options
                .output_dir
                .clone()
                .or_else(|| inputs[0].as_ref().parent().map(Path::to_path_buf))
                .unwrap_or_default();
            OutputPlan::new(directory, MERGED_NAME)
        }
    };
    ensure_directory(&output_plan.directory)?;
    let output_path = output_plan.resolve(fs_exists);
    PdfDocument::save_new(&mut merged, &output_path)?;

    info!(
        path = %output_path.display(),
        inputs = plan.order.len(),
        pages = page_count,
        "wrote merged document"
    );

    Ok(MergeOutcome {
        output_path,
        plan,
        page_count,
    })
}

pub fn run<P: AsRef<Path>>(inputs: &[P], options: &MergeOptions) -> Result<()> {
    let outcome = merge(inputs, options)?;

    println!(
        "Merged {} file(s) ({} pages) into {}",
        outcome.plan.order.len(),
        outcome.page_count,
        outcome.output_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::write_pdf;
    use tempfile::tempdir;

    #[test]
    fn test_merge_in_list_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_pdf(&a, 2, &[]);
        write_pdf(&b, 3, &[]);

        let outcome = merge(&[&a, &b], &MergeOptions::default()).unwrap();
        assert_eq!(outcome.plan.order, vec![0, 1]);
        assert_eq!(outcome.page_count, 5);
        assert_eq!(outcome.output_path, dir.path().join("merged.pdf"));
        assert_eq!(PdfDocument::open(&outcome.output_path).unwrap().page_count(), 5);
    }

    #[test]
    fn test_merge_with_repeated_source() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_pdf(&a, 2, &[]);
        write_pdf(&b, 1, &[]);

        let options = MergeOptions {
            order: Some("1 2 1".to_string()),
            ..Default::default()
        };
        let outcome = merge(&[&a, &b], &options).unwrap();
        assert_eq!(outcome.plan.order, vec![0, 1, 0]);
        assert_eq!(outcome.page_count, 5);

        let second = merge(&[&a, &b], &options).unwrap();
        assert_eq!(second.output_path, dir.path().join("1_merged.pdf"));
    }

    #[test]
    fn test_merge_rejects_empty_plan() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        write_pdf(&a, 1, &[]);

        let options = MergeOptions {
            order: Some("5 x".to_string()),
            ..Default::default()
        };
        let err = merge(&[&a], &options).unwrap_err();
        assert!(err.to_string().contains("No input files selected"));
        assert!(!dir.path().join("merged.pdf").exists());
    }

    #[test]
    fn test_merge_without_inputs() {
        let inputs: [PathBuf; 0] = [];
        assert!(merge(&inputs, &MergeOptions::default()).is_err());
    }
}
