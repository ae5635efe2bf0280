//! Decisions made before any output is written: which inputs go in, in
//! what order, and under which file name.

pub mod merge;
pub mod output;

pub use merge::{plan_merge_order, MergePlan};
pub use output::{choose_output_name, fallback_base_name, fs_exists, OutputPlan};
