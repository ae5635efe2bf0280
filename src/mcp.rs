use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::commands::extract::{extract, ExtractOptions};
use crate::commands::merge::{merge, MergeOptions};
use crate::commands::plan::report;
use crate::page_range::RangePolicy;
use crate::pdf::outline::flatten_outline;
use crate::pdf::PdfDocument;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSelectRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Page ranges (e.g., '1-5, 8, 10-end')")]
    pub pages: String,
    #[schemars(description = "Reject malformed or out-of-range terms instead of skipping them (default: false)")]
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfExtractRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Page ranges (e.g., '1-5, 8, 10-end')")]
    pub pages: String,
    #[schemars(description = "Output file path; a numbered name is used if it exists. Omit to name the file after the bookmark of the first selected page.")]
    #[serde(default)]
    pub output: Option<String>,
    #[schemars(description = "Directory for the derived name (default: next to the source)")]
    #[serde(default)]
    pub output_dir: Option<String>,
    #[schemars(description = "Reject malformed or out-of-range terms instead of skipping them (default: false)")]
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMergeRequest {
    #[schemars(description = "Paths of the PDF files to merge")]
    pub inputs: Vec<String>,
    #[schemars(description = "1-based input numbers in append order, repeats allowed (e.g., '1 2 1'). Omit to use list order.")]
    #[serde(default)]
    pub order: Option<String>,
    #[schemars(description = "Output file path; a numbered name is used if it exists")]
    #[serde(default)]
    pub output: Option<String>,
    #[schemars(description = "Directory for merged.pdf (default: next to the first input)")]
    #[serde(default)]
    pub output_dir: Option<String>,
    #[schemars(description = "Reject malformed or out-of-range order entries instead of skipping them (default: false)")]
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct PdfServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl PdfServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for PdfServer {
    fn default() -> Self {
        Self::new()
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Get PDF metadata including title, author, creator, producer, creation date, and page count")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        match PdfDocument::open(&path) {
            Ok(doc) => {
                let info = doc.get_info();
                to_json(&PdfInfoResult {
                    path,
                    page_count: info.page_count,
                    title: info.title,
                    author: info.author,
                    creator: info.creator,
                    producer: info.producer,
                    creation_date: info.creation_date,
                    subject: info.subject,
                    keywords: info.keywords,
                })
            }
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Get the bookmarks (outline) of a PDF with their 1-based target pages")]
    fn pdf_outline(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        let outline = match PdfDocument::open(&path).and_then(|doc| doc.outline()) {
            Ok(outline) => outline,
            Err(e) => return format!("Error: {:#}", e),
        };

        let result: Vec<OutlineEntryResult> = flatten_outline(&outline)
            .into_iter()
            .map(|leaf| OutlineEntryResult {
                title: leaf.title.to_string(),
                page: leaf.target_page + 1,
                level: leaf.level,
            })
            .collect();
        to_json(&result)
    }

    #[tool(description = "Resolve a page range like '1-5, 8, 10-end' against a PDF without writing anything. Returns the selected 1-based pages, how many terms were skipped or out of range, and the file extraction would write.")]
    fn pdf_select(&self, Parameters(req): Parameters<PdfSelectRequest>) -> String {
        match report(&req.path, &req.pages, RangePolicy::from_strict(req.strict)) {
            Ok(report) => to_json(&SelectResult {
                page_count: report.page_count,
                pages: report.pages,
                skipped_terms: report.skipped_terms,
                out_of_range: report.out_of_range,
                output_name: report.output_name,
                output_path: report.output_path.display().to_string(),
            }),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Extract pages from a PDF into a new file, in the order given (pages may repeat). Never overwrites an existing file.")]
    fn pdf_extract(&self, Parameters(req): Parameters<PdfExtractRequest>) -> String {
        let options = ExtractOptions {
            pages: req.pages,
            output: req.output.map(PathBuf::from),
            output_dir: req.output_dir.map(PathBuf::from),
            policy: RangePolicy::from_strict(req.strict),
        };

        match extract(&req.path, &options) {
            Ok(outcome) => to_json(&ExtractResult {
                output_path: outcome.output_path.display().to_string(),
                page_count: outcome.selection.len(),
                pages: outcome.selection.to_page_numbers(),
                skipped_terms: outcome.selection.skipped_terms,
                out_of_range: outcome.selection.out_of_range,
            }),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Merge PDFs into one file, optionally in a custom order that may repeat inputs. Never overwrites an existing file.")]
    fn pdf_merge(&self, Parameters(req): Parameters<PdfMergeRequest>) -> String {
        let options = MergeOptions {
            order: req.order,
            output: req.output.map(PathBuf::from),
            output_dir: req.output_dir.map(PathBuf::from),
            policy: RangePolicy::from_strict(req.strict),
        };

        match merge(&req.inputs, &options) {
            Ok(outcome) => to_json(&MergeResult {
                output_path: outcome.output_path.display().to_string(),
                page_count: outcome.page_count,
                order: outcome.plan.order.iter().map(|i| i + 1).collect(),
                skipped_entries: outcome.plan.skipped_tokens,
                out_of_range: outcome.plan.out_of_range,
            }),
            Err(e) => format!("Error: {:#}", e),
        }
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PdfInfoResult {
    pub path: String,
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OutlineEntryResult {
    pub title: String,
    pub page: usize,
    pub level: usize,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SelectResult {
    pub page_count: usize,
    pub pages: Vec<usize>,
    pub skipped_terms: usize,
    pub out_of_range: usize,
    pub output_name: String,
    pub output_path: String,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExtractResult {
    pub output_path: String,
    pub page_count: usize,
    pub pages: Vec<usize>,
    pub skipped_terms: usize,
    pub out_of_range: usize,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MergeResult {
    pub output_path: String,
    pub page_count: usize,
    pub order: Vec<usize>,
    pub skipped_entries: usize,
    pub out_of_range: usize,
}

impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF page selection tools. Use pdf_info for metadata, pdf_outline for bookmarks, \
                 pdf_select to check what a page range like '1-5, 8, 10-end' selects, pdf_extract \
                 to write the selected pages to a new PDF named after their bookmark, and \
                 pdf_merge to combine PDFs in a custom order."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server() -> Result<()> {
    let server = PdfServer::new();
    info!("serving MCP tools on stdio");

    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{write_pdf, OutlineSpec};
    use tempfile::tempdir;

    #[test]
    fn test_select_tool_reports_json() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_pdf(&source, 12, &[OutlineSpec::new("Chapter 2", 5)]);

        let server = PdfServer::new();
        let out = server.pdf_select(Parameters(PdfSelectRequest {
            path: source.display().to_string(),
            pages: "6-9".to_string(),
            strict: false,
        }));
        let result: SelectResult = serde_json::from_str(&out).unwrap();
        assert_eq!(result.pages, vec![6, 7, 8, 9]);
        assert_eq!(result.output_name, "Chapter_2");
    }

    #[test]
    fn test_extract_tool_reports_errors_as_text() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_pdf(&source, 2, &[]);

        let server = PdfServer::new();
        let out = server.pdf_extract(Parameters(PdfExtractRequest {
            path: source.display().to_string(),
            pages: "9".to_string(),
            output: None,
            output_dir: None,
            strict: false,
        }));
        assert!(out.starts_with("Error: No pages selected"));
    }
}
