use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagepick")]
#[command(about = "Pick pages out of PDFs by range, name the result after its bookmark")]
#[command(version)]
pub struct Cli {
    /// Log per-term parsing decisions (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server on stdin/stdout
    Mcp,

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Print bookmarks with their target pages
    #[command(alias = "toc")]
    Outline {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Show which pages a range selects and where extract would write them
    Plan {
        /// PDF file to select from
        path: PathBuf,

        /// Page ranges (e.g., "1-5, 8, 10-end")
        pages: String,

        /// Fail on malformed or out-of-range terms instead of skipping them
        #[arg(long)]
        strict: bool,
    },

    /// Extract page ranges to a new PDF
    #[command(alias = "cat")]
    Extract {
        /// PDF file to extract from
        path: PathBuf,

        /// Page ranges (e.g., "1-5, 8, 10-end")
        pages: String,

        /// Output file; a numbered name is used if it exists
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Directory for the bookmark-derived name [default: next to the input]
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Fail on malformed or out-of-range terms instead of skipping them
        #[arg(long)]
        strict: bool,
    },

    /// Combine PDFs into one, optionally in a custom order
    Merge {
        /// PDF files to merge
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 1-based input numbers in append order; repeats allowed (e.g., "1 2 1")
        #[arg(long)]
        order: Option<String>,

        /// Output file; a numbered name is used if it exists
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Directory for merged.pdf [default: next to the first input]
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Fail on malformed or out-of-range order entries instead of skipping them
        #[arg(long)]
        strict: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::parse_from(["pagepick", "extract", "in.pdf", "1-5, 8", "-d", "out", "--strict"]);
        match cli.command {
            Commands::Extract {
                path,
                pages,
                output,
                output_dir,
                strict,
            } => {
                assert_eq!(path, PathBuf::from("in.pdf"));
                assert_eq!(pages, "1-5, 8");
                assert_eq!(output, None);
                assert_eq!(output_dir, Some(PathBuf::from("out")));
                assert!(strict);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_parse_merge_order() {
        let cli = Cli::parse_from(["pagepick", "-v", "merge", "a.pdf", "b.pdf", "--order", "1 2 1"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Merge { inputs, order, .. } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(order.as_deref(), Some("1 2 1"));
            }
            _ => panic!("expected merge"),
        }
    }

    #[test]
    fn test_output_and_output_dir_conflict() {
        let result = Cli::try_parse_from([
            "pagepick", "extract", "in.pdf", "1", "-o", "x.pdf", "-d", "out",
        ]);
        assert!(result.is_err());
    }
}
