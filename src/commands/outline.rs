use crate::pdf::outline::flatten_outline;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let doc = PdfDocument::open(&path)?;
    let outline = doc.outline()?;
    let leaves = flatten_outline(&outline);

    if leaves.is_empty() {
        println!("No bookmarks found.");
        return Ok(());
    }

    for leaf in leaves {
        let indent = "  ".repeat(leaf.level);
        println!("{}{} (p. {})", indent, leaf.title, leaf.target_page + 1);
    }

    Ok(())
}
