use anyhow::{Context, Result};
use lopdf::{Document, Object};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::decode_text_string;
use super::outline::{extract_outline, OutlineItem};

pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        Ok(PdfDocument {
            doc,
            path: path.to_path_buf(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Bookmark tree with 0-based target pages; empty when the file has none
    pub fn outline(&self) -> Result<Vec<OutlineItem>> {
        extract_outline(&self.doc)
            .with_context(|| format!("Failed to read outline: {}", self.path.display()))
    }

    /// Get metadata from the document info dictionary
    pub fn get_info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        let dict = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(info_ref)) => self.doc.get_dictionary(*info_ref).ok(),
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };

        if let Some(dict) = dict {
            info.title = get_string_from_dict(dict, b"Title");
            info.author = get_string_from_dict(dict, b"Author");
            info.creator = get_string_from_dict(dict, b"Creator");
            info.producer = get_string_from_dict(dict, b"Producer");
            info.creation_date = get_string_from_dict(dict, b"CreationDate");
            info.mod_date = get_string_from_dict(dict, b"ModDate");
            info.subject = get_string_from_dict(dict, b"Subject");
            info.keywords = get_string_from_dict(dict, b"Keywords");
        }

        info.page_count = self.page_count();
        info
    }

    /// Save to a file that must not exist yet
    pub fn save_new<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer)
            .with_context(|| format!("Failed to save PDF: {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to save PDF: {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub page_count: usize,
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{write_pdf, OutlineSpec};
    use tempfile::tempdir;

    #[test]
    fn test_open_reports_pages_and_outline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        write_pdf(&path, 4, &[OutlineSpec::new("Start", 0)]);

        let doc = PdfDocument::open(&path).unwrap();
        assert_eq!(doc.page_count(), 4);
        assert_eq!(doc.get_info().page_count, 4);
        assert_eq!(doc.outline().unwrap(), vec![OutlineItem::leaf("Start", 0)]);
    }

    #[test]
    fn test_save_new_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taken.pdf");
        std::fs::write(&path, b"keep me").unwrap();

        let mut doc = crate::pdf::test_support::build_pdf(1, &[]);
        assert!(PdfDocument::save_new(&mut doc, &path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_open_missing_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let err = PdfDocument::open(&path).err().unwrap();
        assert!(format!("{}", err).contains("missing.pdf"));
    }
}
