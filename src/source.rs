use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, ObjectId};
use tracing::{info, warn};

use crate::error::ExtractError;

/// Form feed, the page separator `pdftotext` writes into text dumps.
pub const PAGE_BREAK: char = '\x0c';

/// An ordered, 1-indexed sequence of pages, each with or without text.
pub trait PageTextSource {
    fn page_count(&self) -> u32;

    /// Text of page `page` (1-based). `None` when the page carries no
    /// extractable text or is out of range.
    fn page_text(&self, page: u32) -> Option<String>;
}

/// Plain-text dump with pages separated by form feeds.
#[derive(Debug, Clone)]
pub struct TextDumpSource {
    pages: Vec<String>,
}

impl TextDumpSource {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractError::open(path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| ExtractError::open(path, e))?;
        Ok(Self::from_text(&text))
    }

    /// Every page ends with a form feed in `pdftotext` output, including the
    /// last one, so a single trailing break does not open another page.
    pub fn from_text(text: &str) -> Self {
        let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
        TextDumpSource {
            pages: text.split(PAGE_BREAK).map(str::to_string).collect(),
        }
    }

    #[cfg(test)]
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TextDumpSource {
            pages: pages.into_iter().map(Into::into).collect(),
        }
    }
}

impl PageTextSource for TextDumpSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Option<String> {
        let idx = usize::try_from(page).ok()?.checked_sub(1)?;
        self.pages
            .get(idx)
            .filter(|t| !t.trim().is_empty())
            .cloned()
    }
}

/// PDF document read through lopdf's text extraction.
pub struct PdfSource {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfSource {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let doc = Document::load(path).map_err(|e| ExtractError::open(path, e))?;
        let pages = doc.get_pages();
        info!(path = %path.display(), pages = pages.len(), "opened pdf");
        Ok(PdfSource { doc, pages })
    }
}

impl PageTextSource for PdfSource {
    fn page_count(&self) -> u32 {
        self.pages.keys().next_back().copied().unwrap_or(0)
    }

    fn page_text(&self, page: u32) -> Option<String> {
        if !self.pages.contains_key(&page) {
            return None;
        }
        match self.doc.extract_text(&[page]) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!(page, error = %e, "text extraction failed, page treated as empty");
                None
            }
        }
    }
}

/// Open `path` with the source matching its extension.
pub fn open_document(path: &Path) -> Result<Box<dyn PageTextSource>, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => Ok(Box::new(PdfSource::open(path)?)),
        "txt" => Ok(Box::new(TextDumpSource::open(path)?)),
        _ => Err(ExtractError::UnsupportedFormat(path.display().to_string())),
    }
}
