//! PDF loading into page records

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::PageRecord;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Loads uploaded PDFs page by page.
///
/// Uploads are staged in a temporary file that is removed when loading
/// returns, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    /// Upper bound for the fallback extractor
    extraction_timeout: Duration,
    /// Where temporary upload files go (system default when unset)
    temp_dir: Option<PathBuf>,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl PdfLoader {
    /// Create a loader
    pub fn new(extraction_timeout: Duration) -> Self {
        Self {
            extraction_timeout,
            temp_dir: None,
        }
    }

    /// Stage temporary files in `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Load a PDF into ordered page records tagged with `source_name`
    pub fn load(&self, source_name: &str, data: &[u8]) -> Result<Vec<PageRecord>> {
        if !data.starts_with(PDF_SIGNATURE) {
            return Err(Error::parse(source_name, "not a PDF file"));
        }

        let staged = self.stage(data)?;
        let pages = self.load_staged(source_name, staged.path());
        // `staged` drops here and removes the file on every path
        drop(staged);

        let pages = pages?;
        tracing::debug!("Loaded '{}': {} pages with text", source_name, pages.len());
        Ok(pages)
    }

    fn stage(&self, data: &[u8]) -> Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vault-upload-").suffix(".pdf");

        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(data)?;
        file.flush()?;
        Ok(file)
    }

    fn load_staged(&self, source_name: &str, path: &Path) -> Result<Vec<PageRecord>> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::parse(source_name, format!("Failed to load PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(Error::parse(source_name, "PDF is encrypted"));
        }

        let mut pages = Vec::new();
        for page_number in doc.get_pages().into_keys() {
            match doc.extract_text(&[page_number]) {
                Ok(raw) => {
                    let text = normalize_pdf_text(&raw);
                    if !text.is_empty() {
                        pages.push(PageRecord::new(source_name, page_number, text));
                    }
                }
                Err(e) => {
                    tracing::debug!("No text on page {} of '{}': {}", page_number, source_name, e);
                }
            }
        }

        if pages.is_empty() {
            tracing::warn!("Page extraction found no text in '{}', trying fallback", source_name);
            pages = self.extract_fallback(source_name, path)?;
        }

        if pages.is_empty() {
            return Err(Error::parse(
                source_name,
                "No text content could be extracted (image-based or empty PDF?)",
            ));
        }

        Ok(pages)
    }

    /// Whole-document extraction with pdf-extract, bounded by a timeout since
    /// some fonts make it spin
    ///
    /// pdf-extract cannot be cancelled. On timeout the worker thread is
    /// abandoned: it keeps running until pdf-extract returns, possibly after
    /// the staged file is deleted, and its result is discarded.
    fn extract_fallback(&self, source_name: &str, path: &Path) -> Result<Vec<PageRecord>> {
        use std::sync::mpsc;
        use std::thread;

        let path = path.to_path_buf();
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("pdf-extract".to_string())
            .spawn(move || {
                let result = pdf_extract::extract_text(&path);
                // The receiver is gone if we were abandoned
                if tx.send(result).is_err() {
                    tracing::warn!("Abandoned extraction of {} finished late", path.display());
                }
            })
            .map_err(|e| Error::internal(format!("Failed to start extraction thread: {}", e)))?;

        let text = match rx.recv_timeout(self.extraction_timeout) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                return Err(Error::parse(source_name, format!("Text extraction failed: {}", e)))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction of '{}' timed out after {:?}; abandoning worker thread",
                    source_name,
                    self.extraction_timeout
                );
                return Err(Error::parse(source_name, "Text extraction timed out"));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(Error::parse(source_name, "Text extraction crashed"));
            }
        };

        Ok(text
            .split('\u{000C}')
            .map(normalize_pdf_text)
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .map(|(i, text)| PageRecord::new(source_name, i as u32 + 1, text))
            .collect())
    }
}

/// Map typographic glyphs to ASCII, drop NUL bytes, trim lines and drop
/// blank ones
pub(crate) fn normalize_pdf_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2212}' => cleaned.push('-'),
            '\u{2014}' | '\u{2015}' => cleaned.push_str("--"),
            '\u{2018}' | '\u{2019}' | '\u{201A}' => cleaned.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => cleaned.push('"'),
            '\u{2022}' => cleaned.push_str("* "),
            '\u{2026}' => cleaned.push_str("..."),
            '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2009}' => cleaned.push(' '),
            '\u{FB00}' => cleaned.push_str("ff"),
            '\u{FB01}' => cleaned.push_str("fi"),
            '\u{FB02}' => cleaned.push_str("fl"),
            '\u{FB03}' => cleaned.push_str("ffi"),
            '\u{FB04}' => cleaned.push_str("ffl"),
            c => cleaned.push(c),
        }
    }

    cleaned
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
