//! Overlapping, boundary-aware text chunking with page tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{DocumentChunk, PageRecord};

/// Separator placed between the pages of one document
const PAGE_SEPARATOR: &str = "\n\n";

/// Sliding-window chunker.
///
/// Each document's pages are concatenated and cut into windows of at most
/// `chunk_size` characters. A window prefers to end on a paragraph break,
/// then a sentence break, then whitespace, as long as the break lies in the
/// last stretch of the window; the next window starts `overlap` characters
/// before the previous one ended.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

/// One document's text with char-indexed boundary candidates
struct DocumentText<'a> {
    source_name: &'a str,
    text: String,
    /// Byte offset of every char, plus the total length at the end
    char_offsets: Vec<usize>,
    /// (start char, page number) for each page
    page_starts: Vec<(usize, u32)>,
    paragraph_breaks: Vec<usize>,
    sentence_breaks: Vec<usize>,
    word_breaks: Vec<usize>,
}

impl TextChunker {
    /// Create a chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Target chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk ordered page records; consecutive pages with the same source
    /// form one document
    pub fn chunk(&self, pages: &[PageRecord]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < pages.len() {
            let source = &pages[start].source_name;
            let end = pages[start..]
                .iter()
                .position(|p| &p.source_name != source)
                .map_or(pages.len(), |n| start + n);

            let doc = DocumentText::new(&pages[start..end]);
            chunks.extend(self.chunk_document(&doc));
            start = end;
        }

        chunks
    }

    fn chunk_document(&self, doc: &DocumentText<'_>) -> Vec<DocumentChunk> {
        let total = doc.char_len();
        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;
        let mut start = 0usize;

        // Breaks must leave the next window starting after this one
        let min_advance = (self.chunk_size - self.overlap).max(self.overlap + 1);

        while start < total {
            let is_last = total - start <= self.chunk_size;
            let end = if is_last {
                total
            } else {
                let lo = start + min_advance;
                let hi = start + self.chunk_size;
                last_in_range(&doc.paragraph_breaks, lo, hi)
                    .or_else(|| last_in_range(&doc.sentence_breaks, lo, hi))
                    .or_else(|| last_in_range(&doc.word_breaks, lo, hi))
                    .unwrap_or(hi)
            };

            let text = doc.slice(start, end);
            if !text.trim().is_empty() {
                chunks.push(DocumentChunk::new(
                    text,
                    doc.source_name,
                    doc.page_at(start),
                    chunk_index,
                ));
                chunk_index += 1;
            }

            if is_last {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

impl<'a> DocumentText<'a> {
    fn new(pages: &'a [PageRecord]) -> Self {
        let mut text = String::new();
        let mut page_starts = Vec::with_capacity(pages.len());
        let mut chars_so_far = 0usize;

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                text.push_str(PAGE_SEPARATOR);
                chars_so_far += PAGE_SEPARATOR.chars().count();
            }
            page_starts.push((chars_so_far, page.page_number));
            text.push_str(&page.text);
            chars_so_far += page.text.chars().count();
        }

        let mut char_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        char_offsets.push(text.len());

        let to_char = |byte: usize| char_offsets.partition_point(|&b| b < byte);

        let paragraph_breaks = text
            .match_indices("\n\n")
            .map(|(i, sep)| to_char(i + sep.len()))
            .collect();

        let sentence_breaks = text
            .split_sentence_bound_indices()
            .skip(1)
            .map(|(i, _)| to_char(i))
            .collect();

        let word_breaks = text
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .map(|(i, c)| to_char(i + c.len_utf8()))
            .collect();

        Self {
            source_name: pages.first().map_or("", |p| p.source_name.as_str()),
            text,
            char_offsets,
            page_starts,
            paragraph_breaks,
            sentence_breaks,
            word_breaks,
        }
    }

    fn char_len(&self) -> usize {
        self.char_offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[self.char_offsets[start]..self.char_offsets[end]]
    }

    /// Page containing the given char position
    fn page_at(&self, pos: usize) -> u32 {
        let idx = self.page_starts.partition_point(|&(start, _)| start <= pos);
        self.page_starts[idx.saturating_sub(1)].1
    }
}

/// Largest sorted value within `[lo, hi]`
fn last_in_range(sorted: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let idx = sorted.partition_point(|&v| v <= hi);
    match idx.checked_sub(1).map(|i| sorted[i]) {
        Some(v) if v >= lo => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(source: &str, number: u32, text: &str) -> PageRecord {
        PageRecord::new(source, number, text)
    }

    fn long_text() -> String {
        (1..=40)
            .map(|i| format!("Sentence number {} talks about the handbook.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&[page("a.pdf", 1, "The refund policy is 30 days.")]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), "The refund policy is 30 days.");
        assert_eq!(chunks[0].source_name(), "a.pdf");
        assert_eq!(chunks[0].page_number(), 1);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = TextChunker::new(120, 30).unwrap();
        let pages = vec![page("a.pdf", 1, &long_text()), page("a.pdf", 2, &long_text())];

        assert_eq!(chunker.chunk(&pages), chunker.chunk(&pages));
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let chunker = TextChunker::new(120, 30).unwrap();
        let chunks = chunker.chunk(&[page("a.pdf", 1, &long_text())]);
        assert!(chunks.len() > 3);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text().chars().collect();
            let next: String = pair[1].text().chars().take(30).collect();
            let tail: String = prev[prev.len() - 30..].iter().collect();
            assert_eq!(tail, next);
        }
    }

    #[test]
    fn test_chunks_respect_size_and_are_never_empty() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let chunks = chunker.chunk(&[page("a.pdf", 1, &long_text())]);

        for chunk in &chunks {
            assert!(chunk.char_len() <= 100);
            assert!(!chunk.text().trim().is_empty());
        }
    }

    #[test]
    fn test_trailing_text_becomes_smaller_final_chunk() {
        let chunker = TextChunker::new(10, 2).unwrap();
        // No whitespace: windows advance by exactly size - overlap
        let chunks = chunker.chunk(&[page("a.pdf", 1, "abcdefghijklmnopqrstu")]);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text()).collect();

        assert_eq!(texts, vec!["abcdefghij", "ijklmnopqr", "qrstu"]);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let chunker = TextChunker::new(40, 10).unwrap();
        let text = "First paragraph is right here.\n\nSecond paragraph follows on.";
        let chunks = chunker.chunk(&[page("a.pdf", 1, text)]);

        assert_eq!(chunks[0].text(), "First paragraph is right here.\n\n");
    }

    #[test]
    fn test_documents_are_chunked_separately() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&[
            page("a.pdf", 1, "Alpha page one."),
            page("a.pdf", 2, "Alpha page two."),
            page("b.pdf", 1, "Beta page one."),
        ]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source_name(), "a.pdf");
        assert_eq!(chunks[0].text(), "Alpha page one.\n\nAlpha page two.");
        assert_eq!(chunks[1].source_name(), "b.pdf");
        assert_eq!(chunks[1].chunk_index(), 0);
    }

    #[test]
    fn test_chunks_carry_starting_page() {
        let chunker = TextChunker::new(60, 10).unwrap();
        let chunks = chunker.chunk(&[
            page("a.pdf", 1, &"one ".repeat(20)),
            page("a.pdf", 2, &"two ".repeat(20)),
        ]);

        assert_eq!(chunks.first().unwrap().page_number(), 1);
        assert_eq!(chunks.last().unwrap().page_number(), 2);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let chunker = TextChunker::new(7, 2).unwrap();
        let chunks = chunker.chunk(&[page("a.pdf", 1, "ééééééééééééééé")]);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.char_len() <= 7));
    }
}
