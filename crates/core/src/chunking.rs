use crate::extractor::PageText;
use crate::models::{Chunk, ChunkConfig};
use tracing::debug;

const PARAGRAPH_BREAK: [char; 2] = ['\n', '\n'];
const SENTENCE_BREAK: [char; 2] = ['.', ' '];

/// How page text is cut into chunks. Both strategies work page by page,
/// keep char offsets into the raw page text, and share the overlap rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkerStrategy {
    /// Cuts at the budget limit, pulled back to a paragraph or sentence
    /// break when one sits in the second half of the window.
    PageAware(ChunkConfig),
    /// Cuts at the budget limit only.
    FixedWindow(ChunkConfig),
}

impl Default for ChunkerStrategy {
    fn default() -> Self {
        Self::PageAware(ChunkConfig::default())
    }
}

impl ChunkerStrategy {
    pub fn chunk_page(&self, page: &PageText) -> Vec<Chunk> {
        match self {
            Self::PageAware(config) => split_page(page, *config, true),
            Self::FixedWindow(config) => split_page(page, *config, false),
        }
    }

    pub fn chunk_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = pages.iter().flat_map(|page| self.chunk_page(page)).collect();
        debug!(pages = pages.len(), chunks = chunks.len(), "chunked document");
        chunks
    }
}

fn split_page(page: &PageText, config: ChunkConfig, snap_to_boundaries: bool) -> Vec<Chunk> {
    if page.text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = page.text.chars().collect();
    let len = chars.len();
    let size = config.chunk_size();
    let overlap = config.effective_overlap();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + size).min(len);
        if snap_to_boundaries && end < len {
            end = boundary_before(&chars, start, end, size);
        }

        let piece: String = chars[start..end].iter().collect();
        let text = piece.trim();
        if !text.is_empty() {
            chunks.push(Chunk::new(text, page.number, start, end));
        }

        if end == len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Picks the cut point for a non-final window `[start, end)`: just after the
/// last paragraph break, else just after the last sentence-ending period,
/// provided the break lies past the window's midpoint.
fn boundary_before(chars: &[char], start: usize, end: usize, size: usize) -> usize {
    let midpoint = start + size / 2;

    if let Some(at) = rfind(chars, start, end, &PARAGRAPH_BREAK) {
        if at > midpoint {
            return at + PARAGRAPH_BREAK.len();
        }
    }

    if let Some(at) = rfind(chars, start, end, &SENTENCE_BREAK) {
        if at > midpoint {
            return at + 1;
        }
    }

    end
}

fn rfind(chars: &[char], start: usize, end: usize, pattern: &[char]) -> Option<usize> {
    chars[start..end]
        .windows(pattern.len())
        .rposition(|window| window == pattern)
        .map(|offset| start + offset)
}
