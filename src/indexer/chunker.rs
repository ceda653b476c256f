use crate::error::{Error, Result};

/// Splits document text into overlapping chunks of at most `chunk_size`
/// characters (counted as `char`s, not bytes).
///
/// Every chunk is a contiguous slice of the trimmed input. Chunk `i + 1`
/// starts exactly `overlap` characters before chunk `i` ends, so stitching
/// `chunks[0]` with `chunks[i][overlap..]` for the rest reproduces the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

/// Cut preferences, strongest first.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl TextChunker {
    /// Requires `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidArgument(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks. Blank input yields no chunks.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let hi = start + self.chunk_size;
            // Never cut so early that the next chunk would not advance, and
            // avoid tiny chunks when a natural break sits near the start.
            let lo = start + (self.overlap + 1).max(self.chunk_size / 2);
            let end = find_cut(&chars, lo, hi).unwrap_or(hi);

            chunks.push(chars[start..end].iter().collect());
            start = end - self.overlap;
        }

        chunks
    }
}

/// Latest cut position in `lo..=hi` for the strongest boundary kind present.
fn find_cut(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    BOUNDARIES
        .iter()
        .find_map(|&kind| (lo..=hi).rev().find(|&end| is_cut(chars, end, kind)))
}

/// Whether a chunk may end just before `chars[end]`.
fn is_cut(chars: &[char], end: usize, kind: Boundary) -> bool {
    if end < 2 || end > chars.len() {
        return false;
    }
    let prev = chars[end - 1];
    let before = chars[end - 2];
    match kind {
        Boundary::Paragraph => prev == '\n' && before == '\n',
        Boundary::Line => prev == '\n',
        Boundary::Sentence => {
            (prev.is_whitespace() && matches!(before, '.' | '!' | '?'))
                || matches!(prev, '。' | '！' | '？')
        }
        Boundary::Word => prev.is_whitespace(),
    }
}

/// Convenience wrapper around [`TextChunker::split`].
pub fn split_into_chunks(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(TextChunker::new(chunk_size, overlap)?.split(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    fn sample_text() -> String {
        let para = "Photosynthesis converts light energy into chemical energy. \
                    Chlorophyll absorbs mostly blue and red light! Why are leaves green? "
            .repeat(6);
        vec![para; 5].join("\n\n")
    }

    #[test]
    fn test_split_short_text() {
        let content = "Paragraph 1\n\nParagraph 2\n\nParagraph 3";
        let chunks = split_into_chunks(content, 500, 80).unwrap();
        assert_eq!(chunks, vec![content.to_string()]);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_into_chunks("", 500, 80).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_only() {
        assert!(
            split_into_chunks("   \n\n   \n\n   ", 500, 80)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_chunks_respect_max_length() {
        let text = sample_text();
        let chunks = split_into_chunks(&text, 200, 40).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 200, "chunk too long: {}", char_len(chunk));
        }
    }

    #[test]
    fn test_consecutive_chunks_share_exact_overlap() {
        let text = sample_text();
        let overlap = 40;
        let chunks = split_into_chunks(&text, 200, overlap).unwrap();
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(char_len(&pair[0]) - overlap)
                .collect();
            let head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_reassembly_reproduces_text() {
        let text = sample_text();
        for (size, overlap) in [(200, 40), (120, 0), (500, 80), (64, 63)] {
            let chunks = split_into_chunks(&text, size, overlap).unwrap();
            assert_eq!(reassemble(&chunks, overlap), text.trim(), "size={size}");
        }
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text();
        let a = split_into_chunks(&text, 150, 30).unwrap();
        let b = split_into_chunks(&text, 150, 30).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let first = "a".repeat(60);
        let second = "b".repeat(60);
        let text = format!("{first}\n\n{second}");
        let chunks = split_into_chunks(&text, 100, 0).unwrap();
        assert_eq!(chunks[0], format!("{first}\n\n"));
        assert_eq!(chunks[1], second);
    }

    #[test]
    fn test_prefers_word_boundary_over_hard_cut() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = split_into_chunks(text, 20, 0).unwrap();
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.ends_with(' '), "cut mid-word: {chunk:?}");
        }
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "x".repeat(250);
        let chunks = split_into_chunks(&text, 100, 10).unwrap();
        assert_eq!(char_len(&chunks[0]), 100);
        assert_eq!(reassemble(&chunks, 10), text);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "これは日本語のテストです。".repeat(60);
        let chunks = split_into_chunks(&text, 100, 20).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 100);
        }
        assert_eq!(reassemble(&chunks, 20), text);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            TextChunker::new(0, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            TextChunker::new(10, 10),
            Err(Error::InvalidArgument(_))
        ));
    }
}
