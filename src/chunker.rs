use crate::error::QualiaError;

pub const DEFAULT_CHUNK_SIZE: usize = 3000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// Window geometry for splitting long contexts. Sizes count characters, not bytes.
///
/// Construction validates `size > overlap > 0`; an overlap equal to or larger
/// than the window would never advance the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    size: usize,
    overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkParams {
    pub fn new(size: usize, overlap: usize) -> Result<Self, QualiaError> {
        if overlap == 0 || overlap >= size {
            return Err(QualiaError::InvalidChunking { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Split `text` into overlapping windows, in order.
    ///
    /// A text no longer than `size` comes back whole as the only chunk.
    /// Otherwise each window starts `size - overlap` characters after the
    /// previous one, and slicing stops at the first window that reaches the
    /// end of the text.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        // Byte offset of every char boundary, plus the end of the string.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;

        if len <= self.size {
            return vec![text];
        }

        let mut chunks = Vec::with_capacity(self.expected_count(len));
        let mut start = 0;
        while start < len {
            let end = (start + self.size).min(len);
            chunks.push(&text[bounds[start]..bounds[end]]);
            if end == len {
                break;
            }
            start += self.step();
        }
        chunks
    }

    /// Number of chunks `split` produces for a text of `len` characters.
    pub fn expected_count(&self, len: usize) -> usize {
        if len <= self.size {
            1
        } else {
            (len - self.overlap).div_ceil(self.step())
        }
    }
}

/// Validate the window geometry, then split. See [`ChunkParams::split`].
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<&str>, QualiaError> {
    Ok(ChunkParams::new(size, overlap)?.split(text))
}
