//! Word-window text chunking with fixed overlap

/// Splits text into overlapping windows of whitespace-separated words
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Words per chunk
    chunk_size: usize,
    /// Words shared by consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// `overlap` is clamped below `chunk_size` so the window always advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Words the window advances between chunks
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Lazily iterate the chunks of `text`
    ///
    /// The iterator is `Clone`, so a sequence can be restarted from any point.
    pub fn chunks<'a>(&self, text: &'a str) -> WordChunks<'a> {
        WordChunks {
            words: text.split_whitespace().collect(),
            offset: 0,
            chunk_size: self.chunk_size,
            step: self.step(),
            done: false,
        }
    }

    /// Collect the chunks of `text`
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        self.chunks(text).collect()
    }

    /// Number of chunks `chunk_text` yields for a text of `word_count` words
    pub fn expected_chunks(&self, word_count: usize) -> usize {
        if word_count == 0 {
            return 0;
        }
        let remaining = word_count.saturating_sub(self.overlap);
        remaining.div_ceil(self.step()).max(1)
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

/// Iterator over word windows produced by [`TextChunker::chunks`]
#[derive(Debug, Clone)]
pub struct WordChunks<'a> {
    words: Vec<&'a str>,
    offset: usize,
    chunk_size: usize,
    step: usize,
    done: bool,
}

impl Iterator for WordChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.done && self.offset < self.words.len() {
            let end = (self.offset + self.chunk_size).min(self.words.len());
            let chunk = self.words[self.offset..end].join(" ");

            // A window that reaches the end is the last one; anything after it
            // would be a subset of this window.
            if end == self.words.len() {
                self.done = true;
            } else {
                self.offset += self.step;
            }

            if !chunk.trim().is_empty() {
                return Some(chunk);
            }
        }
        None
    }
}
