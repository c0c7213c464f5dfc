//! Payload slicing for the chunked transfer.

/// Default maximum chunk length in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 16384;

/// A contiguous slice of the payload sent in one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position of the chunk in the transfer, starting at 0.
    pub index: usize,
    /// Offset of the first byte within the payload.
    pub offset: usize,
    /// Chunk bytes.
    pub data: &'a [u8],
}

impl Chunk<'_> {
    /// Offset one past the last byte of the chunk.
    pub fn end(&self) -> usize {
        self.offset + self.data.len()
    }

    /// Chunk length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Iterator over the chunks of a payload, in increasing offset order.
///
/// Chunks cover the payload exactly once; every chunk is `chunk_size` long
/// except possibly the last one. An empty payload yields no chunks.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    payload: &'a [u8],
    chunk_size: usize,
    offset: usize,
    index: usize,
}

impl<'a> Chunks<'a> {
    /// Slice `payload` into chunks of at most `chunk_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(payload: &'a [u8], chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            payload,
            chunk_size,
            offset: 0,
            index: 0,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.payload.len() {
            return None;
        }

        let end = (self.offset + self.chunk_size).min(self.payload.len());
        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            data: &self.payload[self.offset..end],
        };

        self.offset = end;
        self.index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = chunk_count(self.payload.len() - self.offset, self.chunk_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Number of chunks a payload of `len` bytes is split into.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}
