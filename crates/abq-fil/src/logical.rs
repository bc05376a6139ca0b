//! Logical record assembly.
//!
//! Block payloads form one continuous word stream in which logical records
//! are packed back to back, each starting with two header words:
//!
//! ```text
//! word 0  record length in words, header included
//! word 1  key code
//! word 2… data words (length - 2 of them)
//! ```
//!
//! A record may start near the end of one block and continue in the next,
//! so the assembler keeps the unconsumed tail of the current block and
//! pulls further blocks until the declared length is gathered.

use std::io::Read;

use tracing::trace;

use crate::error::{DecodeError, Result};
use crate::physical::{Encoding, PhysicalReader};
use crate::word::{ByteOrder, Word, as_integer, split_words};

/// Words in a record header (length and key).
pub const HEADER_WORDS: usize = 2;

/// One semantic record, possibly gathered from several blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRecord {
    /// Word offset of the length word within the word stream.
    pub offset: u64,
    pub key: i64,
    /// Data words following the header.
    pub words: Vec<Word>,
}

impl LogicalRecord {
    /// Length in words as stored in the length word, header included.
    pub fn total_len(&self) -> usize {
        self.words.len() + HEADER_WORDS
    }

    /// Data words only.
    pub fn data_len(&self) -> usize {
        self.words.len()
    }

    pub fn has_data(&self) -> bool {
        !self.words.is_empty()
    }

    pub fn into_words(self) -> Vec<Word> {
        self.words
    }
}

pub struct LogicalAssembler<R> {
    blocks: PhysicalReader<R>,
    current: Vec<Word>,
    cursor: usize,
    consumed: u64,
    blocks_read: u64,
}

impl<R: Read> LogicalAssembler<R> {
    pub fn new(blocks: PhysicalReader<R>) -> Self {
        Self {
            blocks,
            current: Vec::new(),
            cursor: 0,
            consumed: 0,
            blocks_read: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.blocks.encoding()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.blocks.byte_order()
    }

    /// Word offset of the next unconsumed word.
    pub fn word_offset(&self) -> u64 {
        self.consumed
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Assembles the next logical record.
    ///
    /// `Ok(None)` is returned only when the source ends with no record
    /// partially gathered.
    pub fn next_logical_record(&mut self) -> Result<Option<LogicalRecord>> {
        let offset = self.consumed;
        let order = self.byte_order();

        let mut header = [Word::default(); HEADER_WORDS];
        let got = self.take_into(&mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_WORDS {
            return Err(DecodeError::Truncated {
                offset,
                context: "record header",
            }
            .into());
        }

        let length = as_integer(header[0], order);
        let key = as_integer(header[1], order);
        let data_len = usize::try_from(length)
            .ok()
            .and_then(|len| len.checked_sub(HEADER_WORDS))
            .ok_or(DecodeError::BadRecordLength { offset, length })?;

        // The length word is untrusted; grow past one block only as words arrive.
        let mut words = Vec::with_capacity(data_len.min(self.current.len()));
        while words.len() < data_len {
            if !self.refill()? {
                return Err(DecodeError::Truncated {
                    offset,
                    context: "logical record",
                }
                .into());
            }
            let take = (data_len - words.len()).min(self.current.len() - self.cursor);
            words.extend_from_slice(&self.current[self.cursor..self.cursor + take]);
            self.advance(take);
        }

        trace!(offset, key, length, "logical record");
        Ok(Some(LogicalRecord { offset, key, words }))
    }

    /// Copies up to `out.len()` words, crossing blocks as needed.
    fn take_into(&mut self, out: &mut [Word]) -> Result<usize> {
        let mut filled = 0;
        while filled < out.len() {
            if !self.refill()? {
                break;
            }
            let take = (out.len() - filled).min(self.current.len() - self.cursor);
            out[filled..filled + take].copy_from_slice(&self.current[self.cursor..self.cursor + take]);
            self.advance(take);
            filled += take;
        }
        Ok(filled)
    }

    /// Ensures at least one unconsumed word is buffered. Returns `false` at
    /// end of stream.
    fn refill(&mut self) -> Result<bool> {
        while self.cursor >= self.current.len() {
            match self.blocks.next_record()? {
                Some(block) => {
                    self.current = split_words(&block.payload);
                    self.cursor = 0;
                    self.blocks_read += 1;
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn advance(&mut self, words: usize) {
        self.cursor += words;
        self.consumed += words as u64;
    }
}
