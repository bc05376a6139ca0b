//! Test-only `.fil` encoder: lays cells out as a word stream and frames it
//! into physical blocks.

#![allow(dead_code)]

use abq_fil::{
    ByteOrder, DecodedRecord, DecoderOptions, FilError, FilReader, SchemaRegistry, Word,
};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text([u8; 8]),
}

/// Up to eight characters, blank padded.
pub fn text(s: &str) -> Cell {
    assert!(s.len() <= 8, "text cell holds 8 characters");
    let mut bytes = [b' '; 8];
    bytes[..s.len()].copy_from_slice(s.as_bytes());
    Cell::Text(bytes)
}

/// Text spread over `words` cells.
pub fn long_text(s: &str, words: usize) -> Vec<Cell> {
    let mut padded = s.as_bytes().to_vec();
    assert!(padded.len() <= words * 8, "text longer than its field");
    padded.resize(words * 8, b' ');
    padded
        .chunks(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            Cell::Text(bytes)
        })
        .collect()
}

/// Prepends the length and key header words.
pub fn record(key: i64, data: &[Cell]) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(data.len() + 2);
    cells.push(Cell::Int(data.len() as i64 + 2));
    cells.push(Cell::Int(key));
    cells.extend_from_slice(data);
    cells
}

#[derive(Debug, Clone, Copy)]
pub struct FilWriter {
    pub order: ByteOrder,
    pub marker_width: usize,
    pub marker_in_words: bool,
    pub block_words: usize,
}

impl Default for FilWriter {
    fn default() -> Self {
        Self {
            order: ByteOrder::Little,
            marker_width: 4,
            marker_in_words: false,
            block_words: 512,
        }
    }
}

impl FilWriter {
    pub fn with_block_words(block_words: usize) -> Self {
        Self {
            block_words,
            ..Self::default()
        }
    }

    pub fn word(&self, cell: Cell) -> Word {
        let bytes = match (cell, self.order) {
            (Cell::Int(v), ByteOrder::Little) => v.to_le_bytes(),
            (Cell::Int(v), ByteOrder::Big) => v.to_be_bytes(),
            (Cell::Float(v), ByteOrder::Little) => v.to_le_bytes(),
            (Cell::Float(v), ByteOrder::Big) => v.to_be_bytes(),
            (Cell::Text(bytes), _) => bytes,
        };
        Word::from_bytes(bytes)
    }

    pub fn marker(&self, words: usize) -> Vec<u8> {
        let value = if self.marker_in_words { words } else { words * 8 };
        let value = value as u64;
        match (self.marker_width, self.order) {
            (4, ByteOrder::Little) => (value as u32).to_le_bytes().to_vec(),
            (4, ByteOrder::Big) => (value as u32).to_be_bytes().to_vec(),
            (_, ByteOrder::Little) => value.to_le_bytes().to_vec(),
            (_, ByteOrder::Big) => value.to_be_bytes().to_vec(),
        }
    }

    /// Byte length of a framed block of `words` words.
    pub fn framed_len(&self, words: usize) -> usize {
        2 * self.marker_width + words * 8
    }

    /// Concatenates records into one word stream, split every
    /// `block_words` words.
    pub fn encode(&self, records: &[Vec<Cell>]) -> Vec<u8> {
        let cells: Vec<Cell> = records.iter().flatten().copied().collect();
        let blocks: Vec<&[Cell]> = cells.chunks(self.block_words).collect();
        self.frame_blocks(&blocks)
    }

    pub fn frame_blocks(&self, blocks: &[&[Cell]]) -> Vec<u8> {
        let mut out = Vec::new();
        for block in blocks {
            let marker = self.marker(block.len());
            out.extend_from_slice(&marker);
            for cell in *block {
                out.extend_from_slice(self.word(*cell).as_bytes());
            }
            out.extend_from_slice(&marker);
        }
        out
    }
}

/// Decodes `bytes` to completion, returning the records yielded before the
/// first error and that error.
pub fn decode_all(
    bytes: Vec<u8>,
    options: DecoderOptions,
    registry: &SchemaRegistry,
) -> (Vec<DecodedRecord>, Option<FilError>) {
    let mut reader =
        FilReader::from_reader(Cursor::new(bytes), options, registry).expect("valid options");
    let mut records = Vec::new();
    for item in reader.records() {
        match item {
            Ok(record) => records.push(record),
            Err(err) => return (records, Some(err)),
        }
    }
    (records, None)
}
