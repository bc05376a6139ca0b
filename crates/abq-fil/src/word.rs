//! Word-level reinterpretation.
//!
//! A `.fil` payload is a packed sequence of 8-byte words with no type tag.
//! Whether a word holds an integer, a float or eight characters of text is
//! decided by the record schema; the functions here only apply the file's
//! byte order.

use std::fmt;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

/// Size of one word in bytes.
pub const WORD_BYTES: usize = 8;

/// Byte order of markers and numeric words, fixed once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

/// One untyped 8-byte word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Word([u8; WORD_BYTES]);

impl Word {
    pub const fn from_bytes(bytes: [u8; WORD_BYTES]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; WORD_BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; WORD_BYTES] {
        &self.0
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

pub fn as_integer(word: Word, order: ByteOrder) -> i64 {
    match order {
        ByteOrder::Little => LittleEndian::read_i64(&word.0),
        ByteOrder::Big => BigEndian::read_i64(&word.0),
    }
}

pub fn as_float(word: Word, order: ByteOrder) -> f64 {
    match order {
        ByteOrder::Little => LittleEndian::read_f64(&word.0),
        ByteOrder::Big => BigEndian::read_f64(&word.0),
    }
}

/// Characters are stored in file order regardless of byte order.
pub fn as_text(word: Word) -> [u8; WORD_BYTES] {
    word.0
}

/// Splits a block payload into words. Trailing bytes short of a full word
/// are ignored; the physical reader only produces whole-word payloads.
pub fn split_words(payload: &[u8]) -> Vec<Word> {
    payload
        .chunks_exact(WORD_BYTES)
        .map(|chunk| {
            let mut bytes = [0u8; WORD_BYTES];
            bytes.copy_from_slice(chunk);
            Word(bytes)
        })
        .collect()
}
