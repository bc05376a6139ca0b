//! Streaming reader for Abaqus `.fil` result files.
//!
//! This crate provides:
//! - **Physical record reader** for the Fortran-framed blocks, with marker
//!   width, byte order and marker unit detected from the first block
//! - **Word decoder** reinterpreting untyped 8-byte words as integer, float
//!   or text
//! - **Logical record assembler** joining records that straddle blocks
//! - **Key schema registry** with the standard Abaqus record layouts
//! - **Typed record stream** yielding named, typed records lazily
//!
//! Assembling records into meshes or result sets is left to callers.

pub mod config;
pub mod error;
pub mod logical;
pub mod physical;
pub mod record;
pub mod schema;
pub mod stream;
pub mod word;

pub use config::{
    DEFAULT_MAX_BLOCK_WORDS, DecoderOptions, MAX_BLOCK_WORDS_LIMIT, UnknownKeyPolicy,
};
pub use error::{DecodeError, FilError, FormatError, Result};
pub use logical::{LogicalAssembler, LogicalRecord};
pub use physical::{Encoding, MarkerUnit, MarkerWidth, PhysicalReader, PhysicalRecord};
pub use record::{DecodedRecord, FieldMap, RecordBody, Value};
pub use schema::{
    Cardinality, FieldSpec, LengthClass, RepeatGroup, Schema, SchemaRegistry, WordType, keys,
};
pub use stream::{FilReader, Records, StreamState, read_all};
pub use word::{ByteOrder, WORD_BYTES, Word, as_float, as_integer, as_text};
