//! Decoded records.

use crate::error::DecodeError;
use crate::logical::LogicalRecord;
use crate::schema::{Cardinality, FieldSpec, Schema, WordType};
use crate::word::{ByteOrder, Word, as_float, as_integer, as_text};

/// A schema-typed word value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Raw characters, blank padded as stored.
    Text(Vec<u8>),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text with trailing blanks removed. `None` for non-text values and
    /// for text that is not valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(|s| s.trim_end_matches([' ', '\0'])),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Field name to value mapping, in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap {
    entries: Vec<(&'static str, Value)>,
}

impl FieldMap {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.entries.iter().map(|(name, value)| (*name, value))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    /// Decoded through a schema. `groups` holds one field map per repeat
    /// element, in stream order.
    Typed { fields: FieldMap, groups: Vec<FieldMap> },
    /// No schema for the key; data words kept verbatim.
    Unknown { words: Vec<Word> },
    /// Known key whose length violated its schema, downgraded in lenient
    /// mode.
    Skipped { words: Vec<Word> },
}

/// One record as handed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Word offset of the record header within the word stream.
    pub offset: u64,
    pub key: i64,
    /// Schema mnemonic, absent for unknown keys.
    pub name: Option<&'static str>,
    pub body: RecordBody,
}

impl DecodedRecord {
    pub fn unknown(record: LogicalRecord) -> Self {
        Self {
            offset: record.offset,
            key: record.key,
            name: None,
            body: RecordBody::Unknown {
                words: record.into_words(),
            },
        }
    }

    pub fn skipped(record: LogicalRecord, schema: &Schema) -> Self {
        Self {
            offset: record.offset,
            key: record.key,
            name: Some(schema.name()),
            body: RecordBody::Skipped {
                words: record.into_words(),
            },
        }
    }

    /// Looks up a preamble field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.body {
            RecordBody::Typed { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&FieldMap> {
        match &self.body {
            RecordBody::Typed { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Repeat group elements; empty for fixed layouts and untyped records.
    pub fn groups(&self) -> &[FieldMap] {
        match &self.body {
            RecordBody::Typed { groups, .. } => groups,
            _ => &[],
        }
    }

    /// Values of one repeat-group field across all elements.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.groups().iter().filter_map(move |group| group.get(name))
    }

    /// Text of one repeat-group field joined across all elements, trailing
    /// blanks removed. Headings (1922) and labels (1940) store one string
    /// spread over their repeat words.
    ///
    /// `None` when the column holds no text or is not valid UTF-8.
    pub fn joined_text(&self, name: &str) -> Option<String> {
        let mut bytes = Vec::new();
        for value in self.column(name) {
            bytes.extend_from_slice(value.as_bytes()?);
        }
        if bytes.is_empty() {
            return None;
        }
        let text = String::from_utf8(bytes).ok()?;
        Some(text.trim_end_matches([' ', '\0']).to_string())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.body, RecordBody::Unknown { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.body, RecordBody::Skipped { .. })
    }

    /// Data words of an untyped record.
    pub fn raw_words(&self) -> Option<&[Word]> {
        match &self.body {
            RecordBody::Unknown { words } | RecordBody::Skipped { words } => Some(words),
            RecordBody::Typed { .. } => None,
        }
    }
}

/// Types every data word of `record` through `schema`.
pub fn decode(
    schema: &Schema,
    record: &LogicalRecord,
    order: ByteOrder,
) -> Result<DecodedRecord, DecodeError> {
    let count = schema
        .repeat_count(record.words.len())
        .ok_or(DecodeError::SchemaMismatch {
            key: record.key,
            length: record.total_len(),
        })?;

    let mut words = record.words.as_slice();
    let fields = decode_fields(schema.preamble(), &mut words, order);
    let mut groups = Vec::with_capacity(count);
    if let Some(group) = schema.repeat() {
        for _ in 0..count {
            groups.push(decode_fields(group.fields(), &mut words, order));
        }
    }
    debug_assert!(words.is_empty());

    Ok(DecodedRecord {
        offset: record.offset,
        key: record.key,
        name: Some(schema.name()),
        body: RecordBody::Typed { fields, groups },
    })
}

/// Consumes the words of `specs` from the front of `words`. The caller has
/// already checked the word count against the layout.
fn decode_fields(specs: &[FieldSpec], words: &mut &[Word], order: ByteOrder) -> FieldMap {
    let mut entries = Vec::with_capacity(specs.len());
    for spec in specs {
        let (head, rest) = std::mem::take(words).split_at(spec.width());
        *words = rest;
        entries.push((spec.name, decode_field(spec, head, order)));
    }
    FieldMap { entries }
}

fn decode_field(spec: &FieldSpec, words: &[Word], order: ByteOrder) -> Value {
    match (spec.ty, spec.cardinality) {
        (WordType::Text, _) => Value::Text(words.iter().flat_map(|w| as_text(*w)).collect()),
        (ty, Cardinality::Scalar) => scalar(ty, words[0], order),
        (ty, Cardinality::Fixed(_)) => {
            Value::Array(words.iter().map(|w| scalar(ty, *w, order)).collect())
        }
    }
}

fn scalar(ty: WordType, word: Word, order: ByteOrder) -> Value {
    match ty {
        WordType::Int => Value::Int(as_integer(word, order)),
        WordType::Float => Value::Float(as_float(word, order)),
        WordType::Text => Value::Text(as_text(word).to_vec()),
    }
}
