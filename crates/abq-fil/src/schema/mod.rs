//! Key schema registry.
//!
//! Words carry no type tag, so every known key code maps to a field layout
//! that assigns a type to each word position. Two layout classes exist:
//!
//! - **Fixed**: an exact sequence of fields.
//! - **Trailing repeat**: a fixed preamble followed by a repeat group whose
//!   element count is the remaining word count divided by the group width.
//!
//! Repeat groups are flat; a group never contains another group.
//!
//! The standard Abaqus table is built once on first use and shared by
//! `&'static` reference. Custom registries (nonstandard producers, tests)
//! are put together with [`SchemaRegistry::builder`].

mod table;

use std::collections::BTreeMap;
use std::sync::LazyLock;

pub use table::keys;

/// How a word is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordType {
    Int,
    Float,
    /// Eight ASCII characters per word.
    Text,
}

/// Number of words a field occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Scalar,
    /// A fixed run of words. Text runs decode to one string; numeric runs
    /// decode to an array.
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: WordType,
    pub cardinality: Cardinality,
}

impl FieldSpec {
    pub const fn int(name: &'static str) -> Self {
        Self::new(name, WordType::Int, Cardinality::Scalar)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, WordType::Float, Cardinality::Scalar)
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, WordType::Text, Cardinality::Scalar)
    }

    /// Text spanning `words` words (8 characters each).
    pub const fn long_text(name: &'static str, words: usize) -> Self {
        Self::new(name, WordType::Text, Cardinality::Fixed(words))
    }

    pub const fn ints(name: &'static str, count: usize) -> Self {
        Self::new(name, WordType::Int, Cardinality::Fixed(count))
    }

    pub const fn floats(name: &'static str, count: usize) -> Self {
        Self::new(name, WordType::Float, Cardinality::Fixed(count))
    }

    const fn new(name: &'static str, ty: WordType, cardinality: Cardinality) -> Self {
        Self {
            name,
            ty,
            cardinality,
        }
    }

    /// Width in words.
    pub fn width(&self) -> usize {
        match self.cardinality {
            Cardinality::Scalar => 1,
            Cardinality::Fixed(words) => words,
        }
    }
}

/// Same-shaped fields repeated until the record's words are exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatGroup {
    fields: Vec<FieldSpec>,
    min_count: usize,
}

impl RepeatGroup {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            min_count: 0,
        }
    }

    /// Requires at least `count` elements.
    pub fn at_least(mut self, count: usize) -> Self {
        self.min_count = count;
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// Words per element.
    pub fn width(&self) -> usize {
        self.fields.iter().map(FieldSpec::width).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    Fixed,
    TrailingRepeat,
}

/// Field layout of one key code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    key: i64,
    name: &'static str,
    preamble: Vec<FieldSpec>,
    repeat: Option<RepeatGroup>,
}

impl Schema {
    pub fn fixed(key: i64, name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            key,
            name,
            preamble: fields,
            repeat: None,
        }
    }

    pub fn repeating(
        key: i64,
        name: &'static str,
        preamble: Vec<FieldSpec>,
        group: RepeatGroup,
    ) -> Self {
        Self {
            key,
            name,
            preamble,
            repeat: Some(group),
        }
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    /// Short mnemonic, e.g. `"S"` or `"NODE"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn preamble(&self) -> &[FieldSpec] {
        &self.preamble
    }

    pub fn repeat(&self) -> Option<&RepeatGroup> {
        self.repeat.as_ref()
    }

    pub fn length_class(&self) -> LengthClass {
        match self.repeat {
            Some(_) => LengthClass::TrailingRepeat,
            None => LengthClass::Fixed,
        }
    }

    pub fn preamble_words(&self) -> usize {
        self.preamble.iter().map(FieldSpec::width).sum()
    }

    /// Number of repeat elements carried by `data_words` data words, or
    /// `None` when that word count violates the layout.
    ///
    /// Fixed layouts accept exactly their preamble width and report zero
    /// elements.
    pub fn repeat_count(&self, data_words: usize) -> Option<usize> {
        let rest = data_words.checked_sub(self.preamble_words())?;
        let Some(group) = &self.repeat else {
            return (rest == 0).then_some(0);
        };
        let width = group.width();
        let count = if width == 0 {
            (rest == 0).then_some(0)?
        } else if rest % width == 0 {
            rest / width
        } else {
            return None;
        };
        (count >= group.min_count).then_some(count)
    }
}

/// Immutable lookup from key code to [`Schema`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    schemas: BTreeMap<i64, Schema>,
}

static STANDARD: LazyLock<SchemaRegistry> = LazyLock::new(table::standard);

impl SchemaRegistry {
    /// The built-in Abaqus table.
    pub fn standard() -> &'static SchemaRegistry {
        &STANDARD
    }

    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// A builder seeded with this registry's entries.
    pub fn to_builder(&self) -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            schemas: self.schemas.clone(),
        }
    }

    pub fn lookup(&self, key: i64) -> Option<&Schema> {
        self.schemas.get(&key)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.schemas.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistryBuilder {
    schemas: BTreeMap<i64, Schema>,
}

impl SchemaRegistryBuilder {
    /// Adds `schema`, replacing any entry with the same key.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas.insert(schema.key, schema);
        self
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
        }
    }
}
