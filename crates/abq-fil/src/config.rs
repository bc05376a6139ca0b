use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FilError, Result};

/// Physical block capacity of Abaqus-written files.
pub const DEFAULT_MAX_BLOCK_WORDS: usize = 512;

/// Largest block capacity accepted by [`DecoderOptions::validate`]
/// (128 MiB per block).
pub const MAX_BLOCK_WORDS_LIMIT: usize = 1 << 24;

/// What to do with a record whose key has no schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeyPolicy {
    /// Yield the record untyped with its raw words.
    Lenient,
    /// Fail the session at that record.
    #[default]
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderOptions {
    pub unknown_key_policy: UnknownKeyPolicy,
    /// Largest accepted physical block, in words.
    pub max_block_words: usize,
    /// Under the lenient policy, also yield length-violating records of
    /// known keys as skipped instead of failing.
    pub downgrade_schema_mismatch: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            unknown_key_policy: UnknownKeyPolicy::Strict,
            max_block_words: DEFAULT_MAX_BLOCK_WORDS,
            downgrade_schema_mismatch: false,
        }
    }
}

impl DecoderOptions {
    pub fn lenient() -> Self {
        Self {
            unknown_key_policy: UnknownKeyPolicy::Lenient,
            ..Self::default()
        }
    }

    pub fn with_unknown_key_policy(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_key_policy = policy;
        self
    }

    pub fn with_max_block_words(mut self, words: usize) -> Self {
        self.max_block_words = words;
        self
    }

    pub fn with_downgrade_schema_mismatch(mut self, downgrade: bool) -> Self {
        self.downgrade_schema_mismatch = downgrade;
        self
    }

    pub fn is_lenient(&self) -> bool {
        self.unknown_key_policy == UnknownKeyPolicy::Lenient
    }

    /// Schema mismatches are downgraded only when both lenient and opted in.
    pub fn skips_schema_mismatch(&self) -> bool {
        self.is_lenient() && self.downgrade_schema_mismatch
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_block_words == 0 {
            return Err(FilError::Config(
                "max_block_words must be greater than zero".to_string(),
            ));
        }
        if self.max_block_words > MAX_BLOCK_WORDS_LIMIT {
            return Err(FilError::Config(format!(
                "max_block_words {} exceeds the limit of {MAX_BLOCK_WORDS_LIMIT}",
                self.max_block_words
            )));
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(raw)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
