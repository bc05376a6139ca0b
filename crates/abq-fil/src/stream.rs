//! Typed record stream.
//!
//! [`FilReader`] pulls logical records, resolves their schema and yields
//! [`DecodedRecord`]s in file order. The pass is forward-only and cannot be
//! restarted; reading again means opening the source again.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use abq_fil::{DecoderOptions, FilReader};
//!
//! let mut reader = FilReader::open_with("job.fil", DecoderOptions::lenient())?;
//! for record in reader.records() {
//!     let record = record?;
//!     println!("{} {:?}", record.key, record.name);
//! }
//! # Ok::<(), abq_fil::FilError>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::config::DecoderOptions;
use crate::error::{DecodeError, FilError, Result};
use crate::logical::LogicalAssembler;
use crate::physical::{Encoding, PhysicalReader, Primed};
use crate::record::{self, DecodedRecord};
use crate::schema::SchemaRegistry;

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing read yet; the encoding is detected on the first pull.
    Start,
    Reading,
    /// Clean end of stream.
    End,
    /// A decode error ended the session; it is reported again on every pull.
    Failed,
    Closed,
}

enum Session<R> {
    Start(R),
    Reading(LogicalAssembler<Primed<R>>),
    End,
    Failed(FilError),
    Closed,
}

/// A decode session over one `.fil` source.
pub struct FilReader<'s, R> {
    session: Session<R>,
    options: DecoderOptions,
    registry: &'s SchemaRegistry,
    encoding: Option<Encoding>,
    yielded: u64,
}

impl FilReader<'static, BufReader<File>> {
    /// Opens `path` with default options and the standard key table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DecoderOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: DecoderOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(path = %path.display(), "opened .fil source");
        FilReader::from_reader(BufReader::new(file), options, SchemaRegistry::standard())
    }
}

impl<'s, R: Read> FilReader<'s, R> {
    pub fn from_reader(
        source: R,
        options: DecoderOptions,
        registry: &'s SchemaRegistry,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            session: Session::Start(source),
            options,
            registry,
            encoding: None,
            yielded: 0,
        })
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Encoding settled on the first pull; `None` before that or for an
    /// empty source.
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn state(&self) -> StreamState {
        match self.session {
            Session::Start(_) => StreamState::Start,
            Session::Reading(_) => StreamState::Reading,
            Session::End => StreamState::End,
            Session::Failed(_) => StreamState::Failed,
            Session::Closed => StreamState::Closed,
        }
    }

    /// Records yielded so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Pulls the next record.
    ///
    /// Returns `Ok(None)` once the stream has ended or the reader was
    /// closed. After a failure every call returns the same error without
    /// touching the source again.
    pub fn next_record(&mut self) -> Result<Option<DecodedRecord>> {
        loop {
            match std::mem::replace(&mut self.session, Session::Closed) {
                Session::Start(source) => {
                    match PhysicalReader::detect(source, self.options.max_block_words) {
                        Ok(Some(blocks)) => {
                            self.encoding = Some(blocks.encoding());
                            self.session = Session::Reading(LogicalAssembler::new(blocks));
                        }
                        Ok(None) => {
                            self.session = Session::End;
                            return Ok(None);
                        }
                        Err(err) => return Err(self.fail(err)),
                    }
                }
                Session::Reading(mut assembler) => {
                    return match self.decode_next(&mut assembler) {
                        Ok(Some(record)) => {
                            self.session = Session::Reading(assembler);
                            self.yielded += 1;
                            Ok(Some(record))
                        }
                        Ok(None) => {
                            debug!(
                                records = self.yielded,
                                blocks = assembler.blocks_read(),
                                "end of .fil stream"
                            );
                            self.session = Session::End;
                            Ok(None)
                        }
                        Err(err) => Err(self.fail(err)),
                    };
                }
                Session::End => {
                    self.session = Session::End;
                    return Ok(None);
                }
                Session::Failed(err) => {
                    self.session = Session::Failed(err.clone());
                    return Err(err);
                }
                Session::Closed => return Ok(None),
            }
        }
    }

    /// Iterator over the remaining records. It yields an error at most once
    /// and then ends.
    pub fn records(&mut self) -> Records<'_, 's, R> {
        Records {
            reader: self,
            done: false,
        }
    }

    /// Releases the source. Idempotent; also done on drop.
    pub fn close(&mut self) {
        if !matches!(self.session, Session::Closed) {
            debug!(records = self.yielded, "closed .fil reader");
        }
        self.session = Session::Closed;
    }

    fn decode_next(
        &self,
        assembler: &mut LogicalAssembler<Primed<R>>,
    ) -> Result<Option<DecodedRecord>> {
        let Some(logical) = assembler.next_logical_record()? else {
            return Ok(None);
        };

        let Some(schema) = self.registry.lookup(logical.key) else {
            if !self.options.is_lenient() {
                return Err(DecodeError::UnknownKey {
                    key: logical.key,
                    offset: logical.offset,
                }
                .into());
            }
            warn!(key = logical.key, offset = logical.offset, "unknown record key");
            return Ok(Some(DecodedRecord::unknown(logical)));
        };

        match record::decode(schema, &logical, assembler.byte_order()) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(DecodeError::SchemaMismatch { key, length })
                if self.options.skips_schema_mismatch() =>
            {
                warn!(key, length, offset = logical.offset, "skipping malformed record");
                Ok(Some(DecodedRecord::skipped(logical, schema)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Enters the sticky failed state; the source is dropped.
    fn fail(&mut self, err: FilError) -> FilError {
        error!(error = %err, records = self.yielded, ".fil decode failed");
        self.session = Session::Failed(err.clone());
        err
    }
}

pub struct Records<'a, 's, R> {
    reader: &'a mut FilReader<'s, R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, '_, R> {
    type Item = Result<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read> FusedIterator for Records<'_, '_, R> {}

/// Decodes every record of the file at `path` with the standard key table.
pub fn read_all(path: impl AsRef<Path>, options: DecoderOptions) -> Result<Vec<DecodedRecord>> {
    let mut reader = FilReader::open_with(path, options)?;
    reader.records().collect()
}
