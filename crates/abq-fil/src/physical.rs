//! Physical record reader.
//!
//! A `.fil` file is a Fortran unformatted sequential file: every block is
//! written as `[marker][payload][marker]` with both markers holding the
//! payload length. Marker width (4 or 8 bytes), byte order and marker unit
//! (bytes or words) depend on the producing platform, so they are settled by
//! trial-decoding the first block.

use std::io::{self, Chain, Cursor, Read};

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use tracing::{debug, trace};

use crate::error::{DecodeError, FilError, FormatError, Result};
use crate::word::{ByteOrder, WORD_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerWidth {
    Four,
    Eight,
}

impl MarkerWidth {
    pub const fn bytes(self) -> usize {
        match self {
            MarkerWidth::Four => 4,
            MarkerWidth::Eight => 8,
        }
    }
}

/// What a marker value counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerUnit {
    /// Fortran convention: 4096 for a 512-word block.
    Bytes,
    Words,
}

/// Block framing of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Encoding {
    pub order: ByteOrder,
    pub marker_width: MarkerWidth,
    pub marker_unit: MarkerUnit,
}

const fn candidate(order: ByteOrder, marker_width: MarkerWidth, marker_unit: MarkerUnit) -> Encoding {
    Encoding {
        order,
        marker_width,
        marker_unit,
    }
}

/// Outcome of trial-framing one block of the detection prefix.
enum Probe {
    /// Both markers agree; the next block starts at the given byte.
    Consistent(usize),
    /// The leading marker does not describe a block.
    Implausible(u64),
    /// The prefix ends inside the block.
    Incomplete(DecodeError),
    Failed(DecodeError),
}

impl Encoding {
    /// Trial order used by detection, smallest marker width first.
    pub const CANDIDATES: [Encoding; 8] = [
        candidate(ByteOrder::Little, MarkerWidth::Four, MarkerUnit::Bytes),
        candidate(ByteOrder::Little, MarkerWidth::Four, MarkerUnit::Words),
        candidate(ByteOrder::Big, MarkerWidth::Four, MarkerUnit::Bytes),
        candidate(ByteOrder::Big, MarkerWidth::Four, MarkerUnit::Words),
        candidate(ByteOrder::Little, MarkerWidth::Eight, MarkerUnit::Bytes),
        candidate(ByteOrder::Little, MarkerWidth::Eight, MarkerUnit::Words),
        candidate(ByteOrder::Big, MarkerWidth::Eight, MarkerUnit::Bytes),
        candidate(ByteOrder::Big, MarkerWidth::Eight, MarkerUnit::Words),
    ];

    /// Reads a marker from exactly `marker_width` bytes.
    pub fn read_marker(&self, bytes: &[u8]) -> u64 {
        match (self.marker_width, self.order) {
            (MarkerWidth::Four, ByteOrder::Little) => u64::from(LittleEndian::read_u32(bytes)),
            (MarkerWidth::Four, ByteOrder::Big) => u64::from(BigEndian::read_u32(bytes)),
            (MarkerWidth::Eight, ByteOrder::Little) => LittleEndian::read_u64(bytes),
            (MarkerWidth::Eight, ByteOrder::Big) => BigEndian::read_u64(bytes),
        }
    }

    /// Payload size in bytes declared by `marker`, or `None` when the marker
    /// does not describe 1..=`max_block_words` whole words.
    pub fn payload_len(&self, marker: u64, max_block_words: usize) -> Option<usize> {
        let words = match self.marker_unit {
            MarkerUnit::Bytes => {
                if marker % WORD_BYTES as u64 != 0 {
                    return None;
                }
                marker / WORD_BYTES as u64
            }
            MarkerUnit::Words => marker,
        };
        let words = usize::try_from(words).ok()?;
        if words == 0 || words > max_block_words {
            return None;
        }
        words.checked_mul(WORD_BYTES)
    }

    fn probe_block(&self, prefix: &[u8], at: usize, max_block_words: usize) -> Probe {
        let width = self.marker_width.bytes();
        let offset = at as u64;
        let rest = &prefix[at.min(prefix.len())..];
        if rest.len() < width {
            return Probe::Incomplete(DecodeError::Truncated {
                offset,
                context: "leading marker",
            });
        }
        let leading = self.read_marker(&rest[..width]);
        let Some(len) = self.payload_len(leading, max_block_words) else {
            return Probe::Implausible(leading);
        };
        let end = width + len;
        if rest.len() < end {
            return Probe::Incomplete(DecodeError::Truncated {
                offset,
                context: "block payload",
            });
        }
        if rest.len() < end + width {
            return Probe::Incomplete(DecodeError::Truncated {
                offset,
                context: "trailing marker",
            });
        }
        let trailing = self.read_marker(&rest[end..end + width]);
        if trailing == leading {
            Probe::Consistent(at + end + width)
        } else {
            Probe::Failed(DecodeError::MarkerMismatch {
                offset,
                leading,
                trailing,
            })
        }
    }

    /// Frames the first block and, when the prefix reaches it, the second.
    ///
    /// A data word can mimic a trailing marker under the wrong marker unit;
    /// the block that follows then no longer frames.
    fn probe_prefix(&self, prefix: &[u8], max_block_words: usize) -> Probe {
        let next = match self.probe_block(prefix, 0, max_block_words) {
            Probe::Consistent(next) => next,
            Probe::Incomplete(err) => return Probe::Failed(err),
            other => return other,
        };
        match self.probe_block(prefix, next, max_block_words) {
            Probe::Consistent(_) | Probe::Incomplete(_) => Probe::Consistent(next),
            Probe::Implausible(marker) => Probe::Failed(DecodeError::BadBlockLength {
                offset: next as u64,
                marker,
                max_words: max_block_words,
            }),
            Probe::Failed(err) => Probe::Failed(err),
        }
    }
}

/// Picks the first candidate encoding whose first block is self-consistent
/// and whose second block, when it starts inside `prefix`, frames as well.
///
/// When no candidate fits, the failure of the first candidate with a
/// plausible leading marker is reported (a truncated or corrupted opening
/// block); if no leading marker is plausible at all the encoding is
/// undetermined.
pub fn detect_encoding(prefix: &[u8], max_block_words: usize) -> Result<Encoding> {
    let mut first_failure = None;
    for candidate in Encoding::CANDIDATES {
        match candidate.probe_prefix(prefix, max_block_words) {
            Probe::Consistent(_) => return Ok(candidate),
            Probe::Implausible(_) => {}
            Probe::Failed(err) | Probe::Incomplete(err) => {
                first_failure.get_or_insert(err);
            }
        }
    }
    match first_failure {
        Some(err) => Err(err.into()),
        None => Err(FormatError::UndeterminedEncoding {
            inspected: prefix.len(),
        }
        .into()),
    }
}

/// One framed block as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalRecord {
    /// Byte offset of the leading marker.
    pub offset: u64,
    pub payload: Vec<u8>,
}

impl PhysicalRecord {
    pub fn word_count(&self) -> usize {
        self.payload.len() / WORD_BYTES
    }
}

/// Source with the detection probe pushed back in front of it.
pub type Primed<R> = Chain<Cursor<Vec<u8>>, R>;

pub struct PhysicalReader<R> {
    source: R,
    encoding: Encoding,
    max_block_words: usize,
    position: u64,
}

impl<R: Read> PhysicalReader<Primed<R>> {
    /// Probes the opening bytes of `source` and settles its encoding.
    ///
    /// Returns `Ok(None)` for an empty source.
    pub fn detect(mut source: R, max_block_words: usize) -> Result<Option<Self>> {
        let probe_len = max_block_words
            .checked_mul(WORD_BYTES)
            .and_then(|bytes| bytes.checked_add(2 * MarkerWidth::Eight.bytes()))
            .ok_or_else(|| {
                FilError::Config(format!("max_block_words {max_block_words} is too large"))
            })?;
        let mut prefix = Vec::new();
        source
            .by_ref()
            .take(probe_len as u64)
            .read_to_end(&mut prefix)?;
        if prefix.is_empty() {
            debug!("empty .fil source");
            return Ok(None);
        }

        let encoding = detect_encoding(&prefix, max_block_words)?;
        debug!(?encoding, probed = prefix.len(), "detected .fil encoding");
        Ok(Some(PhysicalReader {
            source: Cursor::new(prefix).chain(source),
            encoding,
            max_block_words,
            position: 0,
        }))
    }
}

impl<R: Read> PhysicalReader<R> {
    /// Reader for a source whose encoding is already known.
    pub fn with_encoding(source: R, encoding: Encoding, max_block_words: usize) -> Self {
        Self {
            source,
            encoding,
            max_block_words,
            position: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.encoding.order
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads the next framed block.
    ///
    /// `Ok(None)` means the source ended exactly on a block boundary.
    pub fn next_record(&mut self) -> Result<Option<PhysicalRecord>> {
        let offset = self.position;
        let width = self.encoding.marker_width.bytes();
        let mut marker = [0u8; 8];

        let got = read_full(&mut self.source, &mut marker[..width])?;
        if got == 0 {
            return Ok(None);
        }
        if got < width {
            return Err(DecodeError::Truncated {
                offset,
                context: "leading marker",
            }
            .into());
        }
        let leading = self.encoding.read_marker(&marker[..width]);
        let len = self
            .encoding
            .payload_len(leading, self.max_block_words)
            .ok_or(DecodeError::BadBlockLength {
                offset,
                marker: leading,
                max_words: self.max_block_words,
            })?;

        // Grows with the bytes actually present, not with what the marker claims.
        let mut payload = Vec::new();
        self.source
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut payload)?;
        if payload.len() < len {
            return Err(DecodeError::Truncated {
                offset,
                context: "block payload",
            }
            .into());
        }
        if read_full(&mut self.source, &mut marker[..width])? < width {
            return Err(DecodeError::Truncated {
                offset,
                context: "trailing marker",
            }
            .into());
        }
        let trailing = self.encoding.read_marker(&marker[..width]);
        if trailing != leading {
            return Err(DecodeError::MarkerMismatch {
                offset,
                leading,
                trailing,
            }
            .into());
        }

        self.position += (2 * width + len) as u64;
        trace!(offset, words = len / WORD_BYTES, "physical record");
        Ok(Some(PhysicalRecord { offset, payload }))
    }
}

/// Fills `buf` as far as the source allows; a short count means end of
/// stream.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_le32(words: &[i64]) -> Vec<u8> {
        let marker = (words.len() * WORD_BYTES) as u32;
        let mut out = marker.to_le_bytes().to_vec();
        for w in words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out.extend_from_slice(&marker.to_le_bytes());
        out
    }

    fn frame_be64_words(words: &[i64]) -> Vec<u8> {
        let marker = words.len() as u64;
        let mut out = marker.to_be_bytes().to_vec();
        for w in words {
            out.extend_from_slice(&w.to_be_bytes());
        }
        out.extend_from_slice(&marker.to_be_bytes());
        out
    }

    #[test]
    fn detects_fortran_little_endian_blocks() {
        let bytes = frame_le32(&[4, 1, 7, 42]);
        let encoding = detect_encoding(&bytes, 512).expect("consistent block");
        assert_eq!(
            encoding,
            Encoding {
                order: ByteOrder::Little,
                marker_width: MarkerWidth::Four,
                marker_unit: MarkerUnit::Bytes,
            }
        );
    }

    #[test]
    fn detects_big_endian_word_count_markers() {
        let bytes = frame_be64_words(&[3, 1921, 5]);
        let encoding = detect_encoding(&bytes, 512).expect("consistent block");
        assert_eq!(encoding.order, ByteOrder::Big);
        assert_eq!(encoding.marker_width, MarkerWidth::Eight);
        assert_eq!(encoding.marker_unit, MarkerUnit::Words);
    }

    #[test]
    fn garbage_is_undetermined() {
        let bytes = b"this is certainly not a fortran file".to_vec();
        let err = detect_encoding(&bytes, 512).expect_err("no candidate fits");
        assert!(matches!(
            err,
            FilError::Format(FormatError::UndeterminedEncoding { inspected: 36 })
        ));
    }

    #[test]
    fn short_first_block_is_truncated() {
        let mut bytes = frame_le32(&[4, 1, 7, 42]);
        bytes.truncate(bytes.len() - 2);
        let err = detect_encoding(&bytes, 512).expect_err("block cut short");
        assert!(err.is_truncated());
    }

    #[test]
    fn word_count_markers_survive_a_mimicking_data_word() {
        // Read as a byte count, the marker 16 ends a 2-word block whose
        // trailing marker lands on data word 2, which also holds 16.
        let mut words: Vec<i64> = (100..116).collect();
        words[2] = 16;
        let mut bytes = 16u32.to_le_bytes().to_vec();
        for w in &words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        bytes.extend_from_slice(&16u32.to_le_bytes());

        let encoding = detect_encoding(&bytes, 512).expect("consistent block");
        assert_eq!(encoding.order, ByteOrder::Little);
        assert_eq!(encoding.marker_width, MarkerWidth::Four);
        assert_eq!(encoding.marker_unit, MarkerUnit::Words);
    }

    #[test]
    fn second_block_must_frame_too() {
        let mut bytes = frame_le32(&[1, 2]);
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        let err = detect_encoding(&bytes, 512).expect_err("second marker is not a block");
        assert!(matches!(
            err.as_decode(),
            Some(DecodeError::BadBlockLength {
                offset: 24,
                marker: 3,
                ..
            })
        ));
    }

    #[test]
    fn lying_marker_costs_only_present_bytes() {
        let max_words = crate::config::MAX_BLOCK_WORDS_LIMIT;
        let mut bytes = frame_le32(&[1]);
        bytes.extend_from_slice(&((max_words * WORD_BYTES) as u32).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 64]);

        let mut reader = PhysicalReader::detect(Cursor::new(bytes), max_words)
            .expect("detect")
            .expect("non-empty");
        reader.next_record().expect("first block");
        let err = reader.next_record().expect_err("claimed payload is absent");
        assert_eq!(
            err.as_decode(),
            Some(&DecodeError::Truncated {
                offset: 16,
                context: "block payload",
            })
        );
    }

    #[test]
    fn overflowing_capacity_is_a_config_error() {
        let result = PhysicalReader::detect(Cursor::new(frame_le32(&[1])), usize::MAX / 4);
        assert!(matches!(result, Err(FilError::Config(_))));
    }

    #[test]
    fn reads_blocks_until_clean_end() {
        let mut bytes = frame_le32(&[1, 2, 3]);
        bytes.extend(frame_le32(&[4]));
        let mut reader = PhysicalReader::detect(Cursor::new(bytes), 512)
            .expect("detect")
            .expect("non-empty");

        let first = reader.next_record().expect("read").expect("first block");
        assert_eq!(first.offset, 0);
        assert_eq!(first.word_count(), 3);
        let second = reader.next_record().expect("read").expect("second block");
        assert_eq!(second.offset, 32);
        assert_eq!(second.word_count(), 1);
        assert!(reader.next_record().expect("clean end").is_none());
        assert_eq!(reader.position(), 48);
    }

    #[test]
    fn empty_source_has_no_blocks() {
        let reader = PhysicalReader::detect(Cursor::new(Vec::new()), 512).expect("detect");
        assert!(reader.is_none());
    }

    #[test]
    fn trailing_marker_corruption_is_reported() {
        let mut bytes = frame_le32(&[1, 2]);
        let second = frame_le32(&[3, 4]);
        let second_start = bytes.len();
        bytes.extend(second);
        let tail = bytes.len() - 4;
        bytes[tail..].copy_from_slice(&24u32.to_le_bytes());

        let mut reader = PhysicalReader::detect(Cursor::new(bytes), 512)
            .expect("detect")
            .expect("non-empty");
        reader.next_record().expect("first block intact");
        let err = reader.next_record().expect_err("second block corrupt");
        assert_eq!(
            err.as_decode(),
            Some(&DecodeError::MarkerMismatch {
                offset: second_start as u64,
                leading: 16,
                trailing: 24,
            })
        );
    }

    #[test]
    fn oversized_block_marker_is_rejected() {
        let mut bytes = frame_le32(&[1]);
        bytes.extend_from_slice(&(8u32 * 600).to_le_bytes());
        let mut reader = PhysicalReader::detect(Cursor::new(bytes), 512)
            .expect("detect")
            .expect("non-empty");
        reader.next_record().expect("first block");
        let err = reader.next_record().expect_err("marker out of range");
        assert!(matches!(
            err.as_decode(),
            Some(DecodeError::BadBlockLength { marker: 4800, .. })
        ));
    }
}
