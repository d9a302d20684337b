//! Day-file byte codec.
//!
//! Decoding walks an ordered ladder of text encodings. A candidate that cannot
//! decode the bytes hands over to the next one; a candidate that decodes but
//! yields text that is not a JSON array of record objects ends the walk with
//! [`CodecError::Corrupted`], since another encoding will not repair broken
//! structure. Encoding always produces canonical UTF-8 without a BOM.

use encoding_rs::{GBK, WINDOWS_1252};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::data::Record;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings a day file may have been written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// UTF-8 without a byte-order mark (canonical).
    Utf8,
    /// UTF-8 preceded by a byte-order mark.
    Utf8Bom,
    /// GBK / GB 18030 (legacy simplified-Chinese multi-byte). The GBK decoder
    /// accepts the full GB 18030 range, four-byte sequences included.
    Gbk,
    /// Latin-1 family single-byte fallback (windows-1252 table).
    ///
    /// Bytes 0x80-0x9F map to windows-1252 punctuation rather than C1
    /// controls, so a stored record without a `hash` whose content holds
    /// such bytes recomputes to a different identity than ISO-8859-1 would give.
    Latin1,
}

impl TextEncoding {
    /// Short label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-sig",
            Self::Gbk => "gbk",
            Self::Latin1 => "latin-1",
        }
    }

    /// True only for the encoding [`FileCodec::encode`] writes.
    pub fn is_canonical(self) -> bool {
        matches!(self, Self::Utf8)
    }

    /// Strictly decode `bytes`, returning `None` on any malformed sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            Self::Utf8 => {
                if bytes.starts_with(UTF8_BOM) {
                    return None;
                }
                std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
            }
            Self::Utf8Bom => {
                let body = bytes.strip_prefix(UTF8_BOM)?;
                std::str::from_utf8(body).ok().map(Cow::Borrowed)
            }
            Self::Gbk => GBK.decode_without_bom_handling_and_without_replacement(bytes),
            Self::Latin1 => WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rung of the decode ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeStep {
    /// Candidate encoding.
    pub encoding: TextEncoding,
    /// Whether a decode failure at this rung moves on to the next rung.
    pub recoverable: bool,
}

/// Default ladder: strict UTF-8, BOM-prefixed UTF-8, GBK, then the
/// single-byte fallback that decodes any byte sequence.
///
/// GB 18030 files land on the GBK rung; encoding_rs decodes both with one decoder.
pub const DECODE_LADDER: &[DecodeStep] = &[
    DecodeStep {
        encoding: TextEncoding::Utf8,
        recoverable: true,
    },
    DecodeStep {
        encoding: TextEncoding::Utf8Bom,
        recoverable: true,
    },
    DecodeStep {
        encoding: TextEncoding::Gbk,
        recoverable: true,
    },
    DecodeStep {
        encoding: TextEncoding::Latin1,
        recoverable: false,
    },
];

/// Decode failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Bytes decoded as text but the text is not a JSON array of records.
    #[error("structurally corrupt content (decoded as {encoding}): {source}")]
    Corrupted {
        /// Rung that decoded the bytes.
        encoding: TextEncoding,
        /// JSON parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// No ladder candidate could decode the bytes.
    #[error("no candidate encoding could decode the content")]
    Undecodable,
}

/// Successfully decoded day file.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedDayFile {
    /// Records in on-disk order.
    pub records: Vec<Record>,
    /// Encoding that produced a valid parse.
    pub encoding: TextEncoding,
}

/// Day-file encoder/decoder driven by a declarative encoding ladder.
#[derive(Clone, Copy, Debug)]
pub struct FileCodec {
    ladder: &'static [DecodeStep],
}

impl Default for FileCodec {
    fn default() -> Self {
        Self::new(DECODE_LADDER)
    }
}

impl FileCodec {
    /// Create a codec that tries `ladder` in order.
    pub fn new(ladder: &'static [DecodeStep]) -> Self {
        Self { ladder }
    }

    /// Configured ladder.
    pub fn ladder(&self) -> &'static [DecodeStep] {
        self.ladder
    }

    /// Decode day-file bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedDayFile, CodecError> {
        for step in self.ladder {
            let Some(text) = step.encoding.decode(bytes) else {
                debug!(encoding = %step.encoding, "day file did not decode, trying next encoding");
                if step.recoverable {
                    continue;
                }
                break;
            };
            return match serde_json::from_str::<Vec<Record>>(&text) {
                Ok(records) => Ok(DecodedDayFile {
                    records,
                    encoding: step.encoding,
                }),
                Err(source) => Err(CodecError::Corrupted {
                    encoding: step.encoding,
                    source,
                }),
            };
        }
        Err(CodecError::Undecodable)
    }

    /// Encode records as pretty-printed UTF-8 JSON with non-ASCII left unescaped.
    pub fn encode(&self, records: &[Record]) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(records)
    }
}
