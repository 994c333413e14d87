//! Cache key derivation
//!
//! Generated files are named `{prefix}{identifier}_{digest}.{ext}`. The
//! identifier is a filesystem-friendly rendering of the first words of the
//! text, which keeps directory listings and log lines readable. The digest
//! covers the whole text, so two inputs that share their first words still
//! map to different files.

use std::fmt::Write;

use blake2::{Blake2b, Digest, digest::consts::U20};

/// Number of words kept in the short label
pub const LABEL_WORDS: usize = 7;

/// Digest length in bytes; rendered as twice as many hex characters
pub const DIGEST_BYTES: usize = 20;

/// Upper bound on the identifier, in bytes
///
/// Keeps generated names well below the usual 255-byte filename limit.
pub const MAX_IDENTIFIER_BYTES: usize = 64;

type TextHasher = Blake2b<U20>;

/// First seven whitespace-delimited words, joined by single spaces
///
/// Used in log lines and as the readable part of generated filenames.
pub fn short_label(text: &str) -> String {
    text.split_whitespace().take(LABEL_WORDS).collect::<Vec<_>>().join(" ")
}

/// Filesystem-friendly form of a label
///
/// Whitespace runs become a single underscore; anything that is neither
/// alphanumeric nor an underscore is dropped. The result is cut to
/// [`MAX_IDENTIFIER_BYTES`] on a character boundary.
pub fn to_identifier(label: &str) -> String {
    let joined = label.split_whitespace().collect::<Vec<_>>().join("_");
    let mut identifier = String::with_capacity(joined.len().min(MAX_IDENTIFIER_BYTES));

    for c in joined.chars().filter(|c| c.is_alphanumeric() || *c == '_') {
        if identifier.len() + c.len_utf8() > MAX_IDENTIFIER_BYTES {
            break;
        }
        identifier.push(c);
    }

    identifier
}

/// Hex digest of the complete input text
///
/// BLAKE2b with a 20-byte output. Stable across processes: no seed, no salt.
pub fn text_digest(text: &str) -> String {
    let hash = TextHasher::digest(text.as_bytes());

    hash.iter().fold(String::with_capacity(DIGEST_BYTES * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Filename for `text` rendered in `format`
pub fn make_filename(prefix: &str, text: &str, format: &str) -> String {
    CacheKey::derive(prefix, text, format).filename
}

/// Identity of a cached audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    label: String,
    digest: String,
    filename: String,
}

impl CacheKey {
    /// Derive the key for `text` in `format`; the format is lower-cased
    pub fn derive(prefix: &str, text: &str, format: &str) -> Self {
        let label = short_label(text);
        let identifier = to_identifier(&label);
        let digest = text_digest(text);
        let extension = format.to_ascii_lowercase();

        let filename = format!("{prefix}{identifier}_{digest}.{extension}");

        Self {
            label,
            digest,
            filename,
        }
    }

    /// Short label, for log lines
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Hex digest of the full text
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// On-disk filename
    pub fn filename(&self) -> &str {
        &self.filename
    }
}
