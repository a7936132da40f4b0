//! Opaque secure-download token.
//!
//! The token is the standard base64 encoding of the file id followed by a
//! millisecond Unix timestamp. It obscures the id in the URL; it is not
//! authenticated and must not be treated as access control.
//!
//! The standard alphabet includes `/` and `+`, so a token may span several
//! path segments. Use [`token_from_url`] rather than splitting on `/`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{ProtocolError, Result};

/// Path segment that precedes the token in a secure-download URL.
pub const SECURE_DOWNLOAD_PATH: &str = "secure-download";

/// Number of decimal digits in a millisecond timestamp between 2001 and 2286.
pub const TIMESTAMP_DIGITS: usize = 13;

/// Decoded contents of a secure-download token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadToken {
    /// The file id that was encoded.
    pub file_id: String,
    /// Millisecond timestamp at issue time.
    pub issued_at_ms: u64,
}

/// Encode `file_id` and `issued_at_ms` into an opaque token.
pub fn encode(file_id: &str, issued_at_ms: u64) -> String {
    BASE64.encode(format!("{}{}", file_id, issued_at_ms))
}

/// Reverse [`encode`].
///
/// The trailing [`TIMESTAMP_DIGITS`] characters are taken as the timestamp.
pub fn decode(token: &str) -> Result<DownloadToken> {
    let raw = String::from_utf8(BASE64.decode(token)?)?;
    if raw.len() <= TIMESTAMP_DIGITS || !raw.is_char_boundary(raw.len() - TIMESTAMP_DIGITS) {
        return Err(ProtocolError::TokenTooShort {
            len: raw.len(),
            min: TIMESTAMP_DIGITS,
        });
    }

    let (file_id, stamp) = raw.split_at(raw.len() - TIMESTAMP_DIGITS);
    let issued_at_ms = stamp
        .parse::<u64>()
        .map_err(|e| ProtocolError::InvalidToken(format!("timestamp: {}", e)))?;

    Ok(DownloadToken {
        file_id: file_id.to_string(),
        issued_at_ms,
    })
}

/// Token part of a secure-download URL.
///
/// Everything after the last `/secure-download/` is the token. The marker
/// contains `-`, which the base64 alphabet lacks, so it never occurs inside
/// a token.
pub fn token_from_url(url: &str) -> Option<&str> {
    let marker = format!("/{}/", SECURE_DOWNLOAD_PATH);
    url.rsplit_once(marker.as_str())
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// Build `<origin>/secure-download/<token>`.
///
/// A trailing slash on `origin` is ignored.
pub fn secure_download_url(origin: &str, file_id: &str, issued_at_ms: u64) -> String {
    format!(
        "{}/{}/{}",
        origin.trim_end_matches('/'),
        SECURE_DOWNLOAD_PATH,
        encode(file_id, issued_at_ms)
    )
}
