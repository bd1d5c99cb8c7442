//! Peer request path parser using nom
//!
//! Path format:
//! ```text
//! {base_path}{group}/{key}
//! ```
//!
//! The group runs up to the first `/`; everything after it is the key, so
//! keys may contain further separators. Both parts are percent-decoded after
//! splitting, which lets an encoded `%2F` inside a group name survive.

use std::fmt;
use nom::{
    bytes::complete::take_till1,
    character::complete::char,
    combinator::{rest, verify},
    sequence::separated_pair,
    IResult,
};

/// Group and key addressed by a peer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPath {
    /// Decoded group name
    pub group: String,
    /// Decoded key
    pub key: String,
}

/// Reasons a request path is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path does not start with the base path
    Prefix,
    /// Missing separator, group or key
    Malformed,
    /// Group or key is not valid percent-encoded UTF-8
    Encoding,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Prefix => write!(f, "unexpected path prefix"),
            PathError::Malformed => write!(f, "expected <group>/<key>"),
            PathError::Encoding => write!(f, "invalid percent-encoding"),
        }
    }
}

impl std::error::Error for PathError {}

/// Split `group/key`, both non-empty
fn group_and_key(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        take_till1(|c: char| c == '/'),
        char('/'),
        verify(rest, |key: &str| !key.is_empty()),
    )(input)
}

/// Parse a raw (still percent-encoded) request path
pub fn parse_peer_path(base_path: &str, path: &str) -> Result<PeerPath, PathError> {
    let remainder = path.strip_prefix(base_path).ok_or(PathError::Prefix)?;
    let (_, (group, key)) = group_and_key(remainder).map_err(|_| PathError::Malformed)?;

    Ok(PeerPath {
        group: decode(group)?,
        key: decode(key)?,
    })
}

/// Build the path for `group` and `key` under `base_path`
pub fn peer_path(base_path: &str, group: &str, key: &str) -> String {
    format!(
        "{}{}/{}",
        base_path,
        urlencoding::encode(group),
        urlencoding::encode(key)
    )
}

/// Normalise a base path to `/segment/.../`
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

fn decode(part: &str) -> Result<String, PathError> {
    let decoded = urlencoding::decode(part).map_err(|_| PathError::Encoding)?;
    if decoded.is_empty() {
        return Err(PathError::Malformed);
    }
    Ok(decoded.into_owned())
}
