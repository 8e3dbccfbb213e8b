use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::actor::ActorId;

/// Base32-sortable alphabet used by TID record keys.
const B32_SORTABLE: &str = "234567abcdefghijklmnopqrstuvwxyz";

/// TIDs are always rendered as exactly 13 characters.
const TID_CHARS: usize = 13;

/// Longest record key the identifier codec can carry.
const MAX_RKEY_LEN: usize = 255;

/// The record collections this bridge understands.
///
/// Closed set: the codec packs the tag into three bits, and decoding an
/// unknown tag is a malformed-identifier error, not a fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Post,
    Like,
    Repost,
    Follow,
}

impl Collection {
    #[must_use]
    pub fn nsid(&self) -> &'static str {
        match self {
            Self::Post => "app.bsky.feed.post",
            Self::Like => "app.bsky.feed.like",
            Self::Repost => "app.bsky.feed.repost",
            Self::Follow => "app.bsky.graph.follow",
        }
    }

    #[must_use]
    pub fn from_nsid(nsid: &str) -> Option<Self> {
        match nsid {
            "app.bsky.feed.post" => Some(Self::Post),
            "app.bsky.feed.like" => Some(Self::Like),
            "app.bsky.feed.repost" => Some(Self::Repost),
            "app.bsky.graph.follow" => Some(Self::Follow),
            _ => None,
        }
    }

    #[must_use]
    pub fn tag(&self) -> u64 {
        match self {
            Self::Post => 0,
            Self::Like => 1,
            Self::Repost => 2,
            Self::Follow => 3,
        }
    }

    #[must_use]
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Post),
            1 => Some(Self::Like),
            2 => Some(Self::Repost),
            3 => Some(Self::Follow),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("not an at:// URI: {0}")]
    NotAtUri(String),
    #[error("unknown record collection: {0}")]
    UnknownCollection(String),
    #[error("invalid record key: {0}")]
    InvalidRecordKey(String),
    #[error(transparent)]
    Actor(#[from] super::actor::ActorIdError),
}

/// A record key as assigned by the PDS.
///
/// The common case is a TID: 13 base32-sortable characters whose high bits
/// are a microsecond clock, which is what makes record keys (and therefore
/// bridged identifiers) roughly creation-ordered. Anything else (e.g. the
/// literal `self` of a profile record) is carried as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Tid(u64),
    Any(String),
}

impl RecordKey {
    /// The creation instant embedded in a TID: the top 53 bits are
    /// microseconds since the epoch, the low 10 a per-writer clock ID.
    #[must_use]
    pub fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            Self::Tid(value) => {
                let micros = value >> 10;
                chrono::DateTime::from_timestamp_micros(i64::try_from(micros).ok()?)
            }
            Self::Any(_) => None,
        }
    }
}

impl FromStr for RecordKey {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_RKEY_LEN {
            return Err(AddressError::InvalidRecordKey(s.to_string()));
        }
        if let Some(value) = decode_tid(s) {
            return Ok(Self::Tid(value));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '~' | '-'))
        {
            return Err(AddressError::InvalidRecordKey(s.to_string()));
        }
        Ok(Self::Any(s.to_string()))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tid(value) => f.write_str(&encode_tid(*value)),
            Self::Any(s) => f.write_str(s),
        }
    }
}

/// Decode a 13-character TID. Returns `None` when the string is not a TID
/// (wrong length, bad character, or a value that overflows the 64-bit form).
fn decode_tid(s: &str) -> Option<u64> {
    if s.len() != TID_CHARS {
        return None;
    }
    let mut acc: u128 = 0;
    for c in s.chars() {
        let digit = B32_SORTABLE.find(c)?;
        acc = (acc << 5) | digit as u128;
    }
    u64::try_from(acc).ok()
}

fn encode_tid(value: u64) -> String {
    let alphabet = B32_SORTABLE.as_bytes();
    let acc = u128::from(value);
    let mut out = String::with_capacity(TID_CHARS);
    for i in (0..TID_CHARS).rev() {
        let digit = ((acc >> (i * 5)) & 0x1f) as usize;
        out.push(alphabet[digit] as char);
    }
    out
}

/// The backend's native address of one record: owning actor, collection,
/// record key. Uniquely and permanently identifies the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordAddress {
    pub actor: ActorId,
    pub collection: Collection,
    pub rkey: RecordKey,
}

impl RecordAddress {
    /// Render as an `at://` URI, the form the upstream API speaks.
    #[must_use]
    pub fn at_uri(&self) -> String {
        format!("at://{}/{}/{}", self.actor, self.collection.nsid(), self.rkey)
    }
}

impl FromStr for RecordAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("at://")
            .ok_or_else(|| AddressError::NotAtUri(s.to_string()))?;

        let mut parts = rest.splitn(3, '/');
        let (Some(did), Some(nsid), Some(rkey)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AddressError::NotAtUri(s.to_string()));
        };

        Ok(Self {
            actor: did.parse()?,
            collection: Collection::from_nsid(nsid)
                .ok_or_else(|| AddressError::UnknownCollection(nsid.to_string()))?,
            rkey: rkey.parse()?,
        })
    }
}

impl fmt::Display for RecordAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.at_uri())
    }
}
