use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Lowercase RFC 4648 base32, as used by `did:plc` identifiers.
const B32_PLC: &str = "abcdefghijklmnopqrstuvwxyz234567";

/// Number of bytes in the binary form of a `did:plc` suffix.
pub const PLC_LEN: usize = 15;

/// Number of base32 characters in a canonical `did:plc` suffix.
const PLC_CHARS: usize = 24;

/// Longest method-specific suffix the identifier codec can carry.
const MAX_SUFFIX_LEN: usize = 255;

static PLC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^did:plc:([a-z2-7]{24})$").unwrap());

static DID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^did:([a-z]+):(.+)$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActorIdError {
    #[error("not a DID: {0}")]
    NotADid(String),
    #[error("DID method-specific part too long: {0} bytes")]
    TooLong(usize),
}

/// The account identifier of a Bluesky actor.
///
/// `Plc` holds the decoded 15-byte form of the dominant `did:plc` method;
/// parsing only produces it for the canonical lowercase 24-character suffix,
/// so rendering an `ActorId` always reproduces the input string exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorId {
    /// `did:plc:<24 base32 chars>`
    Plc([u8; PLC_LEN]),
    /// `did:web:<domain>`, suffix stored verbatim
    Web(String),
    /// Any other method, stored verbatim after `did:` (e.g. `key:z6Mk...`)
    Other(String),
}

impl FromStr for ActorId {
    type Err = ActorIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(caps) = PLC_RE.captures(s) {
            if let Some(bytes) = decode_plc_suffix(caps.get(1).unwrap().as_str()) {
                return Ok(Self::Plc(bytes));
            }
        }

        let caps = DID_RE
            .captures(s)
            .ok_or_else(|| ActorIdError::NotADid(s.to_string()))?;
        let method = caps.get(1).unwrap().as_str();
        let suffix = caps.get(2).unwrap().as_str();

        if method == "web" {
            if suffix.len() > MAX_SUFFIX_LEN {
                return Err(ActorIdError::TooLong(suffix.len()));
            }
            return Ok(Self::Web(suffix.to_string()));
        }

        // Everything after "did:", so the method name survives a round trip.
        let rest = &s[4..];
        if rest.len() > MAX_SUFFIX_LEN {
            return Err(ActorIdError::TooLong(rest.len()));
        }
        Ok(Self::Other(rest.to_string()))
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plc(bytes) => write!(f, "did:plc:{}", encode_plc_suffix(bytes)),
            Self::Web(domain) => write!(f, "did:web:{domain}"),
            Self::Other(rest) => write!(f, "did:{rest}"),
        }
    }
}

/// Decode a canonical 24-character base32 `did:plc` suffix.
fn decode_plc_suffix(s: &str) -> Option<[u8; PLC_LEN]> {
    if s.len() != PLC_CHARS {
        return None;
    }
    let mut acc: u128 = 0;
    for c in s.chars() {
        let digit = B32_PLC.find(c)?;
        acc = (acc << 5) | digit as u128;
    }
    let wide = acc.to_be_bytes();
    let mut out = [0u8; PLC_LEN];
    out.copy_from_slice(&wide[16 - PLC_LEN..]);
    Some(out)
}

/// Render the 15-byte binary form back to the 24-character base32 suffix.
fn encode_plc_suffix(bytes: &[u8; PLC_LEN]) -> String {
    let mut wide = [0u8; 16];
    wide[16 - PLC_LEN..].copy_from_slice(bytes);
    let acc = u128::from_be_bytes(wide);

    let alphabet = B32_PLC.as_bytes();
    let mut out = String::with_capacity(PLC_CHARS);
    for i in (0..PLC_CHARS).rev() {
        let digit = ((acc >> (i * 5)) & 0x1f) as usize;
        out.push(alphabet[digit] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plc() {
        let did = "did:plc:dqibjxtqfn6hydazpetzr2w4";
        let actor: ActorId = did.parse().unwrap();
        assert!(matches!(actor, ActorId::Plc(_)));
        assert_eq!(actor.to_string(), did);
    }

    #[test]
    fn test_parse_web() {
        let did = "did:web:example.com";
        let actor: ActorId = did.parse().unwrap();
        assert_eq!(actor, ActorId::Web("example.com".to_string()));
        assert_eq!(actor.to_string(), did);
    }

    #[test]
    fn test_parse_other_method() {
        let did = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
        let actor: ActorId = did.parse().unwrap();
        assert!(matches!(actor, ActorId::Other(_)));
        assert_eq!(actor.to_string(), did);
    }

    #[test]
    fn test_non_canonical_plc_is_not_plc() {
        // Wrong suffix length for the plc method; still a valid DID string.
        let actor: ActorId = "did:plc:tooshort".parse().unwrap();
        assert!(matches!(actor, ActorId::Other(_)));
        assert_eq!(actor.to_string(), "did:plc:tooshort");
    }

    #[test]
    fn test_rejects_non_did() {
        assert!("alice.bsky.social".parse::<ActorId>().is_err());
        assert!("did:".parse::<ActorId>().is_err());
        assert!("".parse::<ActorId>().is_err());
    }

    #[test]
    fn test_rejects_oversized_suffix() {
        let long = format!("did:web:{}", "a".repeat(300));
        assert_eq!(long.parse::<ActorId>(), Err(ActorIdError::TooLong(300)));
    }

    #[test]
    fn test_plc_base32_round_trip() {
        let bytes: [u8; PLC_LEN] = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee,
        ];
        let encoded = encode_plc_suffix(&bytes);
        assert_eq!(encoded.len(), 24);
        assert_eq!(decode_plc_suffix(&encoded), Some(bytes));
    }
}
