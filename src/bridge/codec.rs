//! The identifier bridging codec.
//!
//! Legacy clients address everything by integer, sort by integer, and
//! paginate by integer. The backend addresses everything by `at://` URI and
//! has no integers at all. This codec packs the full resource address (plus
//! creation time, plus an optional secondary actor for reposts) into one
//! arbitrary-precision integer, and unpacks it again without any lookup
//! table: decoding is pure bit manipulation.
//!
//! Layout, reading from the least-significant bit: a 3-bit marker, then the
//! self-describing structure (tags and lengths), then the payload bytes, and
//! finally the creation timestamp in the open-ended high bits. Putting the
//! timestamp on top means plain integer comparison orders identifiers by
//! creation time; putting all structure at the bottom means the variable
//! overall width never makes the layout ambiguous.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use thiserror::Error;

use super::actor::{ActorId, PLC_LEN};
use super::record::{Collection, RecordAddress, RecordKey};

/// Marker in the low three bits of every record identifier.
const RECORD_MARKER: u64 = 0b101;

/// Marker in the low three bits of every actor identifier.
const ACTOR_MARKER: u64 = 0b011;

const MARKER_BITS: u32 = 3;

// Actor method tags. Tag 3 is reserved and never emitted.
const METHOD_PLC: u64 = 0;
const METHOD_WEB: u64 = 1;
const METHOD_OTHER: u64 = 2;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The bit layout does not match any known tag/length combination.
    #[error("malformed bridged identifier")]
    Malformed,
    /// The actor method tag is one this codec never emits.
    #[error("unsupported actor identifier variant")]
    UnsupportedVariant,
}

/// A decoded record identifier: the address plus the non-address context
/// that was folded in at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub address: RecordAddress,
    pub created_at: DateTime<Utc>,
    /// Present when the identifier names a record *as seen through* a
    /// repost: the reposting actor, so two viewers' reposts of the same
    /// record never collide on one identifier.
    pub repost_by: Option<ActorId>,
}

/// Everything a bridged identifier can decode to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedId {
    /// The reserved zero value: "no identifier".
    Absent,
    Record(RecordRef),
    Actor(ActorId),
}

impl DecodedId {
    /// Treat anything but a record identifier as malformed. Callers map
    /// [`DecodeError`] to "not found", which is the right answer for an
    /// absent or wrong-kind identifier too.
    pub fn into_record(self) -> Result<RecordRef, DecodeError> {
        match self {
            Self::Record(record) => Ok(record),
            Self::Absent | Self::Actor(_) => Err(DecodeError::Malformed),
        }
    }

    /// Treat anything but an actor identifier as malformed.
    pub fn into_actor(self) -> Result<ActorId, DecodeError> {
        match self {
            Self::Actor(actor) => Ok(actor),
            Self::Absent | Self::Record(_) => Err(DecodeError::Malformed),
        }
    }
}

/// Encode a record reference. Deterministic; never returns zero (the low
/// bits always carry a nonzero marker).
#[must_use]
pub fn record_id(
    address: &RecordAddress,
    created_at: DateTime<Utc>,
    repost_by: Option<&ActorId>,
) -> BigUint {
    // Pre-epoch creation times clamp to zero; legacy clients cannot
    // represent them either.
    let ts_ms = u64::try_from(created_at.timestamp_millis().max(0)).unwrap_or(0);

    let mut packer = Packer::new(BigUint::from(ts_ms));
    push_rkey(&mut packer, &address.rkey);
    if let Some(actor) = repost_by {
        push_actor(&mut packer, actor);
    }
    push_actor(&mut packer, &address.actor);
    packer.push(3, address.collection.tag());
    packer.push(1, u64::from(repost_by.is_some()));
    packer.push(MARKER_BITS, RECORD_MARKER);
    packer.into_inner()
}

/// Encode a bare actor as a legacy user identifier.
#[must_use]
pub fn actor_id(actor: &ActorId) -> BigUint {
    let mut packer = Packer::new(BigUint::default());
    push_actor(&mut packer, actor);
    packer.push(MARKER_BITS, ACTOR_MARKER);
    packer.into_inner()
}

/// Encode an optional actor reference, collapsing `None` to the reserved
/// zero sentinel the legacy schema uses for "no such reference".
#[must_use]
pub fn optional_actor_id(actor: Option<&ActorId>) -> BigUint {
    actor.map_or_else(BigUint::default, actor_id)
}

/// Decode any bridged identifier. Zero short-circuits to
/// [`DecodedId::Absent`] without touching the bit layout.
pub fn decode(id: &BigUint) -> Result<DecodedId, DecodeError> {
    if id.bits() == 0 {
        return Ok(DecodedId::Absent);
    }

    let mut unpacker = Unpacker::new(id.clone());
    match unpacker.take(MARKER_BITS) {
        RECORD_MARKER => {
            let has_repost_by = unpacker.take(1) == 1;
            let collection =
                Collection::from_tag(unpacker.take(3)).ok_or(DecodeError::Malformed)?;
            let actor = take_actor(&mut unpacker)?;
            let repost_by = if has_repost_by {
                Some(take_actor(&mut unpacker)?)
            } else {
                None
            };
            let rkey = take_rkey(&mut unpacker)?;
            let ts_ms = unpacker
                .remaining_u64()
                .and_then(|ms| i64::try_from(ms).ok())
                .ok_or(DecodeError::Malformed)?;
            let created_at =
                DateTime::from_timestamp_millis(ts_ms).ok_or(DecodeError::Malformed)?;

            Ok(DecodedId::Record(RecordRef {
                address: RecordAddress {
                    actor,
                    collection,
                    rkey,
                },
                created_at,
                repost_by,
            }))
        }
        ACTOR_MARKER => {
            let actor = take_actor(&mut unpacker)?;
            // A genuine actor id has nothing above the actor block.
            if unpacker.remaining_u64() != Some(0) {
                return Err(DecodeError::Malformed);
            }
            Ok(DecodedId::Actor(actor))
        }
        _ => Err(DecodeError::Malformed),
    }
}

/// Decode, expecting a record identifier.
pub fn decode_record(id: &BigUint) -> Result<RecordRef, DecodeError> {
    decode(id)?.into_record()
}

/// Decode, expecting an actor identifier.
pub fn decode_actor(id: &BigUint) -> Result<ActorId, DecodeError> {
    decode(id)?.into_actor()
}

fn push_actor(packer: &mut Packer, actor: &ActorId) {
    match actor {
        ActorId::Plc(bytes) => {
            packer.push_bytes(bytes);
            packer.push(2, METHOD_PLC);
        }
        ActorId::Web(s) => {
            packer.push_bytes(s.as_bytes());
            packer.push(8, s.len() as u64);
            packer.push(2, METHOD_WEB);
        }
        ActorId::Other(s) => {
            packer.push_bytes(s.as_bytes());
            packer.push(8, s.len() as u64);
            packer.push(2, METHOD_OTHER);
        }
    }
}

fn take_actor(unpacker: &mut Unpacker) -> Result<ActorId, DecodeError> {
    match unpacker.take(2) {
        METHOD_PLC => {
            let bytes = unpacker.take_bytes(PLC_LEN);
            let mut fixed = [0u8; PLC_LEN];
            fixed.copy_from_slice(&bytes);
            Ok(ActorId::Plc(fixed))
        }
        METHOD_WEB => Ok(ActorId::Web(take_short_string(unpacker)?)),
        METHOD_OTHER => Ok(ActorId::Other(take_short_string(unpacker)?)),
        _ => Err(DecodeError::UnsupportedVariant),
    }
}

fn push_rkey(packer: &mut Packer, rkey: &RecordKey) {
    match rkey {
        RecordKey::Tid(value) => {
            packer.push(64, *value);
            packer.push(1, 0);
        }
        RecordKey::Any(s) => {
            packer.push_bytes(s.as_bytes());
            packer.push(8, s.len() as u64);
            packer.push(1, 1);
        }
    }
}

fn take_rkey(unpacker: &mut Unpacker) -> Result<RecordKey, DecodeError> {
    if unpacker.take(1) == 0 {
        Ok(RecordKey::Tid(unpacker.take(64)))
    } else {
        Ok(RecordKey::Any(take_short_string(unpacker)?))
    }
}

fn take_short_string(unpacker: &mut Unpacker) -> Result<String, DecodeError> {
    let len = unpacker.take(8) as usize;
    if len == 0 {
        return Err(DecodeError::Malformed);
    }
    let bytes = unpacker.take_bytes(len);
    String::from_utf8(bytes).map_err(|_| DecodeError::Malformed)
}

/// Accumulates fields most-significant-first; each push shifts everything
/// already present up and drops the new field into the low bits.
struct Packer {
    acc: BigUint,
}

impl Packer {
    fn new(acc: BigUint) -> Self {
        Self { acc }
    }

    fn push(&mut self, width: u32, value: u64) {
        self.acc = (&self.acc << width) | BigUint::from(value);
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.acc = (&self.acc << (8 * bytes.len())) | BigUint::from_bytes_be(bytes);
    }

    fn into_inner(self) -> BigUint {
        self.acc
    }
}

/// Consumes fields from the low bits up. Reading past the top of the
/// integer yields zero bits, which is exactly right: high zero bytes of a
/// payload are not representable in the integer in the first place.
struct Unpacker {
    rest: BigUint,
}

impl Unpacker {
    fn new(rest: BigUint) -> Self {
        Self { rest }
    }

    fn take(&mut self, width: u32) -> u64 {
        let mask = (BigUint::from(1u8) << width) - BigUint::from(1u8);
        let value = &self.rest & &mask;
        self.rest = &self.rest >> width;
        value.iter_u64_digits().next().unwrap_or(0)
    }

    fn take_bytes(&mut self, len: usize) -> Vec<u8> {
        let width = 8 * len;
        let mask = (BigUint::from(1u8) << width) - BigUint::from(1u8);
        let value = &self.rest & &mask;
        self.rest = &self.rest >> width;

        let raw = value.to_bytes_be();
        let mut out = vec![0u8; len];
        out[len - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// Whatever is left, if it fits 64 bits.
    fn remaining_u64(&self) -> Option<u64> {
        if self.rest.bits() > 64 {
            return None;
        }
        Some(self.rest.iter_u64_digits().next().unwrap_or(0))
    }
}
