//! End-to-end properties of the identifier bridging codec.

use bluesky_legacy_bridge::bridge::{
    self, ActorId, Collection, DecodeError, DecodedId, RecordAddress, RecordKey,
};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn post_by(did: &str, rkey: &str) -> RecordAddress {
    RecordAddress {
        actor: did.parse().unwrap(),
        collection: Collection::Post,
        rkey: rkey.parse().unwrap(),
    }
}

#[test]
fn test_post_round_trip_at_t1000() {
    let address = post_by("did:plc:dqibjxtqfn6hydazpetzr2w4", "3lchbospvbc2j");
    let id = bridge::record_id(&address, at(1000), None);

    let decoded = bridge::decode_record(&id).expect("clean decode");
    assert_eq!(decoded.address, address);
    assert_eq!(decoded.created_at, at(1000));
    assert_eq!(decoded.repost_by, None);
}

#[test]
fn test_repost_view_is_a_distinct_identifier() {
    let address = post_by("did:plc:dqibjxtqfn6hydazpetzr2w4", "3lchbospvbc2j");
    let reposter: ActorId = "did:plc:khcyntihpu7snjszuojjgjc4".parse().unwrap();

    let plain = bridge::record_id(&address, at(1000), None);
    let via_repost = bridge::record_id(&address, at(1000), Some(&reposter));
    assert_ne!(plain, via_repost);

    // Decoding the repost view returns the original record, the original
    // time, and the reposting actor.
    let decoded = bridge::decode_record(&via_repost).unwrap();
    assert_eq!(decoded.address, address);
    assert_eq!(decoded.created_at, at(1000));
    assert_eq!(decoded.repost_by, Some(reposter));
}

#[test]
fn test_two_viewers_reposts_never_collide() {
    let address = post_by("did:plc:dqibjxtqfn6hydazpetzr2w4", "3lchbospvbc2j");
    let b1: ActorId = "did:plc:khcyntihpu7snjszuojjgjc4".parse().unwrap();
    let b2: ActorId = "did:web:example.com".parse().unwrap();

    assert_ne!(
        bridge::record_id(&address, at(1000), Some(&b1)),
        bridge::record_id(&address, at(1000), Some(&b2))
    );
}

#[test]
fn test_ordering_by_creation_time() {
    let older = post_by("did:plc:zzzzzzzzzzzzzzzzzzzzzzzz", "3lchbospvbc2j");
    let newer = post_by("did:plc:aaaaaaaaaaaaaaaaaaaaaaaa", "3lcm7b2pjio22");

    // Actor and record key bytes do not matter; time does.
    assert!(
        bridge::record_id(&older, at(1_000_000), None)
            < bridge::record_id(&newer, at(1_000_001), None)
    );
}

#[test]
fn test_zero_sentinel() {
    assert_eq!(
        bridge::decode(&BigUint::default()).unwrap(),
        DecodedId::Absent
    );
    assert_eq!(bridge::optional_actor_id(None), BigUint::default());
}

#[test]
fn test_decimal_string_round_trip() {
    // The string form is the authoritative wire representation; it must
    // survive formatting and reparsing exactly.
    let address = RecordAddress {
        actor: "did:web:example.com".parse().unwrap(),
        collection: Collection::Repost,
        rkey: RecordKey::Any("self".to_string()),
    };
    let id = bridge::record_id(&address, at(1_700_000_000_123), None);

    let reparsed: BigUint = id.to_string().parse().unwrap();
    assert_eq!(reparsed, id);
    assert_eq!(bridge::decode_record(&reparsed).unwrap().address, address);
}

#[test]
fn test_malformed_and_foreign_identifiers() {
    // A plausible-looking legacy snowflake is not one of ours.
    let foreign: BigUint = "1346889436626259968".parse().unwrap();
    assert_eq!(bridge::decode(&foreign), Err(DecodeError::Malformed));

    // Low marker bits that no encoder emits are always malformed.
    for raw in [1u64, 2, 4, 6, 7] {
        assert_eq!(
            bridge::decode(&BigUint::from(raw)),
            Err(DecodeError::Malformed)
        );
    }
}

#[test]
fn test_determinism() {
    let address = post_by("did:plc:dqibjxtqfn6hydazpetzr2w4", "3lchbospvbc2j");
    let ids: Vec<BigUint> = (0..100)
        .map(|_| bridge::record_id(&address, at(1_700_000_000_000), None))
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
}
