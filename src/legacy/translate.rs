//! Reshaping upstream views into the legacy wire model. All identifier
//! fields go through the bridging codec; everything else is a field-by-field
//! mapping.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde_json::value::RawValue;
use tracing::debug;

use super::{
    format_legacy_date, id_number, Entities, HashtagEntity, MediaEntity, Tweet, TwitterUser,
    UrlEntity, UserMention,
};
use crate::bluesky::{
    EmbedView, FacetFeature, FeedItem, FeedReason, PostView, ProfileBasic, ProfileDetailed,
};
use crate::bridge::{self, ActorId, RecordAddress};

const SOURCE_NAME: &str = "Bluesky";
const PROFILE_BACKGROUND_IMAGE: &str = "http://a0.twimg.com/images/themes/theme1/bg.png";

/// Translate a timeline entry. A repost surfaces under the reposting
/// actor's name with its own identifier; the original rides along as
/// `retweeted_status`.
#[must_use]
pub fn feed_item_to_tweet(item: &FeedItem) -> Tweet {
    let reply_parent = item.reply.as_ref().and_then(|r| r.parent.as_ref());
    match &item.reason {
        Some(FeedReason::Repost { by, indexed_at }) => {
            repost_to_tweet(&item.post, reply_parent, by, *indexed_at)
        }
        _ => post_to_tweet(&item.post, reply_parent),
    }
}

/// Translate a plain post view.
#[must_use]
pub fn post_to_tweet(post: &PostView, reply_parent: Option<&PostView>) -> Tweet {
    let created_at = post.record.created_at;
    let id = encode_record_uri(&post.uri, created_at, None);

    let parent_status_id = reply_parent.map(|parent| {
        encode_record_uri(&parent.uri, parent.record.created_at, None)
    });
    let parent_user_id = reply_parent.map(|parent| {
        bridge::optional_actor_id(parse_did(&parent.author.did).as_ref())
    });

    Tweet {
        created_at: format_legacy_date(created_at),
        id: id_number(&id),
        id_str: id.to_string(),
        text: post.record.text.clone(),
        source: SOURCE_NAME.to_string(),
        truncated: false,
        favorited: post
            .viewer
            .as_ref()
            .is_some_and(|viewer| viewer.like.is_some()),
        retweeted: post
            .viewer
            .as_ref()
            .is_some_and(|viewer| viewer.repost.is_some()),
        retweet_count: post.repost_count,
        entities: build_entities(post),
        in_reply_to_status_id: parent_status_id.as_ref().map(id_number),
        in_reply_to_status_id_str: parent_status_id.as_ref().map(BigUint::to_string),
        in_reply_to_user_id: optional_id_number(parent_user_id.as_ref()),
        in_reply_to_user_id_str: optional_id_string(parent_user_id.as_ref()),
        in_reply_to_screen_name: reply_parent.map(|parent| parent.author.handle.clone()),
        user: basic_profile_to_user(&post.author),
        geo: None,
        coordinates: None,
        place: None,
        contributors: None,
        possibly_sensitive: false,
        retweeted_status: None,
    }
}

fn repost_to_tweet(
    post: &PostView,
    reply_parent: Option<&PostView>,
    by: &ProfileBasic,
    indexed_at: DateTime<Utc>,
) -> Tweet {
    let original = post_to_tweet(post, reply_parent);

    // The repost gets a distinct identifier: same record address, but keyed
    // by the reposting actor so two viewers' reposts never collide.
    let id = encode_record_uri(&post.uri, indexed_at, parse_did(&by.did).as_ref());

    Tweet {
        created_at: format_legacy_date(indexed_at),
        id: id_number(&id),
        id_str: id.to_string(),
        user: basic_profile_to_user(by),
        retweeted_status: Some(Box::new(original.clone())),
        ..original
    }
}

/// Translate a full profile, counts and all.
#[must_use]
pub fn profile_to_user(profile: &ProfileDetailed) -> TwitterUser {
    let mut user = user_shell(
        &profile.did,
        profile.display_name.as_deref(),
        &profile.handle,
        profile.avatar.as_deref(),
        profile.created_at,
    );
    user.description = profile.description.clone().unwrap_or_default();
    user.followers_count = profile.followers_count;
    user.friends_count = profile.follows_count;
    user.statuses_count = profile.posts_count;
    user
}

/// Translate the compact author view that rides along with posts.
#[must_use]
pub fn basic_profile_to_user(author: &ProfileBasic) -> TwitterUser {
    user_shell(
        &author.did,
        author.display_name.as_deref(),
        &author.handle,
        author.avatar.as_deref(),
        author.created_at,
    )
}

fn user_shell(
    did: &str,
    display_name: Option<&str>,
    handle: &str,
    avatar: Option<&str>,
    created_at: Option<DateTime<Utc>>,
) -> TwitterUser {
    let id = bridge::optional_actor_id(parse_did(did).as_ref());

    TwitterUser {
        id: id_number(&id),
        id_str: id.to_string(),
        name: display_name
            .filter(|name| !name.is_empty())
            .unwrap_or(handle)
            .to_string(),
        screen_name: handle.to_string(),
        created_at: format_legacy_date(created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)),
        description: String::new(),
        location: String::new(),
        url: String::new(),
        protected: false,
        verified: false,
        followers_count: 0,
        friends_count: 0,
        statuses_count: 0,
        favourites_count: 0,
        listed_count: 0,
        lang: "en".to_string(),
        geo_enabled: false,
        contributors_enabled: false,
        is_translator: false,
        follow_request_sent: false,
        following: None,
        notifications: None,
        utc_offset: None,
        time_zone: None,
        profile_image_url: avatar.unwrap_or_default().to_string(),
        profile_background_color: "c0deed".to_string(),
        profile_background_image_url: PROFILE_BACKGROUND_IMAGE.to_string(),
        profile_background_tile: false,
        profile_link_color: "009999".to_string(),
        profile_sidebar_border_color: "eeeeee".to_string(),
        profile_sidebar_fill_color: "efefef".to_string(),
        profile_text_color: "333333".to_string(),
        profile_use_background_image: false,
        default_profile: false,
        default_profile_image: false,
        show_all_inline_media: false,
    }
}

fn build_entities(post: &PostView) -> Entities {
    let mut entities = Entities::default();
    let text = post.record.text.as_str();

    for facet in &post.record.facets {
        let indices = [facet.index.byte_start, facet.index.byte_end];
        for feature in &facet.features {
            match feature {
                FacetFeature::Mention { did } => {
                    let id = bridge::optional_actor_id(parse_did(did).as_ref());
                    let screen_name = slice_text(text, &facet.index)
                        .trim_start_matches('@')
                        .to_string();
                    entities.user_mentions.push(UserMention {
                        id: id_number(&id),
                        id_str: id.to_string(),
                        name: screen_name.clone(),
                        screen_name,
                        indices,
                    });
                }
                FacetFeature::Link { uri } => {
                    entities.urls.push(UrlEntity {
                        url: uri.clone(),
                        expanded_url: uri.clone(),
                        display_url: slice_text(text, &facet.index).to_string(),
                        indices,
                    });
                }
                FacetFeature::Tag { tag } => {
                    entities.hashtags.push(HashtagEntity {
                        text: tag.clone(),
                        indices,
                    });
                }
                FacetFeature::Unknown => {}
            }
        }
    }

    if let Some(EmbedView::Images { images }) = &post.embed {
        for (i, image) in images.iter().enumerate() {
            let media_id = BigUint::from(i as u64 + 1);
            entities.media.push(MediaEntity {
                id: id_number(&media_id),
                id_str: media_id.to_string(),
                media_url: image.fullsize.clone(),
                indices: [0, 0],
            });
        }
    }

    entities
}

fn slice_text<'a>(text: &'a str, index: &crate::bluesky::FacetIndex) -> &'a str {
    let start = usize::try_from(index.byte_start).unwrap_or(0);
    let end = usize::try_from(index.byte_end).unwrap_or(0);
    text.get(start..end).unwrap_or("")
}

fn parse_did(did: &str) -> Option<ActorId> {
    match did.parse() {
        Ok(actor) => Some(actor),
        Err(e) => {
            if !did.is_empty() {
                debug!(did, "Unparseable actor identifier: {e}");
            }
            None
        }
    }
}

fn encode_record_uri(
    uri: &str,
    created_at: DateTime<Utc>,
    repost_by: Option<&ActorId>,
) -> BigUint {
    match uri.parse::<RecordAddress>() {
        Ok(address) => bridge::record_id(&address, created_at, repost_by),
        Err(e) => {
            debug!(uri, "Unbridgeable record address: {e}");
            BigUint::default()
        }
    }
}

fn optional_id_number(id: Option<&BigUint>) -> Option<Box<RawValue>> {
    // Zero is the "absent reference" sentinel; the legacy schema wants an
    // outright null there instead of a zero.
    id.filter(|id| id.bits() > 0).map(id_number)
}

fn optional_id_string(id: Option<&BigUint>) -> Option<String> {
    id.filter(|id| id.bits() > 0).map(BigUint::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluesky::{Facet, FacetIndex, PostRecord, PostViewer};
    use crate::bridge::DecodedId;

    fn author() -> ProfileBasic {
        ProfileBasic {
            did: "did:plc:dqibjxtqfn6hydazpetzr2w4".to_string(),
            handle: "alice.bsky.social".to_string(),
            display_name: Some("Alice".to_string()),
            avatar: None,
            created_at: None,
        }
    }

    fn post(text: &str, facets: Vec<Facet>) -> PostView {
        PostView {
            uri: "at://did:plc:dqibjxtqfn6hydazpetzr2w4/app.bsky.feed.post/3lchbospvbc2j"
                .to_string(),
            cid: "bafyreidw2uvnhns5bacdii7gozrou4rg25cpcxhe6cbhfws2c5hpsvycdm".to_string(),
            author: author(),
            record: PostRecord {
                text: text.to_string(),
                created_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
                reply: None,
                facets,
                langs: vec![],
            },
            embed: None,
            reply_count: 0,
            repost_count: 3,
            like_count: 5,
            viewer: Some(PostViewer {
                repost: None,
                like: Some("at://did:plc:x/app.bsky.feed.like/3l".to_string()),
            }),
        }
    }

    #[test]
    fn test_plain_post_id_round_trips() {
        let tweet = post_to_tweet(&post("hello", vec![]), None);

        let id: BigUint = tweet.id_str.parse().unwrap();
        let decoded = bridge::decode_record(&id).unwrap();
        assert_eq!(decoded.address.at_uri(), post("hello", vec![]).uri);
        assert_eq!(decoded.repost_by, None);
        assert!(tweet.favorited);
        assert!(!tweet.retweeted);
        assert_eq!(tweet.user.screen_name, "alice.bsky.social");
    }

    #[test]
    fn test_repost_gets_distinct_id_and_embeds_original() {
        let by = ProfileBasic {
            did: "did:plc:khcyntihpu7snjszuojjgjc4".to_string(),
            handle: "bob.bsky.social".to_string(),
            display_name: None,
            avatar: None,
            created_at: None,
        };
        let item = FeedItem {
            post: post("hello", vec![]),
            reply: None,
            reason: Some(FeedReason::Repost {
                by: by.clone(),
                indexed_at: DateTime::from_timestamp_millis(1_700_000_500_000).unwrap(),
            }),
        };

        let tweet = feed_item_to_tweet(&item);
        let original = tweet.retweeted_status.as_ref().expect("embedded original");
        assert_ne!(tweet.id_str, original.id_str);
        assert_eq!(tweet.user.screen_name, "bob.bsky.social");
        assert_eq!(original.user.screen_name, "alice.bsky.social");

        let id: BigUint = tweet.id_str.parse().unwrap();
        let decoded = bridge::decode_record(&id).unwrap();
        assert_eq!(decoded.repost_by, Some(by.did.parse().unwrap()));
        assert_eq!(decoded.address.at_uri(), original_uri());
    }

    fn original_uri() -> String {
        "at://did:plc:dqibjxtqfn6hydazpetzr2w4/app.bsky.feed.post/3lchbospvbc2j".to_string()
    }

    #[test]
    fn test_mention_and_hashtag_entities() {
        let text = "hi @bob.bsky.social #rust";
        let facets = vec![
            Facet {
                index: FacetIndex {
                    byte_start: 3,
                    byte_end: 19,
                },
                features: vec![FacetFeature::Mention {
                    did: "did:plc:khcyntihpu7snjszuojjgjc4".to_string(),
                }],
            },
            Facet {
                index: FacetIndex {
                    byte_start: 20,
                    byte_end: 25,
                },
                features: vec![FacetFeature::Tag {
                    tag: "rust".to_string(),
                }],
            },
        ];

        let tweet = post_to_tweet(&post(text, facets), None);
        assert_eq!(tweet.entities.user_mentions.len(), 1);
        assert_eq!(tweet.entities.user_mentions[0].screen_name, "bob.bsky.social");
        assert_eq!(tweet.entities.hashtags.len(), 1);
        assert_eq!(tweet.entities.hashtags[0].text, "rust");
    }

    #[test]
    fn test_reply_fields() {
        let parent = post("parent", vec![]);
        let mut child = post("child", vec![]);
        child.uri =
            "at://did:plc:khcyntihpu7snjszuojjgjc4/app.bsky.feed.post/3lcm7b2pjio22".to_string();

        let tweet = post_to_tweet(&child, Some(&parent));
        assert!(tweet.in_reply_to_status_id_str.is_some());
        assert_eq!(
            tweet.in_reply_to_screen_name.as_deref(),
            Some("alice.bsky.social")
        );

        let parent_id: BigUint = tweet.in_reply_to_status_id_str.unwrap().parse().unwrap();
        assert_eq!(
            bridge::decode_record(&parent_id).unwrap().address.at_uri(),
            parent.uri
        );
    }

    #[test]
    fn test_unbridgeable_uri_collapses_to_absent() {
        let mut bad = post("x", vec![]);
        bad.uri = "at://did:plc:dqibjxtqfn6hydazpetzr2w4/app.bsky.unknown.thing/1".to_string();
        let tweet = post_to_tweet(&bad, None);
        assert_eq!(tweet.id_str, "0");
        assert_eq!(
            bridge::decode(&tweet.id_str.parse().unwrap()).unwrap(),
            DecodedId::Absent
        );
    }
}
