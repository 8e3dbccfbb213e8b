//! The legacy wire model: the JSON shapes a Twitter v1 client expects.
//!
//! Identifiers appear twice everywhere: a numeric `id` (best effort — some
//! legacy parsers truncate large numbers) and a decimal-string `id_str`
//! (authoritative; clients that round-trip identifiers must use it).

mod translate;

pub use translate::*;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::Serialize;
use serde_json::value::RawValue;

/// Render an identifier as an exact JSON number. Identifiers are wider
/// than any machine integer, so the digits go out as a raw token rather
/// than through `serde_json::Number`.
#[must_use]
pub fn id_number(id: &BigUint) -> Box<RawValue> {
    RawValue::from_string(id.to_string()).expect("decimal digits are valid JSON")
}

/// `Wed Oct 10 20:19:24 +0000 2018` — the only date format the old clients
/// parse.
#[must_use]
pub fn format_legacy_date(at: DateTime<Utc>) -> String {
    at.format("%a %b %d %H:%M:%S %z %Y").to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct Tweet {
    pub created_at: String,
    pub id: Box<RawValue>,
    pub id_str: String,
    pub text: String,
    pub source: String,
    pub truncated: bool,
    pub favorited: bool,
    pub retweeted: bool,
    pub retweet_count: i64,
    pub entities: Entities,
    pub in_reply_to_status_id: Option<Box<RawValue>>,
    pub in_reply_to_status_id_str: Option<String>,
    pub in_reply_to_user_id: Option<Box<RawValue>>,
    pub in_reply_to_user_id_str: Option<String>,
    pub in_reply_to_screen_name: Option<String>,
    pub user: TwitterUser,
    pub geo: Option<serde_json::Value>,
    pub coordinates: Option<serde_json::Value>,
    pub place: Option<serde_json::Value>,
    pub contributors: Option<serde_json::Value>,
    pub possibly_sensitive: bool,
    pub retweeted_status: Option<Box<Tweet>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwitterUser {
    pub id: Box<RawValue>,
    pub id_str: String,
    pub name: String,
    pub screen_name: String,
    pub created_at: String,
    pub description: String,
    pub location: String,
    pub url: String,
    pub protected: bool,
    pub verified: bool,
    pub followers_count: i64,
    pub friends_count: i64,
    pub statuses_count: i64,
    pub favourites_count: i64,
    pub listed_count: i64,
    pub lang: String,
    pub geo_enabled: bool,
    pub contributors_enabled: bool,
    pub is_translator: bool,
    pub follow_request_sent: bool,
    pub following: Option<bool>,
    pub notifications: Option<bool>,
    pub utc_offset: Option<i64>,
    pub time_zone: Option<String>,
    pub profile_image_url: String,
    pub profile_background_color: String,
    pub profile_background_image_url: String,
    pub profile_background_tile: bool,
    pub profile_link_color: String,
    pub profile_sidebar_border_color: String,
    pub profile_sidebar_fill_color: String,
    pub profile_text_color: String,
    pub profile_use_background_image: bool,
    pub default_profile: bool,
    pub default_profile_image: bool,
    pub show_all_inline_media: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Entities {
    pub hashtags: Vec<HashtagEntity>,
    pub urls: Vec<UrlEntity>,
    pub user_mentions: Vec<UserMention>,
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashtagEntity {
    pub text: String,
    pub indices: [i64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlEntity {
    pub url: String,
    pub expanded_url: String,
    pub display_url: String,
    pub indices: [i64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMention {
    pub id: Box<RawValue>,
    pub id_str: String,
    pub name: String,
    pub screen_name: String,
    pub indices: [i64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaEntity {
    pub id: Box<RawValue>,
    pub id_str: String,
    pub media_url: String,
    pub indices: [i64; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_date_format() {
        let at = DateTime::from_timestamp(1_539_202_764, 0).unwrap();
        assert_eq!(format_legacy_date(at), "Wed Oct 10 20:19:24 +0000 2018");
    }

    #[test]
    fn test_id_number_is_exact() {
        let id: BigUint = "340282366920938463463374607431768211456".parse().unwrap();
        let number = id_number(&id);
        assert_eq!(
            number.to_string(),
            "340282366920938463463374607431768211456"
        );
    }
}
