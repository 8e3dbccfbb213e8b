//! The timeline bridge: answers "give me the page older than identifier X"
//! using the upstream's forward-cursor pagination.
//!
//! Every served page records the upstream's next cursor under the bridged
//! identifier of the page's oldest item. A later request whose `max_id`
//! matches a recorded anchor resumes from that cursor; any miss (expired,
//! foreign, or never-stored anchor) falls back to the top of the feed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use tracing::{debug, warn};

use crate::auth::AuthContext;
use crate::bluesky::{BlueskyClient, FeedReason};
use crate::continuation::ContinuationStore;
use crate::legacy::{feed_item_to_tweet, Tweet};

/// Which upstream listing a page comes from.
pub enum FeedScope {
    /// The viewer's home timeline.
    Home,
    /// One actor's posts; handle or DID, as the upstream accepts either.
    Author(String),
}

#[derive(Debug, Clone)]
pub struct TimelineBridge {
    bsky: BlueskyClient,
    store: ContinuationStore,
}

impl TimelineBridge {
    #[must_use]
    pub fn new(bsky: BlueskyClient, store: ContinuationStore) -> Self {
        Self { bsky, store }
    }

    /// Serve one page of a feed, translated to the legacy shape.
    ///
    /// # Errors
    ///
    /// Returns an error only when the upstream fetch fails; every
    /// continuation-store problem degrades to an unanchored fetch or a
    /// skipped write instead.
    pub async fn page(
        &self,
        auth: &AuthContext,
        scope: FeedScope,
        max_id: Option<&BigUint>,
        count: u32,
    ) -> Result<Vec<Tweet>> {
        let user_did = auth.did_str();
        let limit = count.clamp(1, 100);

        let cursor = match max_id {
            Some(anchor) => {
                let cursor = self
                    .store
                    .get(&user_did, &auth.session_id, anchor, &auth.key)
                    .await;
                if cursor.is_none() {
                    debug!(anchor = %anchor, "No continuation for max_id, fetching from the top");
                }
                cursor
            }
            None => None,
        };

        let timeline = match scope {
            FeedScope::Home => {
                self.bsky
                    .get_timeline(&auth.access_jwt, cursor.as_deref(), limit)
                    .await?
            }
            FeedScope::Author(actor) => {
                self.bsky
                    .get_author_feed(&auth.access_jwt, &actor, cursor.as_deref(), limit)
                    .await?
            }
        };

        let mut tweets = Vec::with_capacity(timeline.feed.len());
        let mut oldest: Option<(DateTime<Utc>, BigUint)> = None;

        for item in &timeline.feed {
            let tweet = feed_item_to_tweet(item);

            // The anchor must be the identifier the client will actually
            // send back, so reposts count with their repost time.
            let shown_at = match &item.reason {
                Some(FeedReason::Repost { indexed_at, .. }) => *indexed_at,
                _ => item.post.record.created_at,
            };
            if let Ok(id) = tweet.id_str.parse::<BigUint>() {
                if id.bits() > 0 && oldest.as_ref().map_or(true, |(at, _)| shown_at < *at) {
                    oldest = Some((shown_at, id));
                }
            }

            tweets.push(tweet);
        }

        if let (Some((_, anchor)), Some(next_cursor)) = (oldest, timeline.cursor.as_deref()) {
            if let Err(e) = self
                .store
                .put(&user_did, &auth.session_id, &anchor, next_cursor, &auth.key)
                .await
            {
                // Losing the write only costs the next page its shortcut.
                warn!("Failed to record timeline continuation: {e}");
            }
        }

        Ok(tweets)
    }
}
