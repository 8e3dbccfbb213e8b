//! Typed subset of the upstream API responses, covering what the bridge
//! reads. Unknown union members deserialize to explicit `Unknown` variants
//! rather than failing the whole response.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Result of `com.atproto.server.createSession` / `refreshSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSession {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub did: String,
    pub handle: String,
}

/// One page of `app.bsky.feed.getTimeline` or `getAuthorFeed`.
#[derive(Debug, Clone, Deserialize)]
pub struct Timeline {
    pub feed: Vec<FeedItem>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
    pub post: PostView,
    #[serde(default)]
    pub reply: Option<FeedReplyRef>,
    #[serde(default)]
    pub reason: Option<FeedReason>,
}

/// The reply context of a feed item. The parent/root members are unions in
/// the lexicon; anything that is not a plain post view (not-found, blocked)
/// is dropped rather than failing the whole page.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedReplyRef {
    #[serde(default, deserialize_with = "lenient_post_view")]
    pub parent: Option<PostView>,
    #[serde(default, deserialize_with = "lenient_post_view")]
    pub root: Option<PostView>,
}

fn lenient_post_view<'de, D>(deserializer: D) -> Result<Option<PostView>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum FeedReason {
    #[serde(rename = "app.bsky.feed.defs#reasonRepost")]
    Repost {
        by: ProfileBasic,
        #[serde(rename = "indexedAt")]
        indexed_at: DateTime<Utc>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileBasic,
    pub record: PostRecord,
    #[serde(default)]
    pub embed: Option<EmbedView>,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub repost_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub viewer: Option<PostViewer>,
}

/// The `app.bsky.feed.post` record itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reply: Option<ReplyRefRecord>,
    #[serde(default)]
    pub facets: Vec<Facet>,
    #[serde(default)]
    pub langs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostViewer {
    /// `at://` URI of the viewer's own repost of this post, if any.
    #[serde(default)]
    pub repost: Option<String>,
    /// `at://` URI of the viewer's own like of this post, if any.
    #[serde(default)]
    pub like: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBasic {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetailed {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub follows_count: i64,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum EmbedView {
    #[serde(rename = "app.bsky.embed.images#view")]
    Images { images: Vec<EmbedImage> },
    #[serde(rename = "app.bsky.embed.external#view")]
    External { external: ExternalEmbed },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedImage {
    pub thumb: String,
    pub fullsize: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalEmbed {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Facet {
    pub index: FacetIndex,
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetIndex {
    pub byte_start: i64,
    pub byte_end: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
    #[serde(other)]
    Unknown,
}

/// Result of `app.bsky.feed.getPostThread`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadResponse {
    pub thread: ThreadNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post {
        post: PostView,
        #[serde(default)]
        parent: Option<Box<ThreadNode>>,
        #[serde(default)]
        replies: Vec<ThreadNode>,
    },
    /// Not-found and blocked nodes; nothing useful to bridge.
    #[serde(other)]
    Unreachable,
}

impl ThreadNode {
    /// The post view at this node, when the node is reachable.
    #[must_use]
    pub fn post(&self) -> Option<&PostView> {
        match self {
            Self::Post { post, .. } => Some(post),
            Self::Unreachable => None,
        }
    }

    /// The parent post view, when present and reachable.
    #[must_use]
    pub fn parent_post(&self) -> Option<&PostView> {
        match self {
            Self::Post { parent, .. } => parent.as_deref().and_then(ThreadNode::post),
            Self::Unreachable => None,
        }
    }
}

/// A `{uri, cid}` pair naming one exact record version.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

/// The reply block of a post record under construction.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct ReplyRefRecord {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// Result of `com.atproto.repo.createRecord`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordResult {
    pub uri: String,
    pub cid: String,
}
