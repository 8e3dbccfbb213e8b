//! Client for the upstream AT Protocol APIs: session management against the
//! user's PDS, reads against the AppView, record writes against the PDS.

mod types;

pub use types::*;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

const BRIDGE_USER_AGENT: &str = concat!("bluesky-legacy-bridge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct BlueskyClient {
    client: reqwest::Client,
    pds_base: String,
    appview_base: String,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecordRequest<'a, R: Serialize> {
    repo: &'a str,
    collection: &'a str,
    record: R,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    rkey: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubjectRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    created_at: String,
    subject: StrongRef,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostRecordOut<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    created_at: String,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyRefRecord>,
}

impl BlueskyClient {
    #[must_use]
    pub fn new(pds_base: &str, appview_base: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(BRIDGE_USER_AGENT)
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            pds_base: pds_base.trim_end_matches('/').to_string(),
            appview_base: appview_base.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange handle/password (or app password) for upstream JWTs.
    pub async fn create_session(&self, identifier: &str, password: &str) -> Result<UpstreamSession> {
        let url = format!("{}/xrpc/com.atproto.server.createSession", self.pds_base);
        self.client
            .post(&url)
            .json(&CreateSessionRequest {
                identifier,
                password,
            })
            .send()
            .await
            .context("Failed to reach PDS for session creation")?
            .error_for_status()
            .context("Session creation rejected")?
            .json()
            .await
            .context("Failed to parse session response")
    }

    /// Trade the refresh JWT for a fresh token pair.
    pub async fn refresh_session(&self, refresh_jwt: &str) -> Result<UpstreamSession> {
        let url = format!("{}/xrpc/com.atproto.server.refreshSession", self.pds_base);
        self.client
            .post(&url)
            .bearer_auth(refresh_jwt)
            .send()
            .await
            .context("Failed to reach PDS for session refresh")?
            .error_for_status()
            .context("Session refresh rejected")?
            .json()
            .await
            .context("Failed to parse refreshed session response")
    }

    /// Fetch a page of the viewer's home timeline.
    pub async fn get_timeline(
        &self,
        access_jwt: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Timeline> {
        let mut url = format!(
            "{}/xrpc/app.bsky.feed.getTimeline?limit={limit}",
            self.appview_base
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(&urlencoding::encode(cursor));
        }
        self.get_json(&url, access_jwt)
            .await
            .context("Failed to fetch timeline")
    }

    /// Fetch a page of one actor's posts.
    pub async fn get_author_feed(
        &self,
        access_jwt: &str,
        actor: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Timeline> {
        let mut url = format!(
            "{}/xrpc/app.bsky.feed.getAuthorFeed?actor={}&limit={limit}",
            self.appview_base,
            urlencoding::encode(actor)
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(&urlencoding::encode(cursor));
        }
        self.get_json(&url, access_jwt)
            .await
            .context("Failed to fetch author feed")
    }

    /// Fetch a post with its surrounding thread.
    pub async fn get_post_thread(
        &self,
        access_jwt: &str,
        uri: &str,
        depth: u32,
        parent_height: u32,
    ) -> Result<ThreadResponse> {
        let url = format!(
            "{}/xrpc/app.bsky.feed.getPostThread?depth={depth}&parentHeight={parent_height}&uri={}",
            self.appview_base,
            urlencoding::encode(uri)
        );
        self.get_json(&url, access_jwt)
            .await
            .context("Failed to fetch post thread")
    }

    /// Fetch an actor's full profile. `actor` is a handle or a DID.
    pub async fn get_profile(&self, access_jwt: &str, actor: &str) -> Result<ProfileDetailed> {
        let url = format!(
            "{}/xrpc/app.bsky.actor.getProfile?actor={}",
            self.appview_base,
            urlencoding::encode(actor)
        );
        self.get_json(&url, access_jwt)
            .await
            .context("Failed to fetch profile")
    }

    /// Publish a post, optionally as a reply.
    pub async fn create_post(
        &self,
        access_jwt: &str,
        repo: &str,
        text: &str,
        reply: Option<ReplyRefRecord>,
    ) -> Result<CreateRecordResult> {
        self.create_record(
            access_jwt,
            repo,
            "app.bsky.feed.post",
            PostRecordOut {
                record_type: "app.bsky.feed.post",
                created_at: Utc::now().to_rfc3339(),
                text,
                reply,
            },
        )
        .await
        .context("Failed to create post")
    }

    /// Like the referenced record.
    pub async fn create_like(
        &self,
        access_jwt: &str,
        repo: &str,
        subject: StrongRef,
    ) -> Result<CreateRecordResult> {
        self.create_subject_record(access_jwt, repo, "app.bsky.feed.like", subject)
            .await
            .context("Failed to create like")
    }

    /// Repost the referenced record.
    pub async fn create_repost(
        &self,
        access_jwt: &str,
        repo: &str,
        subject: StrongRef,
    ) -> Result<CreateRecordResult> {
        self.create_subject_record(access_jwt, repo, "app.bsky.feed.repost", subject)
            .await
            .context("Failed to create repost")
    }

    /// Delete a record from the caller's own repo.
    pub async fn delete_record(
        &self,
        access_jwt: &str,
        repo: &str,
        collection: &str,
        rkey: &str,
    ) -> Result<()> {
        let url = format!("{}/xrpc/com.atproto.repo.deleteRecord", self.pds_base);
        self.client
            .post(&url)
            .bearer_auth(access_jwt)
            .json(&DeleteRecordRequest {
                repo,
                collection,
                rkey,
            })
            .send()
            .await
            .context("Failed to reach PDS for record deletion")?
            .error_for_status()
            .context("Record deletion rejected")?;
        Ok(())
    }

    async fn create_subject_record(
        &self,
        access_jwt: &str,
        repo: &str,
        collection: &'static str,
        subject: StrongRef,
    ) -> Result<CreateRecordResult> {
        self.create_record(
            access_jwt,
            repo,
            collection,
            SubjectRecord {
                record_type: collection,
                created_at: Utc::now().to_rfc3339(),
                subject,
            },
        )
        .await
    }

    async fn create_record<R: Serialize>(
        &self,
        access_jwt: &str,
        repo: &str,
        collection: &str,
        record: R,
    ) -> Result<CreateRecordResult> {
        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.pds_base);
        self.client
            .post(&url)
            .bearer_auth(access_jwt)
            .json(&CreateRecordRequest {
                repo,
                collection,
                record,
            })
            .send()
            .await
            .context("Failed to reach PDS for record creation")?
            .error_for_status()
            .context("Record creation rejected")?
            .json()
            .await
            .context("Failed to parse record creation response")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_jwt: &str,
    ) -> Result<T> {
        self.client
            .get(url)
            .bearer_auth(access_jwt)
            .send()
            .await
            .context("Upstream request failed")?
            .error_for_status()
            .context("Upstream returned an error status")?
            .json()
            .await
            .context("Failed to parse upstream response")
    }
}
