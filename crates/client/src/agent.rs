//! XRPC-style HTTP client for the origin server
//!
//! Covers the collaborator calls the suites need: account creation, record
//! creation, profile writes, and author-feed reads. API failures surface as
//! typed errors carrying the server's error body; nothing is retried here.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::Deployment;
use crate::error::{ClientError, Result};

/// Authenticated session on the origin server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    #[serde(default)]
    pub refresh_jwt: Option<String>,
}

/// Reference to a written record.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
    pub post: PostView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub record: Value,
}

/// Client for one origin server. Holds the session established by
/// [`create_account`].
///
/// [`create_account`]: PdsClient::create_account
pub struct PdsClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Session>>,
}

impl PdsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            session: RwLock::new(None),
        })
    }

    /// Client for the deployment's origin server.
    pub fn for_deployment(deployment: &Deployment) -> Result<Self> {
        Self::new(deployment.pds_url())
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn did(&self) -> Result<String> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.did.clone())
            .ok_or(ClientError::NoSession)
    }

    /// `com.atproto.server.createAccount`; the returned session is kept for
    /// subsequent authenticated calls.
    pub async fn create_account(&self, email: &str, handle: &str, password: &str) -> Result<Session> {
        let body = json!({"email": email, "handle": handle, "password": password});
        let session: Session = self
            .post_xrpc("com.atproto.server.createAccount", &body, false)
            .await?;
        info!(did = %session.did, handle = %session.handle, "account created");
        *self.session.write() = Some(session.clone());
        Ok(session)
    }

    /// Register a throwaway `test<suffix>` account on `pds_host`.
    pub async fn register_test_account(&self, pds_host: &str) -> Result<Session> {
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let name = format!("test{suffix:06}");
        let handle = format!("{name}.{pds_host}");
        let email = format!("{name}@example.com");
        self.create_account(&email, &handle, "test-password-123").await
    }

    /// `com.atproto.repo.createRecord`.
    pub async fn create_record(
        &self,
        repo: &str,
        collection: &str,
        record: Value,
    ) -> Result<RecordRef> {
        let body = json!({"repo": repo, "collection": collection, "record": record});
        self.post_xrpc("com.atproto.repo.createRecord", &body, true).await
    }

    /// `com.atproto.repo.putRecord`.
    pub async fn put_record(
        &self,
        repo: &str,
        collection: &str,
        rkey: &str,
        record: Value,
    ) -> Result<RecordRef> {
        let body = json!({"repo": repo, "collection": collection, "rkey": rkey, "record": record});
        self.post_xrpc("com.atproto.repo.putRecord", &body, true).await
    }

    /// Create a feed post in the session repository.
    pub async fn create_post(&self, text: &str) -> Result<RecordRef> {
        let did = self.did()?;
        let record = json!({
            "$type": "app.bsky.feed.post",
            "text": text,
            "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        self.create_record(&did, "app.bsky.feed.post", record).await
    }

    /// Write the session account's profile record.
    pub async fn put_profile(&self, display_name: &str) -> Result<RecordRef> {
        let did = self.did()?;
        let record = json!({
            "$type": "app.bsky.actor.profile",
            "displayName": display_name,
        });
        self.put_record(&did, "app.bsky.actor.profile", "self", record).await
    }

    /// `app.bsky.feed.getAuthorFeed`: posts by `actor`, newest first.
    pub async fn get_author_feed(&self, actor: &str) -> Result<Vec<FeedItem>> {
        #[derive(Deserialize)]
        struct FeedResponse {
            feed: Vec<FeedItem>,
        }

        let url = format!(
            "{}/xrpc/app.bsky.feed.getAuthorFeed?actor={actor}",
            self.base_url
        );
        let resp = self.http.get(&url).send().await?;
        let feed: FeedResponse = Self::decode(resp).await?;
        Ok(feed.feed)
    }

    async fn post_xrpc<T: DeserializeOwned>(&self, nsid: &str, body: &Value, auth: bool) -> Result<T> {
        let url = format!("{}/xrpc/{nsid}", self.base_url);
        debug!(%url, "xrpc call");
        let mut request = self.http.post(&url).json(body);
        if auth {
            let session = self.session().ok_or(ClientError::NoSession)?;
            request = request.bearer_auth(session.access_jwt);
        }
        let resp = request.send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        #[derive(Deserialize, Default)]
        struct ApiErrorBody {
            #[serde(default)]
            error: String,
            #[serde(default)]
            message: String,
        }

        let body: ApiErrorBody = resp.json().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            error: body.error,
            message: body.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_deserializes_from_create_account_response() {
        let json = r#"{
            "did": "did:plc:abc123",
            "handle": "test001122.pds.local.example",
            "accessJwt": "jwt-access",
            "refreshJwt": "jwt-refresh"
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.did, "did:plc:abc123");
        assert_eq!(session.refresh_jwt.as_deref(), Some("jwt-refresh"));
    }

    #[test]
    fn author_feed_items_deserialize() {
        let json = r#"{"post": {"uri": "at://did:plc:x/app.bsky.feed.post/3k",
            "cid": "bafy", "record": {"text": "hi"}}}"#;
        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.post.record["text"], "hi");
    }

    #[test]
    fn unauthenticated_record_write_needs_a_session() {
        let client = PdsClient::new("https://pds.local.example").unwrap();
        assert!(client.session().is_none());
        let err = client.did().unwrap_err();
        assert!(matches!(err, ClientError::NoSession));
    }
}
