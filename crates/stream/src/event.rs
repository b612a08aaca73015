//! Typed events decoded from stream frames
//!
//! A frame is one JSON object tagged by `kind`. Commit events carry the
//! repository operations; identity and account events carry status changes
//! for an actor. Events are immutable once received.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single decoded stream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamEvent {
    Commit(CommitEvent),
    Identity(IdentityEvent),
    Account(AccountEvent),
}

impl StreamEvent {
    /// Origin identifier of the actor this event belongs to
    pub fn did(&self) -> &str {
        match self {
            StreamEvent::Commit(c) => &c.did,
            StreamEvent::Identity(i) => &i.did,
            StreamEvent::Account(a) => &a.did,
        }
    }

    /// Origin-scoped sequence number
    pub fn seq(&self) -> u64 {
        match self {
            StreamEvent::Commit(c) => c.seq,
            StreamEvent::Identity(i) => i.seq,
            StreamEvent::Account(a) => a.seq,
        }
    }

    pub fn as_commit(&self) -> Option<&CommitEvent> {
        match self {
            StreamEvent::Commit(c) => Some(c),
            _ => None,
        }
    }
}

/// An atomic set of repository operations from one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub did: String,
    pub seq: u64,
    pub rev: String,
    #[serde(default)]
    pub time_us: Option<u64>,
    #[serde(default)]
    pub ops: Vec<RepoOp>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}

/// One create/update/delete operation within a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoOp {
    pub action: OpAction,
    /// Record path, `<collection>/<record-key>`
    pub path: String,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
}

impl RepoOp {
    /// Collection segment of the record path
    pub fn collection(&self) -> Option<&str> {
        self.path.split('/').next().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpAction {
    Create,
    Update,
    Delete,
}

/// Handle/identity change for an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityEvent {
    pub did: String,
    pub seq: u64,
    #[serde(default)]
    pub handle: Option<String>,
}

/// Account status change for an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub did: String,
    pub seq: u64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Decode one frame into an event. Callers drop frames that fail here.
pub fn parse_frame(text: &str) -> std::result::Result<StreamEvent, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commit_frame() {
        let frame = r#"{
            "kind": "commit",
            "did": "did:plc:abc123",
            "seq": 42,
            "rev": "3kabcrev",
            "time_us": 1710000000000000,
            "ops": [{
                "action": "create",
                "path": "app.bsky.feed.post/3kabc",
                "cid": "bafyabc",
                "record": {"text": "Hello world!", "createdAt": "2026-01-01T00:00:00Z"}
            }],
            "since": "3kaprev"
        }"#;

        let event = parse_frame(frame).unwrap();
        assert_eq!(event.did(), "did:plc:abc123");
        assert_eq!(event.seq(), 42);

        let commit = event.as_commit().unwrap();
        assert_eq!(commit.rev, "3kabcrev");
        assert_eq!(commit.ops.len(), 1);
        assert_eq!(commit.ops[0].action, OpAction::Create);
        assert_eq!(commit.ops[0].collection(), Some("app.bsky.feed.post"));
        assert!(commit.prev.is_none());
    }

    #[test]
    fn parses_identity_and_account_frames() {
        let identity = parse_frame(
            r#"{"kind": "identity", "did": "did:plc:xyz", "seq": 7, "handle": "alice.pds.example"}"#,
        )
        .unwrap();
        assert!(matches!(identity, StreamEvent::Identity(ref i) if i.handle.as_deref() == Some("alice.pds.example")));

        let account =
            parse_frame(r#"{"kind": "account", "did": "did:plc:xyz", "seq": 8, "active": true}"#)
                .unwrap();
        assert!(matches!(account, StreamEvent::Account(ref a) if a.active));
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(parse_frame(r#"{"kind": "tombstone", "did": "did:plc:x", "seq": 1}"#).is_err());
        assert!(parse_frame("not json").is_err());
    }
}
