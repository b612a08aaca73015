//! Structural matchers for commit operations
//!
//! Matching on the record body is subset/partial: the matcher succeeds when
//! the actual record contains at least the specified key/value pairs and
//! ignores any extra fields. Upstream records routinely carry additional
//! server-populated fields, so exact equality would never hold.

use serde_json::{Map, Value};

use crate::event::{OpAction, StreamEvent};

/// Matcher for "a commit containing an operation on this collection whose
/// record contains these fields".
#[derive(Debug, Clone)]
pub struct CommitMatcher {
    operation: OpAction,
    collection: String,
    fields: Map<String, Value>,
}

impl CommitMatcher {
    pub fn new(operation: OpAction, collection: impl Into<String>) -> Self {
        Self {
            operation,
            collection: collection.into(),
            fields: Map::new(),
        }
    }

    /// Matcher for a create operation on `collection`.
    pub fn create(collection: impl Into<String>) -> Self {
        Self::new(OpAction::Create, collection)
    }

    /// Require `key` to equal `value` in the record body.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Require every top-level field of `value` (an object) in the record.
    pub fn record(mut self, value: Value) -> Self {
        if let Value::Object(map) = value {
            self.fields.extend(map);
        }
        self
    }

    pub fn matches(&self, event: &StreamEvent) -> bool {
        let StreamEvent::Commit(commit) = event else {
            return false;
        };
        commit.ops.iter().any(|op| {
            op.action == self.operation
                && op.collection() == Some(self.collection.as_str())
                && match &op.record {
                    Some(Value::Object(record)) => object_contains(record, &self.fields),
                    _ => self.fields.is_empty(),
                }
        })
    }
}

/// Subset containment: every expected key must be present with an equal
/// value; nested objects recurse as subsets.
fn object_contains(actual: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, want)| match (actual.get(key), want) {
        (Some(Value::Object(got)), Value::Object(want)) => object_contains(got, want),
        (Some(got), want) => got == want,
        (None, _) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_frame;
    use serde_json::json;

    fn post_event(operation: &str, text: &str) -> StreamEvent {
        parse_frame(
            &json!({
                "kind": "commit",
                "did": "did:plc:abc",
                "seq": 1,
                "rev": "3krev",
                "ops": [{
                    "action": operation,
                    "path": "app.bsky.feed.post/3kabc",
                    "record": {
                        "text": text,
                        "createdAt": "2026-01-01T00:00:00Z",
                        "langs": ["en"]
                    }
                }]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn subset_match_ignores_extra_fields() {
        let matcher = CommitMatcher::create("app.bsky.feed.post").field("text", "Hello world!");

        // record carries createdAt and langs the matcher never mentioned
        assert!(matcher.matches(&post_event("create", "Hello world!")));
    }

    #[test]
    fn rejects_wrong_operation_or_text() {
        let matcher = CommitMatcher::create("app.bsky.feed.post").field("text", "Hello world!");

        assert!(!matcher.matches(&post_event("update", "Hello world!")));
        assert!(!matcher.matches(&post_event("create", "Goodbye world!")));
    }

    #[test]
    fn rejects_other_collections_and_kinds() {
        let matcher = CommitMatcher::create("app.bsky.feed.like");
        assert!(!matcher.matches(&post_event("create", "Hello world!")));

        let identity =
            parse_frame(r#"{"kind": "identity", "did": "did:plc:abc", "seq": 2}"#).unwrap();
        assert!(!matcher.matches(&identity));
    }

    #[test]
    fn nested_objects_match_as_subsets() {
        let event = parse_frame(
            &json!({
                "kind": "commit",
                "did": "did:plc:abc",
                "seq": 3,
                "rev": "3krev",
                "ops": [{
                    "action": "create",
                    "path": "app.bsky.feed.post/3kdef",
                    "record": {
                        "text": "nested",
                        "reply": {"root": {"uri": "at://x", "cid": "bafy"}, "depth": 1}
                    }
                }]
            })
            .to_string(),
        )
        .unwrap();

        let matcher = CommitMatcher::create("app.bsky.feed.post")
            .record(json!({"reply": {"root": {"uri": "at://x"}}}));
        assert!(matcher.matches(&event));

        let wrong = CommitMatcher::create("app.bsky.feed.post")
            .record(json!({"reply": {"root": {"uri": "at://y"}}}));
        assert!(!wrong.matches(&event));
    }

    #[test]
    fn empty_matcher_accepts_any_record_shape() {
        let matcher = CommitMatcher::create("app.bsky.feed.post");
        assert!(matcher.matches(&post_event("create", "anything")));
    }
}
