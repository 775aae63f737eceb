//! Activity and conversation wire types (Direct Line v3 JSON schema).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle to one open conversation: service-issued id and token, plus the
/// watermark cursor of the last consumed activity page.
///
/// The watermark is opaque and monotonically non-decreasing: a poll made with
/// the current watermark never re-delivers an activity at or behind it.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub token: String,
    pub watermark: Option<String>,
}

/// Activity payload as exchanged with the service. Incoming activities carry
/// whatever subset of fields the bot produced; outgoing ones are built by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity type: "message", "event", "typing", ...
    #[serde(rename = "type")]
    pub activity_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Sender>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Event name (e.g. "tokens/response") when type is "event".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Event payload when type is "event".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Sender reference (`from` field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
}

/// One page of the activity stream, as returned by the GET activities endpoint.
/// `watermark` marks the newest activity in the page and is fed back on the next poll.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub watermark: Option<String>,
}

impl Activity {
    /// Build an outgoing message activity attributed to `user_id`.
    pub fn message(user_id: &str, text: &str, locale: &str) -> Self {
        Self {
            activity_type: "message".to_string(),
            id: None,
            from: Some(Sender {
                id: user_id.to_string(),
            }),
            text: Some(text.to_string()),
            locale: Some(locale.to_string()),
            name: None,
            value: None,
            value_type: None,
            timestamp: None,
        }
    }

    /// Build the "tokens/response" event activity carrying a user auth token,
    /// for bots that gate on an OAuth sign-in exchange.
    pub fn token_response(user_id: &str, user_token: &str) -> Self {
        Self {
            activity_type: "event".to_string(),
            id: None,
            from: Some(Sender {
                id: user_id.to_string(),
            }),
            text: None,
            locale: None,
            name: Some("tokens/response".to_string()),
            value: Some(serde_json::json!({ "token": user_token })),
            value_type: None,
            timestamp: None,
        }
    }

    pub fn is_message(&self) -> bool {
        self.activity_type == "message"
    }

    /// True when the activity was sent by the given user id.
    pub fn is_from(&self, user_id: &str) -> bool {
        self.from.as_ref().map(|f| f.id.as_str()) == Some(user_id)
    }

    /// Extract markdown content from a "DynamicPlanStepFinished" event activity
    /// (Copilot agents report search results this way: the markdown sits at
    /// `value.observation.search_result.Text.MarkdownContent`).
    pub fn markdown_content(&self) -> Option<&str> {
        if self.activity_type != "event" || self.value_type.as_deref() != Some("DynamicPlanStepFinished")
        {
            return None;
        }
        self.value
            .as_ref()?
            .get("observation")?
            .get("search_result")?
            .get("Text")?
            .get("MarkdownContent")?
            .as_str()
    }
}
