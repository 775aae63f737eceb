//! Direct Line HTTP client: token generation, conversation start, activity post/get.

use crate::config::{Config, DirectLineConfig};
use crate::directline::{Activity, ActivitySet, Conversation};
use crate::error::{error_for_status, ClientError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartConversationResponse {
    conversation_id: String,
    token: String,
}

/// Client for the Direct Line v3 API. Holds the endpoint, credentials, and a
/// pooled `reqwest::Client` built with the configured request timeout.
#[derive(Clone)]
pub struct DirectLineClient {
    endpoint: String,
    secret: Option<String>,
    bot_id: Option<String>,
    user_id: String,
    locale: String,
    client: reqwest::Client,
}

impl DirectLineClient {
    /// Build a client from resolved config. Credential resolution (env over
    /// file) happens once here, not per call.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let dl: &DirectLineConfig = &config.directline;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(dl.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: dl.endpoint.trim_end_matches('/').to_string(),
            secret: crate::config::resolve_secret(config),
            bot_id: crate::config::resolve_bot_id(config),
            user_id: dl.user_id.clone(),
            locale: dl.locale.clone(),
            client,
        })
    }

    /// Sender id attached to outgoing activities.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn secret(&self) -> Result<&str, ClientError> {
        self.secret
            .as_deref()
            .ok_or_else(|| ClientError::Auth("Direct Line secret not configured".to_string()))
    }

    /// POST /tokens/generate — exchange the channel secret for a short-lived token.
    pub async fn generate_token(&self) -> Result<String, ClientError> {
        let secret = self.secret()?;
        let url = format!("{}/tokens/generate", self.endpoint);
        let res = self.client.post(&url).bearer_auth(secret).send().await?;
        if !res.status().is_success() {
            return Err(error_for_status(res).await);
        }
        let data: TokenResponse = res.json().await?;
        Ok(data.token)
    }

    /// POST /conversations — open a conversation with the generated token.
    /// Returns a handle with a non-empty conversation id and no watermark yet.
    pub async fn start_conversation(&self) -> Result<Conversation, ClientError> {
        let token = self.generate_token().await?;
        let url = format!("{}/conversations", self.endpoint);
        let mut req = self.client.post(&url).bearer_auth(&token);
        if let Some(ref bot_id) = self.bot_id {
            req = req.json(&serde_json::json!({ "bot": { "id": bot_id } }));
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(error_for_status(res).await);
        }
        let data: StartConversationResponse = res.json().await?;
        if data.conversation_id.is_empty() {
            return Err(ClientError::Network(
                "service returned an empty conversation id".to_string(),
            ));
        }
        log::info!("started conversation {}", data.conversation_id);
        Ok(Conversation {
            id: data.conversation_id,
            token: data.token,
            watermark: None,
        })
    }

    /// POST a message activity into the conversation. Empty text is rejected
    /// before any network call.
    pub async fn send_message(
        &self,
        conversation: &Conversation,
        text: &str,
    ) -> Result<(), ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::Validation("message text is empty".to_string()));
        }
        let activity = Activity::message(&self.user_id, text, &self.locale);
        self.post_activity(conversation, &activity).await
    }

    /// POST the "tokens/response" event activity carrying the user auth token,
    /// for bots that require an OAuth sign-in exchange before answering.
    pub async fn send_user_token(
        &self,
        conversation: &Conversation,
        user_token: &str,
    ) -> Result<(), ClientError> {
        if user_token.trim().is_empty() {
            return Err(ClientError::Validation("user token is empty".to_string()));
        }
        let activity = Activity::token_response(&self.user_id, user_token);
        self.post_activity(conversation, &activity).await
    }

    async fn post_activity(
        &self,
        conversation: &Conversation,
        activity: &Activity,
    ) -> Result<(), ClientError> {
        let url = format!("{}/conversations/{}/activities", self.endpoint, conversation.id);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&conversation.token)
            .json(activity)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_for_status(res).await);
        }
        log::debug!(
            "posted {} activity to conversation {}",
            activity.activity_type,
            conversation.id
        );
        Ok(())
    }

    /// GET one page of activities newer than the conversation's watermark and
    /// advance the watermark to the newest value in the page. Returns an empty
    /// page when nothing new arrived; the caller decides when to stop polling.
    pub async fn receive_activities(
        &self,
        conversation: &mut Conversation,
    ) -> Result<Vec<Activity>, ClientError> {
        let mut url = format!("{}/conversations/{}/activities", self.endpoint, conversation.id);
        if let Some(ref watermark) = conversation.watermark {
            url = format!("{}?watermark={}", url, watermark);
        }
        let res = self
            .client
            .get(&url)
            .bearer_auth(&conversation.token)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_for_status(res).await);
        }
        let page: ActivitySet = res.json().await?;
        // The watermark cursor only moves forward; a page without one (empty
        // stream) leaves the cursor where it was.
        if let Some(watermark) = page.watermark {
            conversation.watermark = Some(watermark);
        }
        Ok(page.activities)
    }
}
