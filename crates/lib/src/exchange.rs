//! Send/poll exchange loop: post a message, poll the activity stream at a
//! fixed interval until a bot reply arrives or the bounded wait elapses.
//!
//! The service does not long-poll, so the loop sleeps between GETs; interval
//! and overall timeout come from `ExchangeConfig`.

use crate::config::ExchangeConfig;
use crate::directline::{Activity, Conversation, DirectLineClient};
use crate::error::ClientError;
use tokio::time::Instant;

/// True for activities that count as a bot reply: a message not sent by the
/// configured user, or a plan-step event carrying markdown content (Copilot
/// agents report search results as events rather than messages).
fn is_reply(activity: &Activity, user_id: &str) -> bool {
    (activity.is_message() && !activity.is_from(user_id))
        || activity.markdown_content().is_some()
}

/// Poll until a bot reply arrives. Advances the conversation watermark as
/// pages are consumed. Fails with `Network` when the reply timeout elapses.
pub async fn await_reply(
    client: &DirectLineClient,
    conversation: &mut Conversation,
    options: &ExchangeConfig,
) -> Result<Activity, ClientError> {
    let deadline = Instant::now() + options.reply_timeout();
    loop {
        let activities = client.receive_activities(conversation).await?;
        if let Some(reply) = activities
            .into_iter()
            .find(|a| is_reply(a, client.user_id()))
        {
            return Ok(reply);
        }
        if Instant::now() >= deadline {
            return Err(ClientError::Network(format!(
                "timed out after {}s waiting for a reply in conversation {}",
                options.reply_timeout_secs, conversation.id
            )));
        }
        log::debug!("no reply yet in conversation {}, polling again", conversation.id);
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Post `text` into the conversation and wait for the bot's reply.
pub async fn send_and_await_reply(
    client: &DirectLineClient,
    conversation: &mut Conversation,
    text: &str,
    options: &ExchangeConfig,
) -> Result<Activity, ClientError> {
    client.send_message(conversation, text).await?;
    await_reply(client, conversation, options).await
}

/// Text of a reply activity for display: markdown payload of a plan-step event
/// when present, otherwise the plain message text.
pub fn reply_text(activity: &Activity) -> Option<&str> {
    activity
        .markdown_content()
        .or(activity.text.as_deref())
}
