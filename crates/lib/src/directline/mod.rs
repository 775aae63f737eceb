//! Direct Line v3 client: conversation lifecycle and activity exchange.
//!
//! The wire schema (conversation start, activity post/get, watermark paging) is
//! the service's external contract and is modeled as-is, not redesigned.

mod activity;
mod client;

pub use activity::{Activity, ActivitySet, Conversation, Sender};
pub use client::DirectLineClient;
