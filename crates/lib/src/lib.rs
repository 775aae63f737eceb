//! Botline core library — Direct Line conversation client, hosted-model
//! inference relay, and the send/poll exchange loop used by the CLI.

pub mod config;
pub mod directline;
pub mod error;
pub mod exchange;
pub mod init;
pub mod relay;

pub use error::ClientError;
