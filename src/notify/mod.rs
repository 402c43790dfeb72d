//! Digest delivery
//!
//! A [`Notifier`] knows its own destination; callers only hand it the text.

mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while delivering a digest
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to write notification: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers a plain-text message to a fixed destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Prints the digest to standard output instead of sending it
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        use std::io::Write;

        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", text)?;
        out.flush()?;
        Ok(())
    }
}
