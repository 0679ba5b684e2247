//! One-shot messages carried across a redirect in the session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;

const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashLevel {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Info => "flash-info",
            Self::Warning => "flash-warning",
            Self::Danger => "flash-danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Queues a message. A failing session store only costs the message.
pub async fn push(session: &Session, level: FlashLevel, message: impl Into<String>) {
    let mut queued: Vec<Flash> = session.get(FLASH_KEY).await.ok().flatten().unwrap_or_default();
    queued.push(Flash {
        level,
        message: message.into(),
    });
    if let Err(e) = session.insert(FLASH_KEY, queued).await {
        warn!(error = %e, "Failed to store flash message");
    }
}

/// Returns and clears every queued message.
pub async fn take(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(FLASH_KEY).await {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}
