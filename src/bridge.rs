//! Foreground side of the background alarm.
//!
//! The bridge is the only way the foreground reaches the scheduler task. It
//! holds no timer state of its own: each request is built from the engine's
//! current view and sent down an ordered channel, and the scheduler keeps
//! only the last one. A failed send is logged and dropped; the next user
//! action sends a fresh request anyway.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Wire messages from the foreground to the background scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerMessage {
    ScheduleTimerEnd {
        #[serde(rename = "endTime")]
        end_time: u64,
        title: String,
        body: String,
    },
    CancelTimerEnd,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("background scheduler unavailable")]
    Unavailable,
    #[error("notification permission not granted")]
    PermissionDenied,
    #[error("background scheduler has shut down")]
    Disconnected,
}

pub struct NotificationBridge {
    tx: Option<UnboundedSender<SchedulerMessage>>,
    permission: Permission,
}

impl NotificationBridge {
    pub fn connect(tx: UnboundedSender<SchedulerMessage>, permission: Permission) -> Self {
        Self {
            tx: Some(tx),
            permission,
        }
    }

    /// A bridge with no background context behind it. Every call is a no-op.
    pub fn unavailable() -> Self {
        Self {
            tx: None,
            permission: Permission::Denied,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn schedule(&self, end_time: u64, title: String, body: String) {
        if self.permission != Permission::Granted {
            log::debug!("{}; relying on foreground completion", BridgeError::PermissionDenied);
            return;
        }
        let msg = SchedulerMessage::ScheduleTimerEnd {
            end_time,
            title,
            body,
        };
        if let Err(e) = self.send(msg) {
            log::warn!("could not schedule timer end: {e}");
        }
    }

    pub fn cancel(&self) {
        if let Err(e) = self.send(SchedulerMessage::CancelTimerEnd) {
            log::debug!("could not cancel timer end: {e}");
        }
    }

    fn send(&self, msg: SchedulerMessage) -> Result<(), BridgeError> {
        let tx = self.tx.as_ref().ok_or(BridgeError::Unavailable)?;
        tx.send(msg).map_err(|_| BridgeError::Disconnected)
    }
}
