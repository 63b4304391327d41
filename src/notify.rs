use thiserror::Error;

/// Every completion notification carries this tag, so a new one replaces the
/// previous one instead of stacking.
pub const NOTIFICATION_TAG: &str = "focus-timer-end";
pub const VIBRATION_PATTERN: [u32; 5] = [200, 100, 200, 100, 400];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: &'static str,
    pub renotify: bool,
    pub vibrate: Vec<u32>,
    pub require_interaction: bool,
}

impl Notification {
    pub fn timer_end(title: String, body: String) -> Self {
        Self {
            title,
            body,
            tag: NOTIFICATION_TAG,
            renotify: true,
            vibrate: VIBRATION_PATTERN.to_vec(),
            require_interaction: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notification surface failed: {0}")]
    Surface(#[from] std::io::Error),
}

/// Where the background scheduler posts notifications.
pub trait NotificationSurface: Send + 'static {
    fn show(&mut self, notification: &Notification) -> Result<(), NotifyError>;

    /// Close any visible notification carrying `tag`.
    fn close(&mut self, tag: &str);
}

/// Host surface: prints the notification to the terminal and rings the bell
/// when `require_interaction` is set.
#[derive(Default)]
pub struct TerminalSurface {
    visible: Option<&'static str>,
}

impl NotificationSurface for TerminalSurface {
    fn show(&mut self, notification: &Notification) -> Result<(), NotifyError> {
        use std::io::Write;

        if self.visible == Some(notification.tag) && notification.renotify {
            log::debug!(
                "replacing visible notification {} (vibrate {:?})",
                notification.tag,
                notification.vibrate
            );
        }
        let mut out = std::io::stdout().lock();
        let bell = if notification.require_interaction { "\x07" } else { "" };
        writeln!(out, "\n{}[{}] {}", bell, notification.title, notification.body)?;
        out.flush()?;
        self.visible = Some(notification.tag);
        log::info!("notification shown: {}", notification.title);
        Ok(())
    }

    fn close(&mut self, tag: &str) {
        if self.visible == Some(tag) {
            self.visible = None;
            log::info!("notification {} closed", tag);
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records what the scheduler asked the surface to do.
    #[derive(Clone, Default)]
    pub struct RecordingSurface {
        pub shown: Arc<Mutex<Vec<Notification>>>,
        pub closed: Arc<Mutex<Vec<String>>>,
        pub deny: bool,
    }

    impl NotificationSurface for RecordingSurface {
        fn show(&mut self, notification: &Notification) -> Result<(), NotifyError> {
            if self.deny {
                return Err(NotifyError::PermissionDenied);
            }
            self.shown.lock().unwrap().push(notification.clone());
            Ok(())
        }

        fn close(&mut self, tag: &str) {
            self.closed.lock().unwrap().push(tag.to_string());
        }
    }
}
