//! Notification delivery.
//!
//! The scheduler only sees the [`Notifier`] trait. A concrete implementation
//! is picked once at startup by [`from_config`].

mod desktop;

pub use desktop::{DesktopNotifier, Platform};

use crate::error::NotifyError;
use crate::storage::{NotificationsConfig, NotifierBackend};

/// Delivers a human-visible message. Best effort, fire-and-forget.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        (**self).notify(title, message)
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        (**self).notify(title, message)
    }
}

/// Writes notifications to the log instead of the desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(title, "{message}");
        Ok(())
    }
}

/// Drops every notification. Used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Build the notifier selected by configuration for the running platform.
pub fn from_config(config: &NotificationsConfig) -> Box<dyn Notifier + Send + Sync> {
    select(config, Platform::current())
}

fn select(config: &NotificationsConfig, platform: Option<Platform>) -> Box<dyn Notifier + Send + Sync> {
    if !config.enabled {
        tracing::debug!("notifications disabled");
        return Box::new(SilentNotifier);
    }
    match (config.backend, platform) {
        (NotifierBackend::Log, _) | (NotifierBackend::Auto, None) => {
            tracing::debug!("using log notifier");
            Box::new(LogNotifier)
        }
        (NotifierBackend::Desktop | NotifierBackend::Auto, Some(platform)) => {
            tracing::debug!(?platform, "using desktop notifier");
            Box::new(DesktopNotifier::new(platform))
        }
        (NotifierBackend::Desktop, None) => {
            tracing::warn!("desktop notifications requested on an unsupported platform");
            Box::new(DesktopNotifier::unsupported())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, backend: NotifierBackend) -> NotificationsConfig {
        NotificationsConfig {
            enabled,
            backend,
            ..NotificationsConfig::default()
        }
    }

    #[test]
    fn disabled_notifications_are_silent() {
        let notifier = select(&config(false, NotifierBackend::Desktop), Some(Platform::Linux));
        assert!(notifier.notify("t", "m").is_ok());
    }

    #[test]
    fn log_notifier_always_succeeds() {
        let notifier = select(&config(true, NotifierBackend::Log), Some(Platform::MacOs));
        assert!(notifier.notify("Habit Reminder", "Time to complete your habit: Read").is_ok());
    }

    #[test]
    fn auto_without_platform_falls_back_to_log() {
        let notifier = select(&config(true, NotifierBackend::Auto), None);
        assert!(notifier.notify("t", "m").is_ok());
    }

    #[test]
    fn forced_desktop_without_platform_reports_unsupported() {
        let notifier = select(&config(true, NotifierBackend::Desktop), None);
        assert!(matches!(
            notifier.notify("t", "m"),
            Err(NotifyError::UnsupportedPlatform(_))
        ));
    }
}
