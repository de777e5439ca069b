//! Bridge to the hosting document.
//!
//! The host reports its color scheme and fullscreen state through change
//! notifications. A view subscribes with [`Host::watch_color_scheme`] and
//! [`Host::watch_fullscreen`]; each watcher is an explicit subscription that
//! is torn down by [`ThemeWatcher::unsubscribe`] (or by dropping it).

use log::{debug, info};
use thiserror::Error;
use tokio::sync::watch;

use flowmark_core::theme::ThemeMode;

/// Fullscreen requests that the host could not honor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("fullscreen is not available: {reason}")]
pub struct FullscreenError {
    reason: String,
}

impl FullscreenError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// In-process stand-in for the hosting document.
///
/// Host-side changes are driven with [`Host::set_color_scheme`] and
/// [`Host::set_fullscreen`]; the embedding application calls them when the
/// real environment changes.
#[derive(Debug)]
pub struct Host {
    color_scheme: watch::Sender<ThemeMode>,
    fullscreen: watch::Sender<bool>,
    fullscreen_supported: bool,
}

impl Host {
    pub fn new(color_scheme: ThemeMode, fullscreen_supported: bool) -> Self {
        let (color_scheme, _) = watch::channel(color_scheme);
        let (fullscreen, _) = watch::channel(false);
        Self {
            color_scheme,
            fullscreen,
            fullscreen_supported,
        }
    }

    pub fn color_scheme(&self) -> ThemeMode {
        *self.color_scheme.borrow()
    }

    /// Announces a color-scheme change to every subscriber.
    pub fn set_color_scheme(&self, mode: ThemeMode) {
        let changed = self.color_scheme.send_if_modified(|current| {
            let changed = *current != mode;
            *current = mode;
            changed
        });
        if changed {
            info!(mode = mode.as_str(); "Host color scheme changed");
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        *self.fullscreen.borrow()
    }

    /// Host-side fullscreen change, including exits not requested by a view.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.fullscreen.send_if_modified(|current| {
            let changed = *current != fullscreen;
            *current = fullscreen;
            changed
        });
    }

    pub fn request_fullscreen(&self) -> Result<(), FullscreenError> {
        if !self.fullscreen_supported {
            return Err(FullscreenError::new("the host does not support fullscreen"));
        }
        self.set_fullscreen(true);
        Ok(())
    }

    pub fn exit_fullscreen(&self) -> Result<(), FullscreenError> {
        if !self.fullscreen_supported {
            return Err(FullscreenError::new("the host does not support fullscreen"));
        }
        self.set_fullscreen(false);
        Ok(())
    }

    pub fn watch_color_scheme(&self) -> ThemeWatcher {
        ThemeWatcher {
            receiver: Some(self.color_scheme.subscribe()),
        }
    }

    pub fn watch_fullscreen(&self) -> FullscreenWatcher {
        FullscreenWatcher {
            receiver: Some(self.fullscreen.subscribe()),
        }
    }

    /// Live color-scheme subscriptions.
    pub fn color_scheme_subscribers(&self) -> usize {
        self.color_scheme.receiver_count()
    }

    /// Live fullscreen subscriptions.
    pub fn fullscreen_subscribers(&self) -> usize {
        self.fullscreen.receiver_count()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(ThemeMode::Light, true)
    }
}

/// Subscription to color-scheme changes.
#[derive(Debug)]
pub struct ThemeWatcher {
    receiver: Option<watch::Receiver<ThemeMode>>,
}

impl ThemeWatcher {
    /// Waits for the next change. Returns `None` once unsubscribed or when
    /// the host is gone.
    pub async fn changed(&mut self) -> Option<ThemeMode> {
        let receiver = self.receiver.as_mut()?;
        receiver.changed().await.ok()?;
        Some(*receiver.borrow_and_update())
    }

    pub fn is_subscribed(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!("Color scheme subscription released");
        }
    }
}

/// Subscription to fullscreen changes.
#[derive(Debug)]
pub struct FullscreenWatcher {
    receiver: Option<watch::Receiver<bool>>,
}

impl FullscreenWatcher {
    /// Waits for the next change. Returns `None` once unsubscribed or when
    /// the host is gone.
    pub async fn changed(&mut self) -> Option<bool> {
        let receiver = self.receiver.as_mut()?;
        receiver.changed().await.ok()?;
        Some(*receiver.borrow_and_update())
    }

    pub fn is_subscribed(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!("Fullscreen subscription released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_color_scheme_change_reaches_watcher() {
        let host = Host::new(ThemeMode::Light, true);
        let mut watcher = host.watch_color_scheme();

        host.set_color_scheme(ThemeMode::Dark);

        assert_eq!(watcher.changed().await, Some(ThemeMode::Dark));
    }

    #[test]
    fn test_unsubscribe_and_drop_release_receivers() {
        let host = Host::default();
        let mut theme = host.watch_color_scheme();
        let fullscreen = host.watch_fullscreen();
        assert_eq!(host.color_scheme_subscribers(), 1);
        assert_eq!(host.fullscreen_subscribers(), 1);

        theme.unsubscribe();
        drop(fullscreen);

        assert!(!theme.is_subscribed());
        assert_eq!(host.color_scheme_subscribers(), 0);
        assert_eq!(host.fullscreen_subscribers(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribed_watcher_yields_none() {
        let host = Host::default();
        let mut watcher = host.watch_fullscreen();
        watcher.unsubscribe();

        host.set_fullscreen(true);
        assert_eq!(watcher.changed().await, None);
    }

    #[test]
    fn test_unsupported_fullscreen() {
        let host = Host::new(ThemeMode::Light, false);
        assert!(host.request_fullscreen().is_err());
        assert!(!host.is_fullscreen());
    }
}
