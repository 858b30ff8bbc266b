use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    deadline: Option<Instant>,
}

/// Transient notifications with time-based dismissal. Each toast expires
/// after the tray's timeout unless pushed as sticky.
pub struct ToastTray {
    toasts: Vec<Toast>,
    timeout: Duration,
}

impl ToastTray {
    pub fn new(timeout: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            timeout,
        }
    }

    pub fn push(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toasts.push(Toast {
            level,
            message: message.into(),
            deadline: Some(Instant::now() + self.timeout),
        });
    }

    /// Sticky toasts stay until dismissed explicitly.
    pub fn push_sticky(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toasts.push(Toast {
            level,
            message: message.into(),
            deadline: None,
        });
    }

    /// Drops expired toasts. Returns true when anything was removed, so the
    /// caller knows a redraw is due.
    pub fn prune(&mut self) -> bool {
        self.prune_at(Instant::now())
    }

    fn prune_at(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        self.toasts
            .retain(|toast| toast.deadline.map_or(true, |deadline| deadline > now));
        self.toasts.len() != before
    }

    pub fn dismiss_all(&mut self) {
        self.toasts.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_toasts_are_pruned() {
        let mut tray = ToastTray::new(Duration::from_millis(50));
        tray.push(ToastLevel::Info, "saved");
        assert!(!tray.is_empty());

        let later = Instant::now() + Duration::from_millis(100);
        assert!(tray.prune_at(later));
        assert!(tray.is_empty());
    }

    #[test]
    fn fresh_toasts_survive_prune() {
        let mut tray = ToastTray::new(Duration::from_secs(4));
        tray.push(ToastLevel::Error, "failed");
        assert!(!tray.prune_at(Instant::now()));
        assert_eq!(tray.iter().count(), 1);
    }

    #[test]
    fn sticky_toasts_outlive_the_timeout() {
        let mut tray = ToastTray::new(Duration::from_millis(1));
        tray.push_sticky(ToastLevel::Info, "read me");
        let later = Instant::now() + Duration::from_secs(60);
        assert!(!tray.prune_at(later));
        tray.dismiss_all();
        assert!(tray.is_empty());
    }
}
