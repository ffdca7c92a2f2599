//! Capabilities the core uses to reach the host application

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use log::{info, warn};

/// Host services available to the viewer and renderers
pub trait Notifier: Send + Sync {
    /// Shows a transient message to the user
    fn post_alert(&self, message: &str);
    /// Asks for a new frame to be drawn
    fn request_redraw(&self);
}

/// Notifier that only writes to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn post_alert(&self, message: &str) {
        warn!("{message}");
    }

    fn request_redraw(&self) {}
}

/// Pending alerts, drained by the UI each frame
#[derive(Debug, Default)]
pub struct AlertQueue {
    alerts: Mutex<VecDeque<String>>,
    redraw: AtomicBool,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<String> {
        match self.alerts.lock() {
            Ok(mut alerts) => alerts.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().map_or(0, |alerts| alerts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns and clears the pending redraw request
    pub fn take_redraw_request(&self) -> bool {
        self.redraw.swap(false, Ordering::Relaxed)
    }
}

impl Notifier for AlertQueue {
    fn post_alert(&self, message: &str) {
        info!("Alert: {message}");
        match self.alerts.lock() {
            Ok(mut alerts) => alerts.push_back(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push_back(message.to_string()),
        }
        self.redraw.store(true, Ordering::Relaxed);
    }

    fn request_redraw(&self) {
        self.redraw.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_queue_drains_in_order() {
        let queue = AlertQueue::new();
        queue.post_alert("first");
        queue.post_alert("second");
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain(), vec!["first".to_string(), "second".to_string()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_redraw_request_is_taken_once() {
        let queue = AlertQueue::new();
        assert!(!queue.take_redraw_request());
        queue.request_redraw();
        assert!(queue.take_redraw_request());
        assert!(!queue.take_redraw_request());
    }
}
