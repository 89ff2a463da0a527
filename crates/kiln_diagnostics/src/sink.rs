//! Caller-supplied capture buffer for build logs.

use std::sync::{Arc, Mutex, MutexGuard};

/// A shared, thread-safe buffer that receives the full build log.
///
/// The caller keeps one clone and hands another to the build through its
/// compile options. After the build returns, successfully or not, the
/// caller's clone holds the log text of that build. Each build replaces the
/// previous content rather than appending to it.
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    text: Arc<Mutex<String>>,
}

impl LogSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the captured log with `log`.
    pub fn set(&self, log: &str) {
        let mut text = self.lock();
        text.clear();
        text.push_str(log);
    }

    /// Returns a copy of the captured log.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    /// Returns `true` if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        // A panic while holding the lock leaves a valid String behind.
        self.text.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sink() {
        let sink = LogSink::new();
        assert!(sink.is_empty());
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn clones_share_contents() {
        let sink = LogSink::new();
        let handle = sink.clone();
        handle.set("1:3:34: error: oops");
        assert_eq!(sink.contents(), "1:3:34: error: oops");
    }

    #[test]
    fn set_replaces_previous_log() {
        let sink = LogSink::new();
        sink.set("first build");
        sink.set("second build");
        assert_eq!(sink.contents(), "second build");
    }

    #[test]
    fn thread_safety() {
        use std::thread;

        let sink = LogSink::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = sink.clone();
            handles.push(thread::spawn(move || sink.set(&format!("build {i}"))));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(sink.contents().starts_with("build "));
    }
}
