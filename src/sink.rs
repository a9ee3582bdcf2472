use std::sync::mpsc;

use crate::error::ErrorKind;

/// Destination for a finished job, typically the digest row on the
/// property page. `set_text`/`set_error` are called once, from the worker
/// thread.
pub trait ResultSink: Send + Sync {
    /// Row caption such as `MD5sum:`, set from the starting thread before the
    /// worker exists.
    fn set_label(&self, _label: &str) {}
    fn set_text(&self, text: &str);
    fn set_error(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Label(String),
    Text(String),
    Error(String),
}

/// Forwards sink calls to a channel the UI thread drains from its own loop.
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SinkEvent>) -> Self {
        Self { tx }
    }

    pub fn pair() -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl ResultSink for ChannelSink {
    fn set_label(&self, label: &str) {
        let _ = self.tx.send(SinkEvent::Label(label.to_string()));
    }

    fn set_text(&self, text: &str) {
        let _ = self.tx.send(SinkEvent::Text(text.to_string()));
    }

    fn set_error(&self, message: &str) {
        let _ = self.tx.send(SinkEvent::Error(message.to_string()));
    }
}

/// Text shown in place of a digest when the job failed.
pub fn error_text(err: &ErrorKind) -> String {
    match err {
        ErrorKind::IoFailure { message, .. } => format!("- ({message})"),
        other => format!("- ({other})"),
    }
}
