use tokio::sync::mpsc;

use crate::models::{Notice, NoticeLevel};

/// Receives user-facing diagnostics from the intake
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Logs notices; the default when no host notifier is configured
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Error => {
                tracing::warn!("{}: {}", notice.title, notice.description)
            }
            NoticeLevel::Success | NoticeLevel::Info => {
                tracing::info!("{}: {}", notice.title, notice.description)
            }
        }
    }
}

/// Forwards notices into a channel, e.g. for a UI layer to render
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: &Notice) {
        if self.tx.send(notice.clone()).is_err() {
            tracing::debug!("Notice receiver dropped: {}", notice.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectReason;

    #[test]
    fn test_channel_notifier_forwards() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let notice = Notice::rejected(
            RejectReason::TooLarge,
            "File too large",
            "a.png exceeds the maximum size of 1MB.".to_string(),
        );
        notifier.notify(&notice);
        notifier.notify(&Notice::upload_complete("a.png"));

        assert_eq!(rx.try_recv().unwrap(), notice);
        let done = rx.try_recv().unwrap();
        assert_eq!(done.level, NoticeLevel::Success);
        assert_eq!(done.description, "a.png has been successfully uploaded.");
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(&Notice::upload_complete("a.png"));
    }
}
