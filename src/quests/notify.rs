use log::trace;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Change notifications for presentation layers. Consumers re-query as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// One logical quest mutation (single or batch) changed stored progress.
    QuestsChanged,
    /// Objective flag changed; `index` is -1 when every objective of the quest was cleared.
    ObjectiveChanged {
        quest_key: String,
        index: i32,
        completed: bool,
    },
    /// Objective flag changed for an objective known only by catalog id.
    ObjectiveIdChanged { objective_id: String, completed: bool },
    /// Every objective flag of every quest was cleared.
    ObjectivesCleared,
}

/// Fan-out of [`ProgressEvent`]s to any number of subscribers.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ProgressEvent>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Deliver `event` to every live subscriber, dropping closed ones.
    pub fn notify(&self, event: ProgressEvent) {
        trace!("Progress event: {:?}", event);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_reaches_every_subscriber() {
        let notifier = ChangeNotifier::new();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        notifier.notify(ProgressEvent::QuestsChanged);
        assert_eq!(first.try_recv().ok(), Some(ProgressEvent::QuestsChanged));
        assert_eq!(second.try_recv().ok(), Some(ProgressEvent::QuestsChanged));
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let notifier = ChangeNotifier::new();
        let rx = notifier.subscribe();
        let _live = notifier.subscribe();
        drop(rx);
        notifier.notify(ProgressEvent::QuestsChanged);
        assert_eq!(notifier.subscriber_count(), 1);
    }
}
