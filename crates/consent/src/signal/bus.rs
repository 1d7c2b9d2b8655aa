use std::collections::VecDeque;

use tokio::sync::broadcast;

use super::{DataLayer, DataLayerMessage};
use crate::error::{ConsentError, Result};

/// Data layer that fans every message out to broadcast subscribers.
///
/// The queue is append-only: every message ever pushed is kept, and a new
/// subscriber first replays that history in push order before receiving
/// live messages. A subscriber attached after startup still sees the
/// default directive first.
pub struct BusDataLayer {
    sender: broadcast::Sender<DataLayerMessage>,
    history: Vec<DataLayerMessage>,
}

impl BusDataLayer {
    /// `capacity` bounds how far a live subscriber may fall behind.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConsentError::InvalidInput(
                "data layer bus capacity must be greater than zero".to_string(),
            ));
        }
        let (sender, _) = broadcast::channel(capacity);
        Ok(Self {
            sender,
            history: Vec::new(),
        })
    }

    pub fn history(&self) -> &[DataLayerMessage] {
        &self.history
    }

    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            backlog: self.history.iter().cloned().collect(),
            receiver: self.sender.subscribe(),
        }
    }
}

impl DataLayer for BusDataLayer {
    fn push(&mut self, message: DataLayerMessage) -> Result<()> {
        self.history.push(message.clone());
        // No live subscribers is fine; later ones replay the history.
        let _ = self.sender.send(message);
        Ok(())
    }
}

/// One subscriber's view of the queue: history first, then live messages.
pub struct BusSubscription {
    backlog: VecDeque<DataLayerMessage>,
    receiver: broadcast::Receiver<DataLayerMessage>,
}

impl BusSubscription {
    pub async fn recv(&mut self) -> Result<DataLayerMessage> {
        if let Some(message) = self.backlog.pop_front() {
            return Ok(message);
        }
        self.receiver
            .recv()
            .await
            .map_err(|error| ConsentError::Signal(format!("data layer subscription: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionState;
    use crate::signal::ConsentCommand;
    use tokio::time::{timeout, Duration};

    fn test_message() -> DataLayerMessage {
        DataLayerMessage::ConsentStateUpdated {
            state: PermissionState::all_granted(),
        }
    }

    fn default_directive() -> DataLayerMessage {
        DataLayerMessage::Consent(ConsentCommand::Default {
            state: PermissionState::policy_default(),
            wait_for_update_ms: 500,
        })
    }

    #[tokio::test]
    async fn push_and_receive_message() {
        let mut bus = BusDataLayer::new(8).expect("bus");
        let mut rx = bus.subscribe();

        bus.push(test_message()).expect("push");

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("recv");
        assert_eq!(received, test_message());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_message() {
        let mut bus = BusDataLayer::new(8).expect("bus");
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.push(test_message()).expect("push");

        assert_eq!(rx1.recv().await.expect("recv1"), test_message());
        assert_eq!(rx2.recv().await.expect("recv2"), test_message());
    }

    #[tokio::test]
    async fn late_subscriber_replays_history_in_order() {
        let mut bus = BusDataLayer::new(4).expect("bus");
        bus.push(default_directive()).expect("push default");

        let mut rx = bus.subscribe();
        bus.push(test_message()).expect("push update");

        assert_eq!(rx.recv().await.expect("first"), default_directive());
        let second = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("second");
        assert_eq!(second, test_message());
        assert_eq!(bus.history().len(), 2);
    }

    #[test]
    fn push_without_subscribers_is_kept() {
        let mut bus = BusDataLayer::new(4).expect("bus");
        assert!(bus.push(test_message()).is_ok());
        assert_eq!(bus.history(), &[test_message()]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            BusDataLayer::new(0),
            Err(ConsentError::InvalidInput(_))
        ));
    }
}
