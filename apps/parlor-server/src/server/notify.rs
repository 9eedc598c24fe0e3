use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc, RwLock};

use parlor_core::AccountId;
use parlor_protocol::{envelope_for, Envelope, RoomNotification};

/// Live-connection collaborator. Delivery transport (WebSocket, push) is
/// out of scope; this keeps one bounded mpsc queue per connected account
/// and drops events for absent or saturated connections.
#[derive(Clone)]
pub(crate) struct RoomNotifier {
    connections: Arc<RwLock<HashMap<AccountId, mpsc::Sender<Envelope<RoomNotification>>>>>,
    queue_capacity: usize,
}

impl RoomNotifier {
    pub(crate) fn new(queue_capacity: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Attach a live connection for an account, replacing any prior one.
    pub(crate) async fn register(
        &self,
        account_id: AccountId,
    ) -> mpsc::Receiver<Envelope<RoomNotification>> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.connections.write().await.insert(account_id, tx);
        rx
    }

    /// Best-effort send. A missing, closed, or saturated connection is not
    /// an error.
    pub(crate) async fn notify(&self, account_id: AccountId, notification: RoomNotification) {
        let Ok(envelope) = envelope_for(&notification) else {
            tracing::error!(event = "notify.envelope", account_id = %account_id, "event type rejected");
            return;
        };
        let connections = self.connections.read().await;
        let Some(sender) = connections.get(&account_id) else {
            return;
        };
        if sender.try_send(envelope).is_err() {
            tracing::debug!(event = "notify.drop", account_id = %account_id);
        }
    }

    /// Alert and then detach an account's live connection.
    pub(crate) async fn close_connection(&self, account_id: AccountId) {
        self.notify(account_id, RoomNotification::ConnectionClose)
            .await;
        self.connections.write().await.remove(&account_id);
    }
}
