use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use coroa_types::events::GatewayEvent;

/// Routes gateway events to connected users.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user send channels: user_id -> (conn_id, sender). Newest connection wins.
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user channel. Returns (conn_id, receiver).
    pub async fn register_user_channel(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send an event to a user. Returns false if the user is not connected.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let channels = self.inner.user_channels.read().await;
        match channels.get(&user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_registered_user_only() {
        let dispatcher = Dispatcher::new();
        let ana = Uuid::new_v4();
        let bia = Uuid::new_v4();
        let (_, mut rx) = dispatcher.register_user_channel(ana).await;

        assert!(dispatcher.send_to_user(ana, GatewayEvent::PremiumUpdate { is_premium: true }).await);
        assert!(!dispatcher.send_to_user(bia, GatewayEvent::PremiumUpdate { is_premium: true }).await);

        match rx.recv().await {
            Some(GatewayEvent::PremiumUpdate { is_premium }) => assert!(is_premium),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_connection_does_not_unregister_newer_one() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (new_conn, _new_rx) = dispatcher.register_user_channel(user).await;

        let ping = || GatewayEvent::PremiumUpdate { is_premium: false };

        dispatcher.unregister_user_channel(user, old_conn).await;
        assert!(dispatcher.send_to_user(user, ping()).await);

        dispatcher.unregister_user_channel(user, new_conn).await;
        assert!(!dispatcher.send_to_user(user, ping()).await);
    }
}
