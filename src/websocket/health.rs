//! Periodic connection health sweep.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::websocket::registry::ConnectionRegistry;

/// Sweeps the registry on a fixed period, evicting connections whose last
/// activity is older than the idle threshold. This is the only mechanism
/// that forcibly terminates a live channel.
pub struct HealthMonitor {
    registry: ConnectionRegistry,
    sweep_interval: Duration,
    idle_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        registry: ConnectionRegistry,
        sweep_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sweep_interval,
            idle_timeout,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.sweep_interval);
            // The immediate first tick would sweep an empty registry
            interval.tick().await;

            loop {
                interval.tick().await;
                let evicted = self.registry.evict_idle(self.idle_timeout);
                let stats = self.registry.stats();

                if evicted.is_empty() {
                    tracing::debug!(
                        active = stats.active,
                        customers = stats.customers,
                        maids = stats.maids,
                        admins = stats.admins,
                        "health sweep: all connections within threshold"
                    );
                } else {
                    tracing::info!(
                        evicted = evicted.len(),
                        active = stats.active,
                        "health sweep evicted idle connections"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::websocket::registry::Outbound;
    use tokio::sync::mpsc::unbounded_channel;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_monitor_evicts_only_past_threshold() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = unbounded_channel();
        let user_id = Uuid::new_v4();
        registry.register(user_id, Uuid::new_v4(), "m".into(), UserRole::Maid, tx);

        // Within the threshold nothing is evicted
        assert!(registry.evict_idle(Duration::from_secs(60)).is_empty());
        assert!(registry.is_live(user_id));

        tokio::time::sleep(Duration::from_millis(25)).await;
        let evicted = registry.evict_idle(Duration::from_millis(10));
        assert_eq!(evicted, vec![user_id]);
        assert!(matches!(rx.try_recv().unwrap(), Outbound::Close { .. }));
        assert_eq!(registry.stats().active, 0);
    }

    #[tokio::test]
    async fn test_ping_within_window_prevents_eviction() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let user_id = Uuid::new_v4();
        registry.register(user_id, Uuid::new_v4(), "c".into(), UserRole::Customer, tx);

        tokio::time::sleep(Duration::from_millis(25)).await;
        registry.touch(user_id);

        assert!(registry.evict_idle(Duration::from_millis(20)).is_empty());
        assert!(registry.is_live(user_id));
    }

    #[tokio::test]
    async fn test_spawned_monitor_sweeps() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();
        registry.register(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "c".into(),
            UserRole::Customer,
            tx,
        );

        let handle = HealthMonitor::new(
            registry.clone(),
            Duration::from_millis(10),
            Duration::from_millis(5),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.stats().active, 0);
        handle.abort();
    }
}
