//! Event routing: live push plus offline persistence.
//!
//! Push and persistence are two independent, best-effort operations. A push
//! into a closed channel is skipped silently; a persistence failure is
//! logged and never undoes a push already sent. Notification delivery is a
//! side effect of the triggering business action, never its transactional
//! partner.

use uuid::Uuid;

use crate::error::AppResult;
use crate::metrics;
use crate::models::{NewNotification, RoleClass};
use crate::store::{EventStore, NotificationStore};
use crate::websocket::frames::EventFrame;
use crate::websocket::registry::ConnectionRegistry;

/// Addressing for a single delivery
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeliveryTarget {
    /// One identity: push if live, persist exactly one copy either way
    User(Uuid),
    /// Every current member of the role (persisted) and every live member
    /// of the class (pushed) — deliberately different sets
    Role(RoleClass),
    /// Every live connection; transient, never persisted
    All,
}

/// What a `deliver` call actually did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliveryOutcome {
    pub pushed: usize,
    pub persisted: usize,
}

#[derive(Clone)]
pub struct NotificationRouter<S: EventStore = NotificationStore> {
    store: S,
    registry: ConnectionRegistry,
}

impl<S: EventStore> NotificationRouter<S> {
    pub fn new(store: S, registry: ConnectionRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deliver one event to a target. Push happens before persistence inside
    /// the same call, so a single caller's sequential submissions reach a
    /// recipient in submission order.
    pub async fn deliver(
        &self,
        event: NewNotification,
        target: DeliveryTarget,
    ) -> AppResult<DeliveryOutcome> {
        let frame = EventFrame::from_notification(&event).to_json();

        match target {
            DeliveryTarget::User(user_id) => self.deliver_to_user(user_id, &event, &frame).await,
            DeliveryTarget::Role(class) => self.deliver_to_role(class, &event, &frame).await,
            DeliveryTarget::All => {
                let pushed = self.registry.broadcast_all(&frame);
                metrics::record_pushed(pushed);
                tracing::debug!(
                    event_type = event.event_type.as_str(),
                    pushed,
                    "global broadcast delivered (not persisted)"
                );
                Ok(DeliveryOutcome {
                    pushed,
                    persisted: 0,
                })
            }
        }
    }

    async fn deliver_to_user(
        &self,
        user_id: Uuid,
        event: &NewNotification,
        frame: &str,
    ) -> AppResult<DeliveryOutcome> {
        let pushed = self.registry.send_to_user(user_id, frame);
        if pushed {
            metrics::record_pushed(1);
        }

        match self.store.insert(user_id, event, pushed).await {
            Ok(_) => {
                metrics::record_persisted(1);
                Ok(DeliveryOutcome {
                    pushed: usize::from(pushed),
                    persisted: 1,
                })
            }
            Err(e) if pushed => {
                // The live push already went out; durability is best-effort
                tracing::error!(
                    recipient = %user_id,
                    event_type = event.event_type.as_str(),
                    error = %e,
                    "failed to persist pushed notification"
                );
                Ok(DeliveryOutcome {
                    pushed: 1,
                    persisted: 0,
                })
            }
            // Recipient offline and nothing persisted: the event is lost,
            // surface that to the caller
            Err(e) => Err(e),
        }
    }

    async fn deliver_to_role(
        &self,
        class: RoleClass,
        event: &NewNotification,
        frame: &str,
    ) -> AppResult<DeliveryOutcome> {
        let pushed = self.registry.broadcast_role(class, frame);
        metrics::record_pushed(pushed);

        // Persistence targets role membership, not liveness; offline members
        // replay the event after reconnecting.
        let members = match self.store.user_ids_with_roles(class.member_roles()).await {
            Ok(members) => members,
            Err(e) if pushed > 0 => {
                // Live pushes already went out; durability stays best-effort
                tracing::error!(
                    ?class,
                    event_type = event.event_type.as_str(),
                    error = %e,
                    "failed to load role membership after live pushes"
                );
                return Ok(DeliveryOutcome {
                    pushed,
                    persisted: 0,
                });
            }
            Err(e) => return Err(e),
        };
        let live: std::collections::HashSet<Uuid> =
            self.registry.live_members(class).into_iter().collect();

        let mut persisted = 0usize;
        for member_id in members {
            let delivered = live.contains(&member_id);
            match self.store.insert(member_id, event, delivered).await {
                Ok(_) => persisted += 1,
                Err(e) => {
                    tracing::error!(
                        recipient = %member_id,
                        event_type = event.event_type.as_str(),
                        error = %e,
                        "failed to persist role broadcast copy"
                    );
                }
            }
        }
        metrics::record_persisted(persisted);

        tracing::debug!(
            event_type = event.event_type.as_str(),
            ?class,
            pushed,
            persisted,
            "role broadcast delivered"
        );

        Ok(DeliveryOutcome { pushed, persisted })
    }
}
