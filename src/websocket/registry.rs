use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{RoleClass, UserRole};

/// Close code sent when the handshake fails
pub const CLOSE_AUTH_FAILED: u16 = 4401;
/// Close code sent when the health monitor evicts an idle connection
pub const CLOSE_IDLE_TIMEOUT: u16 = 4408;
/// Close code sent to a connection displaced by a newer one for the same identity
pub const CLOSE_REPLACED: u16 = 4409;

/// Commands flowing from the registry to a session's write half
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialized frame to write to the socket
    Frame(String),
    /// Close the socket with a policy code
    Close { code: u16, reason: &'static str },
}

pub type PushSender = mpsc::UnboundedSender<Outbound>;

struct Connection {
    /// Distinguishes this binding from a replacement for the same identity,
    /// so a stale session teardown cannot remove its successor.
    session_id: Uuid,
    sender: PushSender,
    role: UserRole,
    name: String,
    last_activity: Instant,
}

#[derive(Default)]
struct RegistryInner {
    /// Global membership: at most one live connection per identity
    connections: HashMap<Uuid, Connection>,
    /// Per-identity lookup for targeted maid delivery
    maids: HashMap<Uuid, PushSender>,
    /// Per-identity lookup for targeted customer delivery
    customers: HashMap<Uuid, PushSender>,
    /// Admin-class group; only ever addressed as a set
    admins: HashMap<Uuid, PushSender>,
    total_ever_connected: u64,
}

/// Aggregate connection statistics
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegistryStats {
    pub active: usize,
    pub customers: usize,
    pub maids: usize,
    pub admins: usize,
    pub total_ever_connected: u64,
}

/// In-process registry of live, authenticated WebSocket connections.
///
/// Partitioned by role class for group addressing. Every lifecycle
/// transition (bind, unbind, eviction) mutates all containers under one
/// write guard, so concurrent readers never observe a half-updated state.
/// Never persisted: a restart drops all entries and offline replay is
/// served from the notification store.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an authenticated channel under its identity and role class.
    ///
    /// A prior binding for the same identity is replaced (and told to close);
    /// the registry never holds two entries for one identity.
    pub fn register(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        name: String,
        role: UserRole,
        sender: PushSender,
    ) {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        if let Some(previous) = inner.connections.remove(&user_id) {
            let _ = previous.sender.send(Outbound::Close {
                code: CLOSE_REPLACED,
                reason: "replaced by a newer connection",
            });
            Self::remove_from_class(&mut inner, user_id, previous.role);
        }

        match role.role_class() {
            RoleClass::Customers => {
                inner.customers.insert(user_id, sender.clone());
            }
            RoleClass::Maids => {
                inner.maids.insert(user_id, sender.clone());
            }
            RoleClass::Admins => {
                inner.admins.insert(user_id, sender.clone());
            }
        }

        inner.connections.insert(
            user_id,
            Connection {
                session_id,
                sender,
                role,
                name,
                last_activity: Instant::now(),
            },
        );
        inner.total_ever_connected += 1;

        crate::metrics::set_active_connections(inner.connections.len());
    }

    /// Unbind on close or transport error. No-op when `session_id` does not
    /// match the live binding (a replacement already won the slot).
    pub fn unregister(&self, user_id: Uuid, session_id: Uuid) {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        let matches = inner
            .connections
            .get(&user_id)
            .map(|c| c.session_id == session_id)
            .unwrap_or(false);
        if !matches {
            return;
        }

        if let Some(connection) = inner.connections.remove(&user_id) {
            Self::remove_from_class(&mut inner, user_id, connection.role);
        }

        crate::metrics::set_active_connections(inner.connections.len());
    }

    fn remove_from_class(inner: &mut RegistryInner, user_id: Uuid, role: UserRole) {
        match role.role_class() {
            RoleClass::Customers => {
                inner.customers.remove(&user_id);
            }
            RoleClass::Maids => {
                inner.maids.remove(&user_id);
            }
            RoleClass::Admins => {
                inner.admins.remove(&user_id);
            }
        }
    }

    /// Refresh the liveness timestamp on an inbound application ping.
    pub fn touch(&self, user_id: Uuid) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(connection) = inner.connections.get_mut(&user_id) {
            connection.last_activity = Instant::now();
        }
    }

    /// Push a frame to a single identity. Returns whether a live channel
    /// existed; a closed channel counts as no push attempt.
    pub fn send_to_user(&self, user_id: Uuid, frame: &str) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        match inner.connections.get(&user_id) {
            Some(connection) => connection
                .sender
                .send(Outbound::Frame(frame.to_string()))
                .is_ok(),
            None => false,
        }
    }

    /// Push a frame to every live connection of a role class. Dead channels
    /// are silently skipped. Returns the number of push attempts.
    pub fn broadcast_role(&self, class: RoleClass, frame: &str) -> usize {
        let inner = self.inner.read().expect("registry lock poisoned");
        let container = match class {
            RoleClass::Customers => &inner.customers,
            RoleClass::Maids => &inner.maids,
            RoleClass::Admins => &inner.admins,
        };
        container
            .values()
            .filter(|sender| sender.send(Outbound::Frame(frame.to_string())).is_ok())
            .count()
    }

    /// Push a frame to every live connection.
    pub fn broadcast_all(&self, frame: &str) -> usize {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .connections
            .values()
            .filter(|c| c.sender.send(Outbound::Frame(frame.to_string())).is_ok())
            .count()
    }

    /// Identities of this class that are live right now.
    pub fn live_members(&self, class: RoleClass) -> Vec<Uuid> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let container = match class {
            RoleClass::Customers => &inner.customers,
            RoleClass::Maids => &inner.maids,
            RoleClass::Admins => &inner.admins,
        };
        container.keys().copied().collect()
    }

    pub fn is_live(&self, user_id: Uuid) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.connections.contains_key(&user_id)
    }

    /// Display name of a live connection, for health snapshots and logs.
    pub fn display_name(&self, user_id: Uuid) -> Option<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.connections.get(&user_id).map(|c| c.name.clone())
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read().expect("registry lock poisoned");
        RegistryStats {
            active: inner.connections.len(),
            customers: inner.customers.len(),
            maids: inner.maids.len(),
            admins: inner.admins.len(),
            total_ever_connected: inner.total_ever_connected,
        }
    }

    /// Evict every connection idle longer than `idle_timeout`.
    ///
    /// Each eviction removes the identity from all containers and sends a
    /// policy close down its channel, all within one sweep-wide write guard.
    /// Returns the evicted identities.
    pub fn evict_idle(&self, idle_timeout: Duration) -> Vec<Uuid> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let now = Instant::now();

        let stale: Vec<Uuid> = inner
            .connections
            .iter()
            .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
            .map(|(id, _)| *id)
            .collect();

        for user_id in &stale {
            if let Some(connection) = inner.connections.remove(user_id) {
                let _ = connection.sender.send(Outbound::Close {
                    code: CLOSE_IDLE_TIMEOUT,
                    reason: "idle timeout",
                });
                Self::remove_from_class(&mut inner, *user_id, connection.role);
            }
        }

        if !stale.is_empty() {
            crate::metrics::set_active_connections(inner.connections.len());
        }

        stale
    }
}
