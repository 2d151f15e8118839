//! Connection registry with channel-filtered fan-out.
//!
//! Each registered connection gets its own bounded queue. Publishing
//! serializes the envelope once, then offers it to every connection whose
//! filter covers the envelope's channel. A connection that cannot keep up
//! has the new message dropped for it alone; a connection whose receiver
//! is gone is pruned from the registry. Publishing never blocks and never
//! fails because of any one consumer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use groundwatch_types::{BroadcastEnvelope, Channel};
use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Opaque handle identifying one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live connection: its outbound queue and channel filter.
#[derive(Debug)]
struct Connection {
    /// Sender half of the connection's bounded outbound queue.
    tx: mpsc::Sender<String>,
    /// Channels this connection wants; `None` means all of them.
    channels: Option<BTreeSet<Channel>>,
}

impl Connection {
    fn wants(&self, channel: Channel) -> bool {
        self.channels.as_ref().is_none_or(|set| set.contains(&channel))
    }
}

/// Registry of live connections and the publish path over them.
#[derive(Debug)]
pub struct Broadcaster {
    /// Outbound queue capacity handed to each new connection.
    queue_capacity: usize,
    /// Source of connection ids, monotonically increasing.
    next_id: AtomicU64,
    /// Live connections keyed by id.
    connections: RwLock<BTreeMap<ConnectionId, Connection>>,
}

impl Broadcaster {
    /// Create a registry whose connections buffer up to `queue_capacity`
    /// undelivered messages each.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            next_id: AtomicU64::new(0),
            connections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a new connection and hand back its id and the receiving
    /// end of its queue.
    ///
    /// A fresh connection has no filter, so it receives every channel
    /// until it subscribes.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut connections = self.connections.write().await;
        connections.insert(id, Connection { tx, channels: None });
        debug!(connection = %id, total = connections.len(), "connection registered");
        (id, rx)
    }

    /// Replace a connection's channel filter.
    ///
    /// `None` and an empty list both mean "receive everything". Returns
    /// false if the connection is no longer registered.
    pub async fn subscribe(&self, id: ConnectionId, channels: Option<Vec<Channel>>) -> bool {
        let normalized = channels
            .filter(|list| !list.is_empty())
            .map(|list| list.into_iter().collect::<BTreeSet<_>>());
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            debug!(connection = %id, channels = ?normalized, "subscription updated");
            connection.channels = normalized;
            true
        } else {
            false
        }
    }

    /// Remove a connection from the registry. Safe to call more than
    /// once; removing an unknown id is a no-op.
    pub async fn unregister(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.remove(&id).is_some() {
            debug!(connection = %id, total = connections.len(), "connection unregistered");
        }
    }

    /// Serialize `envelope` once and offer it to every connection whose
    /// filter covers its channel. Returns how many queues accepted it.
    ///
    /// Connections with full queues miss this message; connections whose
    /// receiver has been dropped are pruned.
    pub async fn publish(&self, envelope: &BroadcastEnvelope) -> usize {
        let payload = match serde_json::to_string(envelope) {
            Ok(json) => json,
            Err(error) => {
                warn!(%error, "failed to serialize broadcast envelope");
                return 0;
            }
        };

        let mut delivered = 0_usize;
        let mut closed = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, connection) in connections.iter() {
                if !connection.wants(envelope.channel) {
                    continue;
                }
                match connection.tx.try_send(payload.clone()) {
                    Ok(()) => delivered = delivered.saturating_add(1),
                    Err(TrySendError::Full(_)) => {
                        debug!(
                            connection = %id,
                            channel = ?envelope.channel,
                            "queue full, dropping broadcast for slow consumer"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in closed {
                connections.remove(&id);
            }
        }

        delivered
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
