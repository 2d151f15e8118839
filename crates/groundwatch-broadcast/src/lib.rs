//! Live-feed fan-out for the Groundwatch incident backend.
//!
//! The [`Broadcaster`] holds the registry of WebSocket connections and
//! delivers published incident events to every connection subscribed to
//! the event's channel. Delivery is best-effort per connection: queues
//! are bounded, and one slow or dead consumer never stalls the rest.
//!
//! # Modules
//!
//! - [`broadcaster`] -- The connection registry and publish path.

pub mod broadcaster;

pub use broadcaster::{Broadcaster, ConnectionId};
