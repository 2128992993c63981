//! Real-time channel chat core, synchronized across server instances.
//!
//! Many connected clients exchange messages scoped to named channels; a
//! shared pub/sub bus (Redis in production) keeps delivery and membership
//! changes consistent across independent instances. Every message and
//! membership update round-trips through the bus — even on the instance
//! that produced it — so each channel has one bus-defined order everywhere.
//!
//! This crate is the concurrent core only. Authentication, HTTP routing, and
//! persistence live in the embedding application, which:
//!
//! 1. authenticates the client and loads its memberships (see
//!    [`repositories::Repository`]),
//! 2. hands the upgraded WebSocket to [`HubHandle::connect`],
//! 3. announces newly persisted memberships with
//!    [`HubHandle::announce_membership`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use chathub::{Config, Hub, RedisBus};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), chathub::HubError> {
//! let config = Config::from_env()?;
//! let bus = Arc::new(RedisBus::new(&config.redis_url)?);
//! let hub = Hub::spawn(config, bus).await;
//! // hand `hub` to the ws upgrade handler; on upgrade:
//! // hub.connect(identity, memberships, socket).await
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod repositories;

pub use bus::{Bus, MemoryBus, RedisBus};
pub use config::{Config, OverflowPolicy};
pub use error::{HubError, HubResult};
pub use hub::{ChannelTransport, Hub, HubHandle, SessionTransport};
pub use models::{Channel, Identity, Membership, Message};
pub use repositories::{MemoryRepository, Repository};
