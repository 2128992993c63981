//! Domain and wire types shared across the hub.

pub mod membership;
pub mod message;

pub use membership::{Channel, Identity, Membership};
pub use message::Message;
