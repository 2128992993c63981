//! The concurrent core: hub actor, connection sessions, and membership
//! propagation.

pub mod actor;
pub mod propagator;
pub mod session;

pub use actor::{Hub, HubHandle};
pub use session::{
    ChannelTransport, FrameSink, FrameStream, SessionTransport, WsFrameSink, WsFrameStream,
};
