//! Host-side controller library for a Z-Wave style mesh radio network: serial framing/transport,
//! a command-class codec, a session table for request/reply matching, a persisted node cache, and
//! the controller-wide inclusion/exclusion/listing state machines.
//!
//! The entry point is [`Controller`]: construct one with [`Controller::init`] over a host-provided
//! [`Callbacks`] implementation, drive it from [`Controller::proc`], and call its per-command-class
//! methods to talk to nodes.

pub mod cache;
pub mod callbacks;
pub mod codec;
pub mod controller;
pub mod error;
pub mod fsm;
pub mod ids;
pub mod params;
pub mod session;
pub mod test_support;
pub mod transport;
pub mod wire;

pub use cache::{EndpointRecord, NodeRecord};
pub use callbacks::Callbacks;
pub use controller::Controller;
pub use error::{Result, ZnetError};
pub use fsm::ControllerState;
pub use ids::{EndpointId, NodeId};
pub use params::Parameters;
