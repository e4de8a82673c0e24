//! Library tunables.
//!
//! Grounded on the teacher crate's `parameters::Parameters`/`recommended` split: a `Default` impl
//! supplies recommended values, a caller may override any field before `Controller::init`.

use std::time::Duration;

/// Recommended values, analogous to the teacher's `parameters::recommended` module.
pub mod recommended {
    use std::time::Duration;

    pub const ACK_TIMEOUT: Duration = Duration::from_millis(1500);
    pub const MAX_SEND_ATTEMPTS: u8 = 3;
    pub const SESSION_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MULTI_PART_SESSION_TIMEOUT: Duration = Duration::from_secs(10);
    pub const INCLUSION_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_SESSIONS: usize = 32;
    pub const MAX_COMMAND_CLASSES_PER_NODE: usize = 35;
}

/// Tunable parameters for the transport, session table, and controller FSMs.
#[derive(Debug, Clone, Copy)]
pub struct Parameters {
    /// How long the transport waits for an ACK before retransmitting.
    pub ack_timeout: Duration,
    /// Number of send attempts (first send + retransmits) before reporting failure upward.
    pub max_send_attempts: u8,
    /// Deadline for a single-shot session (Get-style requests with one report).
    pub session_timeout: Duration,
    /// Deadline for a multi-part session (Name/Info/Properties/Bulk/EndpointFind).
    pub multi_part_session_timeout: Duration,
    /// Deadline for the AddNode/RemoveNode inclusion window.
    pub inclusion_timeout: Duration,
    /// Bound on the number of simultaneously pending session records.
    pub max_sessions: usize,
    /// Bound on the number of command classes recorded per node (§3 Node record invariant).
    pub max_command_classes_per_node: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            ack_timeout: recommended::ACK_TIMEOUT,
            max_send_attempts: recommended::MAX_SEND_ATTEMPTS,
            session_timeout: recommended::SESSION_TIMEOUT,
            multi_part_session_timeout: recommended::MULTI_PART_SESSION_TIMEOUT,
            inclusion_timeout: recommended::INCLUSION_TIMEOUT,
            max_sessions: recommended::MAX_SESSIONS,
            max_command_classes_per_node: recommended::MAX_COMMAND_CLASSES_PER_NODE,
        }
    }
}
