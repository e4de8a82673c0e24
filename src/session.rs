//! Session Table (§4.B): pending request-reply records, their timeouts, and routing of inbound
//! reports (single-shot or multi-part) back to the caller.
//!
//! Grounded on the "array of fixed-capacity trailing records" idiom used throughout the original
//! header for node/command-class lists (§9): the table is a bounded `Vec`, capacity enforced at
//! [`SessionTable::open`] rather than left to grow unbounded.

use crate::codec::CommandClass;
use crate::error::{Result, ZnetError};
use crate::ids::{EndpointId, NodeId};

/// What a session's callback is told as its request progresses.
pub enum SessionEvent {
    /// One report segment (the whole payload for a single-shot operation, or one of several for
    /// a multi-part operation).
    Segment(Vec<u8>),
    /// Delivered after the last segment of a multi-part operation, with no payload (§4.D).
    Done,
}

pub type SessionCallback = Box<dyn FnMut(Result<SessionEvent>)>;

struct Session {
    node: NodeId,
    endpoint: EndpointId,
    class: CommandClass,
    multi_part: bool,
    deadline_ms: u64,
    callback: SessionCallback,
}

/// Pending request-reply records, keyed by `(node, endpoint, class)` (§4.B matching rules).
pub struct SessionTable {
    max_sessions: usize,
    sessions: Vec<Session>,
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions,
            sessions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn find(&self, node: NodeId, endpoint: EndpointId, class: CommandClass) -> Option<usize> {
        self.sessions
            .iter()
            .position(|s| s.node == node && s.endpoint == endpoint && s.class == class)
    }

    /// Open a new pending record. Fails with `Busy` if an identical `(node, endpoint, class)`
    /// request is already outstanding (this port's fast-fail decision for the "duplicate in-flight
    /// request" open question, §9) or if the table is at capacity.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        class: CommandClass,
        multi_part: bool,
        now_ms: u64,
        timeout_ms: u64,
        callback: SessionCallback,
    ) -> Result<()> {
        if self.find(node, endpoint, class).is_some() {
            log::debug!(
                "znet: duplicate in-flight request for node {} endpoint {} class {:?}, fast-failing",
                node.get(),
                endpoint.get(),
                class
            );
            return Err(ZnetError::Busy);
        }
        if self.sessions.len() >= self.max_sessions {
            log::warn!("znet: session table full ({} entries)", self.max_sessions);
            return Err(ZnetError::Busy);
        }
        self.sessions.push(Session {
            node,
            endpoint,
            class,
            multi_part,
            deadline_ms: now_ms + timeout_ms,
            callback,
        });
        Ok(())
    }

    /// Route an inbound report segment to its waiting session. `more_follow` is the caller's
    /// interpretation of the command-class's own "reports to follow" field; when false, the
    /// session completes and is removed after the segment is delivered. Returns whether a session
    /// matched (an unmatched report is the caller's cue to treat it as unsolicited, §4.B).
    pub fn deliver(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        class: CommandClass,
        payload: Vec<u8>,
        more_follow: bool,
    ) -> bool {
        let Some(index) = self.find(node, endpoint, class) else {
            return false;
        };
        (self.sessions[index].callback)(Ok(SessionEvent::Segment(payload)));
        if !more_follow {
            let mut session = self.sessions.remove(index);
            (session.callback)(Ok(SessionEvent::Done));
        }
        true
    }

    /// Fail a pending session directly (radio-reported error, etc). Returns whether one matched.
    pub fn fail(&mut self, node: NodeId, endpoint: EndpointId, class: CommandClass, err: ZnetError) -> bool {
        let Some(index) = self.find(node, endpoint, class) else {
            return false;
        };
        let mut session = self.sessions.remove(index);
        (session.callback)(Err(err));
        true
    }

    /// Scan for expired records and fail them with `SessionTimeout` (§4.B, called from the
    /// controller's periodic `proc` tick).
    pub fn expire_timeouts(&mut self, now_ms: u64) {
        let mut i = 0;
        while i < self.sessions.len() {
            if self.sessions[i].deadline_ms <= now_ms {
                let mut session = self.sessions.remove(i);
                log::debug!(
                    "znet: session for node {} class {:?} timed out",
                    session.node.get(),
                    session.class
                );
                (session.callback)(Err(ZnetError::SessionTimeout));
            } else {
                i += 1;
            }
        }
    }

    /// Drain every pending session with `Cancelled`, used by a controller-wide reset (§4.B, §5).
    pub fn cancel_all(&mut self) {
        for mut session in self.sessions.drain(..) {
            (session.callback)(Err(ZnetError::Cancelled));
        }
    }

    /// Whether `(node, endpoint, class)` is currently marked multi-part (used by callers that need
    /// to re-check after `deliver`, e.g. logging).
    pub fn is_multi_part(&self, node: NodeId, endpoint: EndpointId, class: CommandClass) -> bool {
        self.find(node, endpoint, class)
            .map(|i| self.sessions[i].multi_part)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn node(id: u8) -> NodeId {
        NodeId::new(id).unwrap()
    }

    #[test]
    fn single_shot_session_completes_on_one_segment() {
        let mut table = SessionTable::new(8);
        let events = Rc::new(RefCell::new(Vec::new()));
        let events_clone = events.clone();
        table
            .open(
                node(5),
                EndpointId::root(),
                CommandClass::Basic,
                false,
                0,
                1000,
                Box::new(move |ev| {
                    events_clone.borrow_mut().push(ev.is_ok());
                }),
            )
            .unwrap();

        let matched = table.deliver(node(5), EndpointId::root(), CommandClass::Basic, vec![1], false);
        assert!(matched);
        assert!(table.is_empty());
        assert_eq!(events.borrow().len(), 2); // Segment + Done
    }

    #[test]
    fn duplicate_request_fast_fails() {
        let mut table = SessionTable::new(8);
        table
            .open(node(5), EndpointId::root(), CommandClass::Basic, false, 0, 1000, Box::new(|_| {}))
            .unwrap();
        let err = table
            .open(node(5), EndpointId::root(), CommandClass::Basic, false, 0, 1000, Box::new(|_| {}))
            .unwrap_err();
        assert_eq!(err, ZnetError::Busy);
    }

    #[test]
    fn multi_part_session_stays_open_until_last_segment() {
        let mut table = SessionTable::new(8);
        let count = Rc::new(RefCell::new(0));
        let count_clone = count.clone();
        table
            .open(
                node(5),
                EndpointId::root(),
                CommandClass::Configuration,
                true,
                0,
                1000,
                Box::new(move |_| *count_clone.borrow_mut() += 1),
            )
            .unwrap();

        table.deliver(node(5), EndpointId::root(), CommandClass::Configuration, vec![1], true);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(table.len(), 1);

        table.deliver(node(5), EndpointId::root(), CommandClass::Configuration, vec![2], false);
        assert_eq!(*count.borrow(), 3); // second segment + Done
        assert!(table.is_empty());
    }

    #[test]
    fn expired_sessions_fail_with_timeout() {
        let mut table = SessionTable::new(8);
        let got_timeout = Rc::new(RefCell::new(false));
        let got_timeout_clone = got_timeout.clone();
        table
            .open(
                node(5),
                EndpointId::root(),
                CommandClass::Basic,
                false,
                0,
                100,
                Box::new(move |ev| {
                    *got_timeout_clone.borrow_mut() = matches!(ev, Err(ZnetError::SessionTimeout));
                }),
            )
            .unwrap();
        table.expire_timeouts(200);
        assert!(*got_timeout.borrow());
        assert!(table.is_empty());
    }

    #[test]
    fn cancel_all_fails_everything_with_cancelled() {
        let mut table = SessionTable::new(8);
        let cancelled = Rc::new(RefCell::new(0));
        for id in [5u8, 6] {
            let cancelled_clone = cancelled.clone();
            table
                .open(
                    node(id),
                    EndpointId::root(),
                    CommandClass::Basic,
                    false,
                    0,
                    1000,
                    Box::new(move |ev| {
                        if matches!(ev, Err(ZnetError::Cancelled)) {
                            *cancelled_clone.borrow_mut() += 1;
                        }
                    }),
                )
                .unwrap();
        }
        table.cancel_all();
        assert_eq!(*cancelled.borrow(), 2);
        assert!(table.is_empty());
    }
}
