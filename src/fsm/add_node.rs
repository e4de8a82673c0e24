//! AddNode FSM (§4.C): start inclusion, await a Node Found frame carrying the new node's NIF
//! (id + basic/generic/specific class + supported command classes), stop inclusion.

use super::{FUNC_ADD_NODE_START, FUNC_ADD_NODE_STOP, FUNC_NODE_FOUND};
use crate::cache::NodeRecord;
use crate::error::{Result, ZnetError};
use crate::ids::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AwaitingNode,
    AwaitingStopAck,
}

pub struct AddNode {
    step: Step,
    deadline_ms: u64,
    found: Option<NodeRecord>,
}

impl AddNode {
    pub fn start(now_ms: u64, timeout_ms: u64) -> Self {
        Self {
            step: Step::AwaitingNode,
            deadline_ms: now_ms + timeout_ms,
            found: None,
        }
    }

    pub fn request_frame() -> Vec<u8> {
        vec![FUNC_ADD_NODE_START]
    }

    pub fn matches(&self, payload: &[u8]) -> bool {
        match self.step {
            Step::AwaitingNode => payload.first() == Some(&FUNC_NODE_FOUND),
            Step::AwaitingStopAck => payload.first() == Some(&FUNC_ADD_NODE_STOP),
        }
    }

    /// `payload` is `[FUNC_NODE_FOUND, node_id, basic, generic, specific, cc_count, cc...]`.
    /// Returns the stop-inclusion request frame to send next; the FSM isn't done until that stop
    /// is acked (see [`AddNode::on_stop_frame`]).
    pub fn on_node_found(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() < 6 {
            return Err(ZnetError::ShortFrame { have: payload.len(), need: 6 });
        }
        let id = NodeId::new(payload[1])?;
        let mut record = NodeRecord::new(id, payload[2], payload[3], payload[4]);
        let cc_count = payload[5] as usize;
        let need = 6 + cc_count;
        if payload.len() < need {
            return Err(ZnetError::ShortFrame { have: payload.len(), need });
        }
        record.command_classes = payload[6..need].to_vec();
        self.found = Some(record);
        self.step = Step::AwaitingStopAck;
        Ok(vec![FUNC_ADD_NODE_STOP])
    }

    /// `payload` is `[FUNC_ADD_NODE_STOP, status]`.
    pub fn on_stop_frame(self, payload: &[u8]) -> Result<NodeRecord> {
        match payload.get(1) {
            Some(0) => self.found.ok_or(ZnetError::RadioError(0xFF)),
            Some(&status) => Err(ZnetError::RadioError(status)),
            None => Err(ZnetError::ShortFrame { have: payload.len(), need: 2 }),
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms
    }

    pub fn awaiting_node(&self) -> bool {
        self.step == Step::AwaitingNode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_found_then_stop_yields_the_record() {
        let mut fsm = AddNode::start(0, 1000);
        let stop_frame = fsm
            .on_node_found(&[FUNC_NODE_FOUND, 5, 4, 0x10, 0x01, 2, 0x20, 0x25])
            .unwrap();
        assert_eq!(stop_frame, vec![FUNC_ADD_NODE_STOP]);

        let record = fsm.on_stop_frame(&[FUNC_ADD_NODE_STOP, 0]).unwrap();
        assert_eq!(record.id, NodeId::new(5).unwrap());
        assert_eq!(record.command_classes, vec![0x20, 0x25]);
    }

    #[test]
    fn failed_stop_status_is_surfaced() {
        let mut fsm = AddNode::start(0, 1000);
        fsm.on_node_found(&[FUNC_NODE_FOUND, 5, 4, 0x10, 0x01, 0]).unwrap();
        let err = fsm.on_stop_frame(&[FUNC_ADD_NODE_STOP, 3]).unwrap_err();
        assert_eq!(err, ZnetError::RadioError(3));
    }
}
