//! RemoveNode FSM (§4.C): symmetric to AddNode for exclusion. Exposes an explicit `break` that
//! cancels the exclusion window if no node has presented itself yet.

use super::{FUNC_NODE_REMOVED, FUNC_REMOVE_NODE_START, FUNC_REMOVE_NODE_STOP};
use crate::error::{Result, ZnetError};
use crate::ids::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AwaitingNode,
    AwaitingStopAck,
}

pub struct RemoveNode {
    step: Step,
    deadline_ms: u64,
    removed: Option<NodeId>,
}

impl RemoveNode {
    pub fn start(now_ms: u64, timeout_ms: u64) -> Self {
        Self {
            step: Step::AwaitingNode,
            deadline_ms: now_ms + timeout_ms,
            removed: None,
        }
    }

    pub fn request_frame() -> Vec<u8> {
        vec![FUNC_REMOVE_NODE_START]
    }

    /// The frame sent by an explicit `break` call before any node has presented itself.
    pub fn break_frame() -> Vec<u8> {
        vec![FUNC_REMOVE_NODE_STOP]
    }

    pub fn matches(&self, payload: &[u8]) -> bool {
        match self.step {
            Step::AwaitingNode => payload.first() == Some(&FUNC_NODE_REMOVED),
            Step::AwaitingStopAck => payload.first() == Some(&FUNC_REMOVE_NODE_STOP),
        }
    }

    /// `payload` is `[FUNC_NODE_REMOVED, node_id]`.
    pub fn on_node_removed(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() < 2 {
            return Err(ZnetError::ShortFrame { have: payload.len(), need: 2 });
        }
        self.removed = Some(NodeId::new(payload[1])?);
        self.step = Step::AwaitingStopAck;
        Ok(vec![FUNC_REMOVE_NODE_STOP])
    }

    /// `payload` is `[FUNC_REMOVE_NODE_STOP, status]`.
    pub fn on_stop_frame(self, payload: &[u8]) -> Result<Option<NodeId>> {
        match payload.get(1) {
            Some(0) => Ok(self.removed),
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
    fn node_removed_then_stop_yields_its_id() {
        let mut fsm = RemoveNode::start(0, 1000);
        let stop_frame = fsm.on_node_removed(&[FUNC_NODE_REMOVED, 9]).unwrap();
        assert_eq!(stop_frame, vec![FUNC_REMOVE_NODE_STOP]);
        let removed = fsm.on_stop_frame(&[FUNC_REMOVE_NODE_STOP, 0]).unwrap();
        assert_eq!(removed, Some(NodeId::new(9).unwrap()));
    }

    #[test]
    fn break_before_any_node_completes_with_no_id() {
        let fsm = RemoveNode::start(0, 1000);
        assert_eq!(RemoveNode::break_frame(), vec![FUNC_REMOVE_NODE_STOP]);
        let removed = fsm.on_stop_frame(&[FUNC_REMOVE_NODE_STOP, 0]).unwrap();
        assert_eq!(removed, None);
    }
}
