//! SetDefault FSM (§4.C): issue a factory reset, await the radio's completion frame. The
//! controller wipes the node cache and persisted blob on success and restores the previous cache
//! on failure — that side effect lives in `controller.rs`, since only it holds the cache.

use super::FUNC_SET_DEFAULT;
use crate::error::{Result, ZnetError};

pub struct SetDefault {
    deadline_ms: u64,
}

impl SetDefault {
    pub fn start(now_ms: u64, timeout_ms: u64) -> Self {
        Self {
            deadline_ms: now_ms + timeout_ms,
        }
    }

    /// The outbound request frame.
    pub fn request_frame() -> Vec<u8> {
        vec![FUNC_SET_DEFAULT]
    }

    /// Whether an inbound function frame is this FSM's completion.
    pub fn matches(payload: &[u8]) -> bool {
        payload.first() == Some(&FUNC_SET_DEFAULT)
    }

    /// `payload` is `[FUNC_SET_DEFAULT, status]`; `status == 0` is success.
    pub fn on_frame(payload: &[u8]) -> Result<()> {
        match payload.get(1) {
            Some(0) => Ok(()),
            Some(&status) => Err(ZnetError::RadioError(status)),
            None => Err(ZnetError::ShortFrame { have: payload.len(), need: 2 }),
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_completes_ok() {
        assert_eq!(SetDefault::on_frame(&[FUNC_SET_DEFAULT, 0]), Ok(()));
    }

    #[test]
    fn nonzero_status_is_a_radio_error() {
        assert_eq!(SetDefault::on_frame(&[FUNC_SET_DEFAULT, 7]), Err(ZnetError::RadioError(7)));
    }
}
