//! The transport state machine: retransmission, ack/nack/can handling, and contention resolution
//! on top of the wire framing in [`crate::wire`] (§4.A).
//!
//! Two entry points upward, matching the spec exactly:
//! - [`Transport::send`] is blocking-capable: it returns only once the frame has been acked or has
//!   permanently failed (after the retry budget is exhausted).
//! - [`Transport::pump`] is non-blocking: it delivers at most one already-arrived frame per call.

use std::collections::VecDeque;

use crate::callbacks::Callbacks;
use crate::error::{Result, ZnetError};
use crate::params::Parameters;
use crate::wire::{Frame, ACK, CAN, NACK, SOF};

pub struct Transport {
    params: Parameters,
    rx_buf: Vec<u8>,
    /// Frames fully received while we were waiting for our own ACK (contention, "host loses").
    inbox: VecDeque<Frame>,
    /// Number of retransmits performed by the most recent (or in-progress) `send`.
    last_retry_count: u32,
}

impl Transport {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            rx_buf: Vec::new(),
            inbox: VecDeque::new(),
            last_retry_count: 0,
        }
    }

    /// Number of retransmits the most recent `send` call needed.
    pub fn last_retry_count(&self) -> u32 {
        self.last_retry_count
    }

    /// Send `frame`, blocking (bounded by the retry budget) until it is acked.
    ///
    /// On exhausting the retry budget this performs a hard resync (uart flush + optional
    /// `uart_reset`) and returns `Err(RetriesExhausted)`.
    pub fn send(&mut self, cb: &mut dyn Callbacks, frame: &Frame) -> Result<()> {
        self.last_retry_count = 0;
        let bytes = frame.encode();

        for attempt in 0..self.params.max_send_attempts {
            if attempt > 0 {
                self.last_retry_count += 1;
                log::debug!("znet: retransmitting frame (attempt {})", attempt + 1);
            }

            cb.uart_write(&bytes)?;

            match self.await_ack(cb)? {
                AwaitOutcome::Acked => return Ok(()),
                AwaitOutcome::Retry => continue,
            }
        }

        log::warn!(
            "znet: exhausted {} send attempts, resynchronizing",
            self.params.max_send_attempts
        );
        self.rx_buf.clear();
        cb.uart_reset()?;
        Err(ZnetError::RetriesExhausted)
    }

    /// Wait (bounded by `ack_timeout`) for ACK, NACK, CAN, or a contending inbound frame.
    fn await_ack(&mut self, cb: &mut dyn Callbacks) -> Result<AwaitOutcome> {
        let deadline = cb.now_ms() + self.params.ack_timeout.as_millis() as u64;

        loop {
            self.fill_rx_buf(cb)?;

            if let Some(&first) = self.rx_buf.first() {
                match first {
                    ACK => {
                        self.rx_buf.remove(0);
                        return Ok(AwaitOutcome::Acked);
                    }
                    NACK => {
                        log::debug!("znet: peer NACKed frame");
                        self.rx_buf.remove(0);
                        return Ok(AwaitOutcome::Retry);
                    }
                    CAN => {
                        log::debug!("znet: peer CANcelled (contention)");
                        self.rx_buf.remove(0);
                        return Ok(AwaitOutcome::Retry);
                    }
                    SOF => {
                        // Host-loses contention rule: service the inbound frame to completion,
                        // then retry our own send.
                        log::debug!("znet: contention, servicing inbound frame before retry");
                        self.service_one_inbound(cb)?;
                        return Ok(AwaitOutcome::Retry);
                    }
                    _ => {
                        // Garbage byte, discard and keep waiting.
                        self.rx_buf.remove(0);
                    }
                }
            }

            if cb.now_ms() >= deadline {
                log::debug!("znet: ack timeout");
                return Ok(AwaitOutcome::Retry);
            }
        }
    }

    /// Non-blocking: deliver at most one already-arrived frame. Drains any frame captured during
    /// send-time contention before reading more bytes off the wire.
    pub fn pump(&mut self, cb: &mut dyn Callbacks) -> Result<Option<Frame>> {
        if let Some(frame) = self.inbox.pop_front() {
            return Ok(Some(frame));
        }

        self.fill_rx_buf(cb)?;
        self.take_one_frame(cb)
    }

    /// Read whatever bytes are currently available off the uart into `rx_buf`.
    fn fill_rx_buf(&mut self, cb: &mut dyn Callbacks) -> Result<()> {
        let mut buf = [0u8; 256];
        loop {
            let n = cb.uart_read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            self.rx_buf.extend_from_slice(&buf[..n]);
        }
    }

    /// Blocking helper used only from contention handling in `await_ack`: keep reading until a
    /// full frame assembles (or the ack timeout elapses), ack/nack it, and push it to the inbox.
    fn service_one_inbound(&mut self, cb: &mut dyn Callbacks) -> Result<()> {
        let deadline = cb.now_ms() + self.params.ack_timeout.as_millis() as u64;
        loop {
            if self.take_one_frame(cb)?.map(|f| self.inbox.push_back(f)).is_some() {
                return Ok(());
            }
            if cb.now_ms() >= deadline {
                // Peer never completed the frame; give up servicing it and let the normal pump
                // path pick up any remaining bytes later.
                return Ok(());
            }
            self.fill_rx_buf(cb)?;
        }
    }

    /// Discard bytes until a start-of-frame marker, then attempt to decode one frame out of
    /// `rx_buf`. Emits ACK on success, NACK on checksum failure, and consumes the bytes either
    /// way. Returns `Ok(None)` if the buffer doesn't yet hold a complete frame.
    fn take_one_frame(&mut self, cb: &mut dyn Callbacks) -> Result<Option<Frame>> {
        while let Some(&b) = self.rx_buf.first() {
            if b == SOF {
                break;
            }
            self.rx_buf.remove(0);
        }

        if self.rx_buf.is_empty() {
            return Ok(None);
        }

        match Frame::decode_body(&self.rx_buf[1..]) {
            Ok(frame) => {
                let consumed = frame.encoded_len();
                self.rx_buf.drain(0..consumed);
                cb.uart_write(&[ACK])?;
                Ok(Some(frame))
            }
            Err(ZnetError::ChecksumMismatch) => {
                log::warn!("znet: checksum mismatch, dropping frame");
                // We don't know the true frame length (the length byte may itself be corrupt), so
                // drop everything we have and let resynchronization happen on the next SOF.
                self.rx_buf.clear();
                cb.uart_write(&[NACK])?;
                Ok(None)
            }
            Err(ZnetError::ShortFrame { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

enum AwaitOutcome {
    Acked,
    Retry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;
    use crate::wire::FrameType;

    #[test]
    fn send_succeeds_on_first_ack() {
        let mut host = FakeHost::new();
        host.queue_inbound(&[ACK]);
        let mut t = Transport::new(Parameters::default());
        let frame = Frame::new(FrameType::Request, vec![0x25, 0x01, 0xFF]);
        t.send(&mut host, &frame).unwrap();
        assert_eq!(t.last_retry_count(), 0);
        assert_eq!(host.written_frames(), 1);
    }

    #[test]
    fn nack_then_ack_retries_once() {
        let mut host = FakeHost::new();
        host.queue_inbound(&[NACK]);
        host.queue_inbound(&[ACK]);
        let mut t = Transport::new(Parameters::default());
        let frame = Frame::new(FrameType::Request, vec![0x20, 0x02]);
        t.send(&mut host, &frame).unwrap();
        assert_eq!(t.last_retry_count(), 1);
        assert_eq!(host.written_frames(), 2);
    }

    #[test]
    fn exhausting_retries_reports_failure() {
        let mut host = FakeHost::new();
        let mut t = Transport::new(Parameters::default());
        let frame = Frame::new(FrameType::Request, vec![0x20, 0x02]);
        let err = t.send(&mut host, &frame).unwrap_err();
        assert_eq!(err, ZnetError::RetriesExhausted);
    }

    #[test]
    fn pump_delivers_one_well_formed_frame() {
        let mut host = FakeHost::new();
        let frame = Frame::new(FrameType::Response, vec![0x25, 0x03, 0xFF]);
        host.queue_inbound(&frame.encode());
        let mut t = Transport::new(Parameters::default());
        let got = t.pump(&mut host).unwrap().expect("frame");
        assert_eq!(got, frame);
        assert_eq!(host.last_written(), Some(vec![ACK]));
    }
}
