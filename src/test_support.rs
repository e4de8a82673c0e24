//! An in-memory [`Callbacks`] implementation used by this crate's own test suite and available to
//! downstream integration tests that want to simulate a radio without real hardware.

use std::collections::VecDeque;

use crate::callbacks::Callbacks;
use crate::error::Result;

/// A fake host: an in-memory uart loopback plus an in-memory blob store.
///
/// Time advances by a fixed step on every `now_ms()` call so that a test never has to sleep for a
/// real timeout to elapse.
pub struct FakeHost {
    clock_ms: u64,
    clock_step_ms: u64,
    inbound: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    blob: Vec<u8>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            clock_ms: 0,
            clock_step_ms: 50,
            inbound: VecDeque::new(),
            written: Vec::new(),
            blob: Vec::new(),
        }
    }

    /// Queue bytes as if the radio had just written them to the serial port.
    pub fn queue_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Number of separate `uart_write` calls observed so far (one per frame or control byte).
    pub fn written_frames(&self) -> usize {
        self.written.len()
    }

    pub fn last_written(&self) -> Option<Vec<u8>> {
        self.written.last().cloned()
    }

    pub fn all_written(&self) -> &[Vec<u8>] {
        &self.written
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Callbacks for FakeHost {
    fn now_ms(&mut self) -> u64 {
        self.clock_ms += self.clock_step_ms;
        self.clock_ms
    }

    fn uart_write(&mut self, data: &[u8]) -> Result<usize> {
        self.written.push(data.to_vec());
        Ok(data.len())
    }

    fn uart_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn store_save(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if self.blob.len() < offset + data.len() {
            self.blob.resize(offset + data.len(), 0);
        }
        self.blob[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn store_load(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.blob.get(offset + i).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn store_reset(&mut self, reserve: usize) -> Result<()> {
        self.blob.clear();
        self.blob.resize(reserve, 0);
        Ok(())
    }
}
