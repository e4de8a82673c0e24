//! The host callback vtable.
//!
//! The original C library takes a `znet_callbacks_t` struct of function pointers plus an opaque
//! `void* arg`. The idiomatic Rust replacement is a boxed trait object: the "opaque argument" the
//! design notes call out is just whatever state the implementor's closures/fields capture, so it
//! never needs to be modeled explicitly (§9 "Opaque callback argument").
//!
//! `now_ms` and the uart/store methods are mandatory (the trait has no default implementation for
//! them); `uart_reset` is optional and defaults to a no-op, matching "missing optional callbacks
//! cause the corresponding result to be silently dropped (still logged)" (§6) — here, resync simply
//! skips the hardware reset and logs that it did.

use crate::error::Result;

/// Host-provided ports the core drives the radio and persists state through.
///
/// Logging is not part of this trait: it goes through the `log` crate facade instead, so any host
/// application wires its preferred sink (`env_logger`, `simplelog`, ...) independently of this
/// trait, rather than supplying a `fn(level, fmt, args)` callback.
pub trait Callbacks {
    /// Monotonic milliseconds since an arbitrary epoch. Must never go backwards.
    fn now_ms(&mut self) -> u64;

    /// Write `data` to the serial port. Returns the number of bytes actually written.
    fn uart_write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read up to `buf.len()` bytes from the serial port without blocking. Returns the number of
    /// bytes read (`0` if none are available).
    fn uart_read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reset/flush the uart after repeated framing failures. Optional: default is a no-op.
    fn uart_reset(&mut self) -> Result<()> {
        log::warn!("znet: uart_reset requested but no uart_reset callback is installed");
        Ok(())
    }

    /// Persist `data` at `offset` in the opaque blob.
    fn store_save(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Load `buf.len()` bytes from `offset` in the opaque blob. Offsets beyond the end of the
    /// stored image must be filled with zero bytes (the "store-load contract", §4.E).
    fn store_load(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Discard the persisted blob, reserving `reserve` bytes of fresh (zeroed) storage.
    fn store_reset(&mut self, reserve: usize) -> Result<()>;
}
