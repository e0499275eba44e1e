//! Keypad decoders.
//!
//! Every decoder hands out one key per physical press; see [Keypad::poll_key].
mod matrix;
mod stream;

use std::fmt::Debug;
use crate::GpioResult;
pub use matrix::*;
pub use stream::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Makes one attempt at reading a key.
    ///
    /// May block until there is activity on the device. Returns `Ok(None)` when the
    /// attempt produced no symbol (contact bounce, end of stream, ...); the caller
    /// is expected to simply poll again.
    fn poll_key(&mut self) -> GpioResult<Option<Self::Key>>;

    /// Blocks until a key is read.
    fn next_key(&mut self) -> GpioResult<Self::Key> {
        loop {
            if let Some(key) = self.poll_key()? {
                return Ok(key);
            }
        }
    }
}
