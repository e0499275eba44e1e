use std::fmt::{Debug, Formatter};
use std::io::Read;
use std::thread;
use std::time::Duration;
use log::{debug, trace};
use crate::GpioResult;
use crate::keypad::Keypad;

/// A keypad surrogate reading one byte at a time from a stream, typically a USB keyboard on stdin.
///
/// ASCII letters are reported upper-case. Whitespace and control bytes, like the Enter
/// typed after a key, are not keys.
pub struct StreamKeypad<R: Read> {
    input: R,
    /// Delay after a read that produced nothing, so a closed stream does not spin.
    pub idle_interval: Duration,
}

impl <R: Read> StreamKeypad<R> {
    pub fn new(input: R) -> Self {
        StreamKeypad {
            input,
            idle_interval: Duration::from_millis(10),
        }
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    fn idle(&self) {
        if !self.idle_interval.is_zero() {
            thread::sleep(self.idle_interval);
        }
    }
}

impl <R: Read> Debug for StreamKeypad<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StreamKeypad")
    }
}

impl <R: Read> Keypad for StreamKeypad<R> {
    type Key = char;

    fn poll_key(&mut self) -> GpioResult<Option<char>> {
        let mut byte = [0u8; 1];
        match self.input.read(&mut byte) {
            Ok(1) if byte[0].is_ascii_whitespace() || byte[0].is_ascii_control() => {
                trace!("Skipping byte {:#04x}.", byte[0]);
                Ok(None)
            }
            Ok(1) => {
                let key = (byte[0] as char).to_ascii_uppercase();
                trace!("Key {:?}.", key);
                Ok(Some(key))
            }
            Ok(_) => {
                self.idle();
                Ok(None)
            }
            Err(err) => {
                debug!("Reading a key failed: {}", err);
                self.idle();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[derive(Debug)]
    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    fn keypad(input: &[u8]) -> StreamKeypad<Cursor<Vec<u8>>> {
        StreamKeypad::new(Cursor::new(input.to_vec())).with_idle_interval(Duration::ZERO)
    }

    #[test]
    fn bytes_become_keys() {
        let mut keypad = keypad(b"12*p");

        assert_eq!(keypad.next_key(), Ok('1'));
        assert_eq!(keypad.next_key(), Ok('2'));
        assert_eq!(keypad.next_key(), Ok('*'));
        assert_eq!(keypad.next_key(), Ok('P'));
    }

    #[test]
    fn nul_and_end_of_stream_yield_no_symbol() {
        let mut keypad = keypad(b"\x007");

        assert_eq!(keypad.poll_key(), Ok(None));
        assert_eq!(keypad.poll_key(), Ok(Some('7')));
        assert_eq!(keypad.poll_key(), Ok(None));
        assert_eq!(keypad.poll_key(), Ok(None));
    }

    #[test]
    fn line_endings_and_spaces_are_skipped() {
        let mut keypad = keypad(b"R\r\n \t4\n");

        assert_eq!(keypad.poll_key(), Ok(Some('R')));
        for _ in 0..4 {
            assert_eq!(keypad.poll_key(), Ok(None));
        }
        assert_eq!(keypad.next_key(), Ok('4'));
    }

    #[test]
    fn read_errors_yield_no_symbol() {
        let mut keypad = StreamKeypad::new(BrokenInput).with_idle_interval(Duration::ZERO);

        assert_eq!(keypad.poll_key(), Ok(None));
        assert_eq!(keypad.poll_key(), Ok(None));
    }
}
