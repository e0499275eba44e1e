//! The digits dialed so far, and the rule deciding whether they name a recording.

use thiserror::Error;
use crate::utils::WithinExt;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum PushError {
    #[error("only digits can be part of a filename")]
    NotADigit,
    #[error("filename is already at its maximum length")]
    Full,
}

/// A bounded buffer of dialed digits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilenameBuffer {
    digits: String,
    capacity: usize,
}

impl FilenameBuffer {
    /// Creates an empty buffer, or `None` if `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(FilenameBuffer {
            digits: String::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends a digit. The buffer is left untouched on error.
    pub fn push(&mut self, key: char) -> Result<(), PushError> {
        if !key.is_ascii_digit() {
            return Err(PushError::NotADigit);
        }
        if self.is_full() {
            return Err(PushError::Full);
        }
        self.digits.push(key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }
}

/// Length rule a filename has to pass before it is played or recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FilenamePolicy {
    pub max_len: usize,
    /// Whether the filename must be exactly `max_len` digits long.
    pub must_be_max: bool,
}

impl FilenamePolicy {
    pub fn accepts(&self, filename: &FilenameBuffer) -> bool {
        if self.must_be_max {
            filename.len() == self.max_len
        } else {
            filename.len().within(1..=self.max_len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(capacity: usize, digits: &str) -> FilenameBuffer {
        let mut buffer = FilenameBuffer::new(capacity).unwrap();
        for digit in digits.chars() {
            buffer.push(digit).unwrap();
        }
        buffer
    }

    #[test]
    fn zero_capacity_is_refused() {
        assert_eq!(FilenameBuffer::new(0), None);
    }

    #[test]
    fn only_digits_are_appended() {
        let mut buffer = buffer_with(4, "12");

        assert_eq!(buffer.push('#'), Err(PushError::NotADigit));
        assert_eq!(buffer.push('A'), Err(PushError::NotADigit));
        assert_eq!(buffer.as_str(), "12");
    }

    #[test]
    fn full_buffer_does_not_grow() {
        let mut buffer = buffer_with(3, "123");

        assert!(buffer.is_full());
        assert_eq!(buffer.push('4'), Err(PushError::Full));
        assert_eq!(buffer.as_str(), "123");
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn bounded_policy_accepts_up_to_max() {
        let policy = FilenamePolicy { max_len: 10, must_be_max: false };

        assert!(!policy.accepts(&buffer_with(10, "")));
        assert!(policy.accepts(&buffer_with(10, "12345")));
        assert!(policy.accepts(&buffer_with(10, "1234567890")));
    }

    #[test]
    fn exact_policy_needs_max() {
        let policy = FilenamePolicy { max_len: 4, must_be_max: true };

        assert!(!policy.accepts(&buffer_with(4, "12")));
        assert!(policy.accepts(&buffer_with(4, "1234")));
    }
}
