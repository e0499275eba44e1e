use thiserror::Error;
use crate::{GpioError, GpioResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum TryGetSingleError {
    #[error("collection is empty")]
    Empty,
    #[error("collection has more than one item")]
    MoreThanOne,
}

pub trait CollectionExt {
    type Item;

    fn try_get_single(&self) -> Result<&Self::Item, TryGetSingleError>;
}

impl <T> CollectionExt for [T] {
    type Item = T;

    fn try_get_single(&self) -> Result<&T, TryGetSingleError> {
        match self.len() {
            0 => Err(TryGetSingleError::Empty),
            1 => Ok(&self[0]),
            _ => Err(TryGetSingleError::MoreThanOne),
        }
    }
}

/// Parses a list of `N` line numbers separated by commas, spaces or semicolons.
///
/// # Errors
/// - `GpioError::InvalidArgument` if a number is malformed or there are not exactly `N`.
pub fn parse_pin_bus<const N: usize>(pin_str: &str) -> GpioResult<[usize; N]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| GpioError::InvalidArgument)?
        .try_into()
        .map_err(|_| GpioError::InvalidArgument)
}
