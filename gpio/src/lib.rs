pub mod gpiod;
pub mod keypad;
pub mod utils;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("line already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// The electrical level of a GPIO line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn is_low(self) -> bool {
        self == Level::Low
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

/// Specifies the bias of the GPIO line.
///
/// Matrix keypad rows need a pull-up so an idle row reads high.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the GPIO lines at the given indices as one bus.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if any index is out of range.
    /// - `GpioError::AlreadyInUse` if any line is already claimed.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

pub trait GpioBus<const N: usize>: Debug {
    /// Requests the bus lines as inputs.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    /// Requests the bus lines as outputs.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn supports_bias(&self) -> bool {
        false
    }
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias applied when the lines are requested.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend has no bias control.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
    fn with_bias(mut self, bias: GpioBias) -> GpioResult<Self>
    where
        Self: Sized,
    {
        self.set_bias(bias)?;
        Ok(self)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    /// Reads the raw levels of the bus lines, `true` being high.
    fn read(&self) -> GpioResult<[bool; N]>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    /// Drives the bus lines, `true` being high.
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}
