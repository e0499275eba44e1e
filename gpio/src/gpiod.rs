//! GPIO backend on top of the Linux GPIO character device, through the gpiod library.
use crate::{GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// GpiodDriver hands out buses of lines from one gpiochip.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_lines: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_lines: BitVec::repeat(false, n),
        }
    }

    /// Opens the chip at `path`, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path.as_ref())?;
        debug!("Opened {} ({} lines).", chip.name(), chip.num_lines());
        Ok(Self::new(chip))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        let n = self.count()?;

        if indices.iter().any(|&index| index >= n) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_lines[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for (i, index) in indices.iter().enumerate() {
            // The same line twice in one bus would be requested twice.
            if indices[..i].contains(index) {
                return Err(GpioError::InvalidArgument);
            }
        }

        for index in indices {
            self.used_lines.set_aliased(index, true);
        }

        Ok(Box::new(GpiodBus {
            driver: self,
            line_indices: indices,
            bias: GpioBias::None,
        }))
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

struct GpiodBus<'a, const N: usize> {
    driver: &'a GpiodDriver,
    line_indices: [usize; N],
    bias: GpioBias,
}

impl<const N: usize> GpiodBus<'_, N> {
    fn offsets(&self) -> Vec<u32> {
        self.line_indices
            .iter()
            .map(|&index| index as u32)
            .collect()
    }
}

impl<const N: usize> Debug for GpiodBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.line_indices)
    }
}

impl<const N: usize> GpioBus<N> for GpiodBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        let lines = self.driver.chip.request_lines(
            gpiod::Options::input(self.offsets())
                .consumer(env!("CARGO_PKG_NAME"))
                .bias(self.bias.into()),
        )?;
        debug!("{:?} requested as input with {:?} bias.", self, self.bias);
        Ok(Box::new(GpiodBusInput { bus: self, lines }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let lines = self.driver.chip.request_lines(
            gpiod::Options::output(self.offsets())
                .consumer(env!("CARGO_PKG_NAME"))
                .bias(self.bias.into()),
        )?;
        debug!("{:?} requested as output.", self);
        Ok(Box::new(GpiodBusOutput { bus: self, lines }))
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl<const N: usize> Drop for GpiodBus<'_, N> {
    fn drop(&mut self) {
        for &index in &self.line_indices {
            self.driver.used_lines.set_aliased(index, false);
        }
    }
}

struct GpiodBusInput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    lines: gpiod::Lines<gpiod::Input>,
}

impl<const N: usize> Debug for GpiodBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        Ok(self.lines.get_values([false; N])?)
    }
}

struct GpiodBusOutput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    lines: gpiod::Lines<gpiod::Output>,
}

impl<const N: usize> Debug for GpiodBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.lines.set_values(*values)?;
        Ok(())
    }
}
