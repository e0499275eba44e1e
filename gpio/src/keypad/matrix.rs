use std::fmt::{Debug, Formatter};
use std::thread;
use std::time::Duration;
use log::trace;
use crate::{GpioBusInput, GpioBusOutput, GpioError, GpioResult, Level};
use crate::keypad::Keypad;
use crate::utils::CollectionExt;

/// Number of rows and of columns of the keypad matrix.
pub const MATRIX_SIZE: usize = 4;

/// Maps a (row, column) position of a 4x4 keypad to the character printed on the key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KeyMap {
    keys: [[char; MATRIX_SIZE]; MATRIX_SIZE],
}

impl KeyMap {
    /// Hexadecimal layout, digits then `A`-`F`.
    pub const HEX: KeyMap = KeyMap::new([
        [ '1', '2', '3', '4', ],
        [ '5', '6', '7', '8', ],
        [ '9', '0', 'A', 'B', ],
        [ 'C', 'D', 'E', 'F', ],
    ]);

    /// Telephone layout with the hook (`P`) and switch (`R`) keys on the last column.
    pub const HANDSET: KeyMap = KeyMap::new([
        [ '1', '2', '3', 'P', ],
        [ '4', '5', '6', 'R', ],
        [ '7', '8', '9', 'C', ],
        [ '*', '0', '#', 'D', ],
    ]);

    pub const fn new(keys: [[char; MATRIX_SIZE]; MATRIX_SIZE]) -> Self {
        KeyMap { keys }
    }

    /// Converts a position tuple (row, column) to its key.
    pub fn from_position(&self, pos: (usize, usize)) -> Option<char> {
        self.keys.get(pos.0)?.get(pos.1).copied()
    }

    /// Whether some position maps to `key`.
    pub fn contains(&self, key: char) -> bool {
        self.keys.iter().flatten().any(|&k| k == key)
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        KeyMap::HEX
    }
}

/// The raw row and column lines of a keypad matrix.
///
/// Rows are inputs that idle high; a pressed key connects its row to its column, so the
/// row reads low while that column is driven low.
pub trait MatrixLines: Debug {
    /// Reads the level of row `row`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `row` is out of range.
    fn read_row_level(&mut self, row: usize) -> GpioResult<Level>;

    /// Drives column `column` to `level`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `column` is out of range.
    fn set_column_level(&mut self, column: usize, level: Level) -> GpioResult<()>;
}

/// [MatrixLines] backed by a 4-line output bus for the columns and a 4-line input bus
/// for the rows.
pub struct GpioMatrixLines<'a> {
    cols: &'a dyn GpioBusOutput<MATRIX_SIZE>,
    rows: &'a dyn GpioBusInput<MATRIX_SIZE>,
    col_levels: [bool; MATRIX_SIZE],
}

impl Debug for GpioMatrixLines<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioMatrixLines({:?}, {:?})", self.cols, self.rows)
    }
}

impl <'a> GpioMatrixLines<'a> {
    /// Creates a new `GpioMatrixLines` with the columns on `cols` and the rows on `rows`.
    ///
    /// The row bus should be requested with a pull-up bias. All columns start high.
    pub fn new(
        cols: &'a dyn GpioBusOutput<MATRIX_SIZE>,
        rows: &'a dyn GpioBusInput<MATRIX_SIZE>,
    ) -> GpioResult<Self> {
        let col_levels = [true; MATRIX_SIZE];
        cols.write(&col_levels)?;
        Ok(GpioMatrixLines { cols, rows, col_levels })
    }
}

impl MatrixLines for GpioMatrixLines<'_> {
    fn read_row_level(&mut self, row: usize) -> GpioResult<Level> {
        if row >= MATRIX_SIZE {
            return Err(GpioError::InvalidArgument);
        }
        Ok(self.rows.read()?[row].into())
    }

    fn set_column_level(&mut self, column: usize, level: Level) -> GpioResult<()> {
        if column >= MATRIX_SIZE {
            return Err(GpioError::InvalidArgument);
        }
        self.col_levels[column] = level.into();
        self.cols.write(&self.col_levels)
    }
}

/// A 4x4 matrix keypad decoded by column scanning.
#[derive(Debug)]
pub struct MatrixKeypad<L: MatrixLines> {
    lines: L,
    keymap: KeyMap,
    /// Delay between two polls of the rows while waiting for a press or a release.
    pub poll_interval: Duration,
}

impl <L: MatrixLines> MatrixKeypad<L> {
    pub fn new(lines: L, keymap: KeyMap) -> Self {
        MatrixKeypad {
            lines,
            keymap,
            poll_interval: Duration::from_millis(10),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    fn pause(&self) {
        if !self.poll_interval.is_zero() {
            thread::sleep(self.poll_interval);
        }
    }

    fn set_all_columns(&mut self, level: Level) -> GpioResult<()> {
        for column in 0..MATRIX_SIZE {
            self.lines.set_column_level(column, level)?;
        }
        Ok(())
    }

    fn low_rows(&mut self) -> GpioResult<Vec<usize>> {
        let mut low = Vec::new();
        for row in 0..MATRIX_SIZE {
            if self.lines.read_row_level(row)?.is_low() {
                low.push(row);
            }
        }
        Ok(low)
    }

    /// Drives all columns low and waits until any row reads low.
    fn wait_for_press(&mut self) -> GpioResult<()> {
        self.set_all_columns(Level::Low)?;
        while self.low_rows()?.is_empty() {
            self.pause();
        }
        Ok(())
    }

    /// Drives all columns low and waits until every row reads high.
    fn wait_for_release(&mut self) -> GpioResult<()> {
        self.set_all_columns(Level::Low)?;
        while !self.low_rows()?.is_empty() {
            self.pause();
        }
        Ok(())
    }

    /// Drives one column low at a time and returns the first position whose column
    /// pulls exactly one row low.
    fn scan(&mut self) -> GpioResult<Option<(usize, usize)>> {
        for column in 0..MATRIX_SIZE {
            for other in 0..MATRIX_SIZE {
                let level = if other == column { Level::Low } else { Level::High };
                self.lines.set_column_level(other, level)?;
            }
            if let Ok(&row) = self.low_rows()?.try_get_single() {
                return Ok(Some((row, column)));
            }
        }
        Ok(None)
    }
}

impl <L: MatrixLines> Keypad for MatrixKeypad<L> {
    type Key = char;

    fn poll_key(&mut self) -> GpioResult<Option<char>> {
        self.wait_for_press()?;

        let Some(pos) = self.scan()? else {
            trace!("Scan did not isolate a key.");
            self.pause();
            return Ok(None);
        };

        let key = self.keymap.from_position(pos);
        self.wait_for_release()?;
        trace!("Key {:?} at {:?}.", key, pos);
        Ok(key)
    }
}
