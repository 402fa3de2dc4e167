//! Driver for the Titan Micro TM1638 as found on "LED&Key" modules:
//! 8 seven-segment positions, 8 discrete LEDs and 8 keys behind a
//! 3-wire serial interface (STB/CLK/DIO).

#![no_std]

mod bus;
mod constants;

pub use bus::*;
pub use constants::*;
use num_traits::ToPrimitive;

/// One TM1638 module on its own bus.
///
/// [`reset`](Self::reset) (or [`init`](Self::init)) must run before
/// anything else; the chip powers up with undefined register contents.
pub struct Tm1638<B> {
    bus: B,
    lamps: u8,
}

impl<B, E> Tm1638<B>
where
    B: Bus<Error = E>,
{
    pub fn new(bus: B) -> Self {
        Self { bus, lamps: 0 }
    }

    pub fn destroy(self) -> B {
        self.bus
    }

    /// Resets the module and sets the display brightness.
    pub fn init(&mut self, brightness: u8) -> Result<(), Tm1638Error<E>> {
        self.reset()?;
        self.set_brightness(brightness)
    }

    /// Clears all sixteen display registers and the lamp mirror.
    ///
    /// Runs one auto-increment transaction: the start address followed
    /// by sixteen zero bytes, one per grid and lamp register. Fixed
    /// addressing is restored afterwards; nothing else in this driver
    /// relies on auto-increment.
    pub fn reset(&mut self) -> Result<(), Tm1638Error<E>> {
        self.send_command(cmd::ADDR_AUTO_INC)?;
        self.bus.set_strobe(false)?;
        self.bus.write_byte(cmd::ADDR_BASE)?;
        for _ in 0..2 * DIGITS {
            self.bus.write_byte(0)?;
        }
        self.bus.set_strobe(true)?;
        self.lamps = 0;
        self.send_command(cmd::ADDR_FIXED)?;
        #[cfg(feature = "defmt")]
        defmt::debug!("TM1638 reset");
        Ok(())
    }

    /// Sets the display brightness: 0 is off, 1..=8 is luminance.
    /// Levels above 8 saturate to full brightness.
    pub fn set_brightness(&mut self, level: u8) -> Result<(), Tm1638Error<E>> {
        self.send_command(cmd::DISPLAY_OFF + level.min(MAX_BRIGHTNESS))
    }

    /// Switches the discrete LED `num` (1..=8, clamped) on or off and
    /// records the state in the mirror.
    pub fn set_lamp(&mut self, num: u8, on: bool) -> Result<(), Tm1638Error<E>> {
        let n = clamp_position(num);
        if on {
            self.lamps |= 1 << (n - 1);
        } else {
            self.lamps &= !(1 << (n - 1));
        }
        self.write_register(lamp_addr(n), on as u8)
    }

    /// Last state this driver wrote for LED `num` (1..=8, clamped).
    ///
    /// The chip has no LED read-back; this is the local mirror, so an
    /// out-of-band reset of the module desynchronizes it.
    pub fn lamp(&self, num: u8) -> bool {
        self.lamps & (1 << (clamp_position(num) - 1)) != 0
    }

    /// Puts `symbol` (a [`FONT`] code) on position 1..=8, optionally
    /// with its decimal point. Digit registers are write-only; unlike
    /// the lamps, their contents cannot be read back.
    pub fn set_digit(&mut self, position: u8, symbol: u8, dot: bool) -> Result<(), Tm1638Error<E>> {
        let mut segs = segments(symbol);
        if dot {
            segs |= DOT_MASK;
        }
        self.write_register(grid_addr(position), segs)
    }

    /// Blanks all eight positions. The lamps are left alone.
    pub fn clear(&mut self) -> Result<(), Tm1638Error<E>> {
        for position in 1..=DIGITS {
            self.set_digit(position, BLANK, false)?;
        }
        Ok(())
    }

    /// Writes `value` in decimal, one character per position starting
    /// at `start` (clamped), stopping at the right edge of the display.
    /// Negative values get a leading minus. The character at 1-based
    /// index `dot` is drawn with its decimal point; 0 lights none.
    pub fn display_number<T>(&mut self, value: T, dot: u8, start: u8) -> Result<(), Tm1638Error<E>>
    where
        T: ToPrimitive,
    {
        let num = value.to_i64().ok_or(Tm1638Error::InvalidValue)?;
        let negative = num < 0;
        let mut magnitude = num.unsigned_abs();

        // Digits fall out lowest first.
        let mut digits = [0u8; 19];
        let mut len = 0;
        loop {
            digits[len] = (magnitude % 10) as u8;
            magnitude /= 10;
            len += 1;
            if magnitude == 0 {
                break;
            }
        }

        let mut position = clamp_position(start);
        let mut index = 0;
        if negative {
            index += 1;
            self.set_digit(position, MINUS, index == dot)?;
            position += 1;
        }
        for i in (0..len).rev() {
            if position > DIGITS {
                break;
            }
            index += 1;
            self.set_digit(position, digits[i], index == dot)?;
            position += 1;
        }
        Ok(())
    }

    /// Draws the five bar gauges that share the display's segments:
    /// `g1`, `g3`, `g5` are the horizontal bars (0..=8 steps), `g2`,
    /// `g4` the vertical pairs (0..=16 steps, odd levels ending in a
    /// half step). Every grid register is rewritten, so this replaces
    /// whatever digits were showing.
    ///
    /// Levels past a gauge's range are not clamped; they render the
    /// same as a pegged needle, with the bar fully lit.
    pub fn set_gauges(
        &mut self,
        g1: u8,
        g2: u8,
        g3: u8,
        g4: u8,
        g5: u8,
    ) -> Result<(), Tm1638Error<E>> {
        for counter in 1..=DIGITS {
            let mut segs = 0u8;
            if counter <= g1 {
                segs |= gauge::TOP_BAR;
            }
            if counter <= g3 {
                segs |= gauge::MID_BAR;
            }
            if counter <= g5 {
                segs |= gauge::BOTTOM_BAR;
            }
            if counter <= g2 >> 1 {
                segs |= gauge::UPPER_PAIR;
            }
            if g2 % 2 == 1 && counter - 1 == g2 >> 1 {
                segs |= gauge::UPPER_HALF;
            }
            if counter <= g4 >> 1 {
                segs |= gauge::LOWER_PAIR;
            }
            if g4 % 2 == 1 && counter - 1 == g4 >> 1 {
                segs |= gauge::LOWER_HALF;
            }
            self.write_register(grid_addr(counter), segs)?;
        }
        Ok(())
    }

    /// Scans the keys and returns the pressed mask, bit 0 for the
    /// leftmost key.
    ///
    /// The chip reports four scan bytes; each nonzero byte is shifted
    /// right by its index before being OR-folded into the result. On
    /// the LED&Key board all eight keys land in the low byte and the
    /// fold is lossless; with more than eight keys wired, presses past
    /// the first eight can alias onto the same bits.
    pub fn read_keys(&mut self) -> Result<u32, Tm1638Error<E>> {
        self.bus.set_strobe(false)?;
        self.bus.write_byte(cmd::KEY_SCAN)?;
        self.bus.set_data_input()?;
        let mut keys: u32 = 0;
        for i in 0..4 {
            let mut byte = self.bus.read_byte()?;
            if byte > 0 {
                byte >>= i;
            }
            keys |= byte as u32;
        }
        self.bus.set_data_output()?;
        self.bus.set_strobe(true)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("key scan = {=u32:x}", keys);
        Ok(keys)
    }

    /// Single-byte command frame.
    fn send_command(&mut self, command: u8) -> Result<(), Tm1638Error<E>> {
        self.bus.set_strobe(false)?;
        self.bus.write_byte(command)?;
        self.bus.set_strobe(true)?;
        Ok(())
    }

    /// Fixed-address register write: address byte, then data byte, in
    /// one strobe frame.
    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Tm1638Error<E>> {
        self.bus.set_strobe(false)?;
        self.bus.write_byte(addr)?;
        self.bus.write_byte(value)?;
        self.bus.set_strobe(true)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tm1638Error<E> {
    /// Bus transfer failed.
    Bus(E),
    /// Value cannot be rendered as a decimal number.
    InvalidValue,
}

impl<E> From<E> for Tm1638Error<E> {
    fn from(error: E) -> Self {
        Tm1638Error::Bus(error)
    }
}
