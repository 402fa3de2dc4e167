use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Byte-level access to the TM1638 three-wire serial interface.
///
/// The chip shifts written bytes in least-significant-bit first but
/// shifts scan results out most-significant-bit first; implementations
/// must keep that asymmetry, since the chip has no way to report a
/// byte that was framed backwards.
pub trait Bus {
    type Error;

    /// Drives the strobe line. Every transaction is bracketed
    /// strobe-low before the first byte, strobe-high after the last.
    fn set_strobe(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Shifts one byte out on the data line, LSB first.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Shifts one byte in from the data line, MSB first.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Releases the data line so the chip can drive it.
    fn set_data_input(&mut self) -> Result<(), Self::Error>;

    /// Reclaims the data line and drives it low.
    fn set_data_output(&mut self) -> Result<(), Self::Error>;
}

/// Half a clock period. The datasheet wants >= 400ns per half-cycle;
/// 1us keeps slow wiring happy.
const CLOCK_HALF_US: u32 = 1;

/// [`Bus`] implementation that bit-bangs three GPIO pins.
///
/// `STB` and `CLK` are push-pull outputs. `DIO` is bidirectional
/// (open-drain with a pull-up, as on the module itself): driving it
/// high releases the line for the chip to pull down during a scan.
pub struct BitBangBus<STB, CLK, DIO, D> {
    stb: STB,
    clk: CLK,
    dio: DIO,
    delay: D,
}

impl<STB, CLK, DIO, D, E> BitBangBus<STB, CLK, DIO, D>
where
    STB: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    DIO: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    /// Takes ownership of the pins and puts the lines into their idle
    /// state: strobe high, clock low, data driven low.
    pub fn new(stb: STB, clk: CLK, dio: DIO, delay: D) -> Result<Self, E> {
        let mut bus = Self {
            stb,
            clk,
            dio,
            delay,
        };
        bus.stb.set_high()?;
        bus.clk.set_low()?;
        bus.dio.set_low()?;
        Ok(bus)
    }

    /// Releases the pins.
    pub fn release(self) -> (STB, CLK, DIO) {
        (self.stb, self.clk, self.dio)
    }
}

impl<STB, CLK, DIO, D, E> Bus for BitBangBus<STB, CLK, DIO, D>
where
    STB: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    DIO: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    type Error = E;

    fn set_strobe(&mut self, high: bool) -> Result<(), E> {
        if high {
            self.stb.set_high()
        } else {
            self.stb.set_low()
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), E> {
        // Data must be stable before the rising edge; the chip samples
        // on clock-high. Ends with the clock low.
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                self.dio.set_high()?;
            } else {
                self.dio.set_low()?;
            }
            self.delay.delay_us(CLOCK_HALF_US);
            self.clk.set_high()?;
            self.delay.delay_us(CLOCK_HALF_US);
            self.clk.set_low()?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, E> {
        let mut value = 0u8;
        for _ in 0..8 {
            self.clk.set_high()?;
            self.delay.delay_us(CLOCK_HALF_US);
            value <<= 1;
            if self.dio.is_high()? {
                value |= 1;
            }
            self.clk.set_low()?;
            self.delay.delay_us(CLOCK_HALF_US);
        }
        Ok(value)
    }

    fn set_data_input(&mut self) -> Result<(), E> {
        // Release the line, then give the chip its tWAIT before the
        // first scan byte is clocked out.
        self.dio.set_high()?;
        self.delay.delay_us(CLOCK_HALF_US);
        Ok(())
    }

    fn set_data_output(&mut self) -> Result<(), E> {
        self.dio.set_low()
    }
}
