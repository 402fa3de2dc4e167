extern crate tm1638_ledkey;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use tm1638_ledkey::{BitBangBus, Bus};

/// Shared view of the three lines, acting as the chip's side of the
/// wire: it samples the data level at every rising clock edge and
/// serves queued bits while the host reads.
#[derive(Default)]
struct WireState {
    stb: bool,
    clk: bool,
    dio: bool,
    sampled: Vec<bool>,
    input: VecDeque<bool>,
}

#[derive(Clone, Default)]
struct Wire(Rc<RefCell<WireState>>);

struct StbPin(Wire);
struct ClkPin(Wire);
struct DioPin(Wire);

impl ErrorType for StbPin {
    type Error = Infallible;
}

impl OutputPin for StbPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0 .0.borrow_mut().stb = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0 .0.borrow_mut().stb = true;
        Ok(())
    }
}

impl ErrorType for ClkPin {
    type Error = Infallible;
}

impl OutputPin for ClkPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0 .0.borrow_mut().clk = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut wire = self.0 .0.borrow_mut();
        wire.clk = true;
        let level = wire.dio;
        wire.sampled.push(level);
        Ok(())
    }
}

impl ErrorType for DioPin {
    type Error = Infallible;
}

impl OutputPin for DioPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0 .0.borrow_mut().dio = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0 .0.borrow_mut().dio = true;
        Ok(())
    }
}

impl InputPin for DioPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0 .0.borrow_mut().input.pop_front().unwrap_or(false))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fn bus_on(wire: &Wire) -> BitBangBus<StbPin, ClkPin, DioPin, NoDelay> {
    BitBangBus::new(
        StbPin(wire.clone()),
        ClkPin(wire.clone()),
        DioPin(wire.clone()),
        NoDelay,
    )
    .unwrap()
}

#[test]
fn new_idles_the_lines() {
    let wire = Wire::default();
    let _bus = bus_on(&wire);

    let state = wire.0.borrow();
    assert!(state.stb);
    assert!(!state.clk);
    assert!(!state.dio);
    assert!(state.sampled.is_empty());
}

#[test]
fn writes_shift_out_lsb_first_on_rising_edges() {
    let wire = Wire::default();
    let mut bus = bus_on(&wire);

    bus.write_byte(0xA5).unwrap();

    // 0xA5 seen from the chip's side, lowest bit first.
    let sampled = wire.0.borrow().sampled.clone();
    assert_eq!(
        sampled,
        [true, false, true, false, false, true, false, true]
    );
    // Clock parks low between transactions.
    assert!(!wire.0.borrow().clk);
}

#[test]
fn reads_assemble_msb_first() {
    let wire = Wire::default();
    let mut bus = bus_on(&wire);

    wire.0.borrow_mut().input =
        VecDeque::from(vec![true, true, false, false, false, false, false, true]);
    bus.set_data_input().unwrap();
    // A byte framed in the wrong direction would come back as 0x83.
    assert_eq!(bus.read_byte().unwrap(), 0xC1);
}

#[test]
fn data_direction_follows_the_line_level() {
    let wire = Wire::default();
    let mut bus = bus_on(&wire);

    bus.set_data_input().unwrap();
    assert!(wire.0.borrow().dio);

    bus.set_data_output().unwrap();
    assert!(!wire.0.borrow().dio);
}

#[test]
fn every_bit_gets_its_own_clock_pulse() {
    let wire = Wire::default();
    let mut bus = bus_on(&wire);

    bus.write_byte(0xFF).unwrap();
    bus.write_byte(0x00).unwrap();
    assert_eq!(wire.0.borrow().sampled.len(), 16);
}
