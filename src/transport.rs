//! Bus transports for the driver.
//!
//! [`SpiTransport`] adapts any [`embedded-hal`] blocking SPI bus plus a
//! GPIO chip-select line to the [`Transport`] capability the driver
//! consumes.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/

use crate::Transport;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

/// [`Transport`] implementation for an embedded-hal SPI bus with a
/// dedicated chip-select pin.
///
/// Every [`Transport`] method runs as one chip-select frame: CS is driven
/// low, the bytes are exchanged, and CS is driven high again even if the
/// underlying transfer reported an error. The [`Transport`] contract has no
/// error channel, so bus errors are dropped here; use a HAL whose transfers
/// are infallible (or handle faults out of band) if that matters for your
/// hardware.
#[derive(Debug)]
pub struct SpiTransport<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI: Transfer<u8>, CS: OutputPin> SpiTransport<SPI, CS> {
    /// Wraps an SPI bus and chip-select pin.
    ///
    /// # Parameters
    ///
    /// * **`spi`**: An SPI master, already configured in the mode the chip
    ///   expects (mode 0, supported clock rate).
    /// * **`cs`**: The pin wired to the chip's `\CS` input. Driven low only
    ///   while a frame is in flight.
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Releases the bus and chip-select objects so they can be used
    /// elsewhere.
    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn frame(&mut self, bytes: &mut [u8]) {
        // If the transfer fails, make sure CS still ends up deasserted.
        self.cs.set_low().ok();
        self.spi.transfer(bytes).ok();
        self.cs.set_high().ok();
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin> Transport for SpiTransport<SPI, CS> {
    fn master(&mut self) {
        // embedded-hal buses are brought up as the controlling end by the
        // HAL that created them; nothing to do per chip.
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        let mut buf = [byte];
        self.frame(&mut buf);
        buf[0]
    }

    fn transfer_register(&mut self, opcode: u8, value: u8) -> u8 {
        let mut buf = [opcode, value];
        self.frame(&mut buf);
        buf[1]
    }

    fn transfer_bulk(&mut self, buffer: &mut [u8]) {
        self.frame(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    enum Event {
        CsLow,
        CsHigh,
        Frame(Vec<u8>),
    }

    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<Event>>>);

    /// Fake bus: logs the outgoing frame and overwrites every byte with
    /// `reply`.
    struct Bus {
        log: Log,
        reply: u8,
    }

    impl Transfer<u8> for Bus {
        type Error = Infallible;

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Infallible> {
            self.log.0.borrow_mut().push(Event::Frame(words.to_vec()));
            for byte in words.iter_mut() {
                *byte = self.reply;
            }
            Ok(words)
        }
    }

    struct Pin {
        log: Log,
    }

    impl OutputPin for Pin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.log.0.borrow_mut().push(Event::CsLow);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.log.0.borrow_mut().push(Event::CsHigh);
            Ok(())
        }
    }

    fn transport(reply: u8) -> (SpiTransport<Bus, Pin>, Log) {
        let log = Log::default();
        let spi = Bus {
            log: log.clone(),
            reply,
        };
        let cs = Pin { log: log.clone() };
        (SpiTransport::new(spi, cs), log)
    }

    #[test]
    fn register_transfer_is_one_chip_select_frame() {
        let (mut transport, log) = transport(0x5A);
        let echoed = transport.transfer_register(0x05, 0x00);
        assert_eq!(echoed, 0x5A);
        assert_eq!(
            *log.0.borrow(),
            vec![
                Event::CsLow,
                Event::Frame(vec![0x05, 0x00]),
                Event::CsHigh,
            ]
        );
    }

    #[test]
    fn single_byte_transfer_returns_the_received_byte() {
        let (mut transport, log) = transport(0xA7);
        assert_eq!(transport.transfer(0x06), 0xA7);
        assert_eq!(
            *log.0.borrow(),
            vec![Event::CsLow, Event::Frame(vec![0x06]), Event::CsHigh]
        );
    }

    #[test]
    fn bulk_transfer_passes_the_buffer_through_in_place() {
        let (mut transport, log) = transport(0xEE);
        let mut frame = [0x03, 0x01, 0x02, 0x03, 0x00];
        transport.transfer_bulk(&mut frame);
        assert_eq!(frame, [0xEE; 5]);
        assert_eq!(
            *log.0.borrow(),
            vec![
                Event::CsLow,
                Event::Frame(vec![0x03, 0x01, 0x02, 0x03, 0x00]),
                Event::CsHigh,
            ]
        );
    }
}
