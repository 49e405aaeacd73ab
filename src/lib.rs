//! A driver for Winbond W25X/W25Q (and compatible) SPI NOR flash chips.
//!
//! This crate speaks the chips' byte-level command protocol: reads, page
//! programs, sector and block erases, status register access, JEDEC and
//! unique-ID identification, and power-down handling. The bus itself is
//! abstracted behind the [`Transport`] trait so the driver runs on anything
//! that can shift bytes; an adapter for [`embedded-hal`] SPI buses ships in
//! [`transport`]. Completion polling is bounded by a caller-supplied
//! [`Monotonic`] millisecond clock.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/

#![doc(html_root_url = "https://docs.rs/w25-flash/0.1.0")]
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;
mod error;
pub mod prelude;
pub mod transport;
pub mod w25;

pub use crate::error::Error;

/// Low-level access to the bus a flash chip is attached to.
///
/// Every method is one complete bus transaction: implementations must frame
/// each call in a single chip-select assertion, since the chip latches
/// commands on the deasserting edge. The bus is assumed not to fail at this
/// layer; transports that can observe transfer errors have to resolve them
/// internally (see [`transport::SpiTransport`]).
pub trait Transport {
    /// Configures the bus as the controlling (master) end.
    ///
    /// Called once from [`w25::Flash::init`]. Transports whose bus comes up
    /// already configured implement this as a no-op.
    fn master(&mut self);

    /// Clocks out `byte` and returns the byte received alongside it.
    ///
    /// Used for single-opcode commands (write-enable, power-down,
    /// release-power-down).
    fn transfer(&mut self, byte: u8) -> u8;

    /// Clocks out `opcode` followed by `value` and returns the byte received
    /// while `value` was shifting out.
    ///
    /// Used for status register access.
    fn transfer_register(&mut self, opcode: u8, value: u8) -> u8;

    /// Bidirectional in-place transfer: every byte of `buffer` is clocked
    /// out and overwritten with the byte received in its place.
    ///
    /// Used for all longer command frames (read, program, erase,
    /// identification).
    fn transfer_bulk(&mut self, buffer: &mut [u8]);
}

/// A monotonic millisecond clock.
///
/// Consulted only while waiting for the chip to finish an erase, program or
/// status write. The counter may wrap; elapsed time is computed with
/// wrapping arithmetic.
pub trait Monotonic {
    /// Returns the current reading of the clock in milliseconds.
    fn now_ms(&mut self) -> u32;
}
