use core::fmt::{self, Display};

mod private {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Private {}
}

/// The error type used by this library.
///
/// The bus is assumed not to fail at this layer (see [`crate::Transport`]),
/// so besides caller-contract violations this only carries the busy-wait
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The chip stayed busy past the 800 ms completion budget.
    ///
    /// This means the hardware is unresponsive or failed; the driver never
    /// retries on its own, so the caller decides what happens next.
    Timeout,

    /// The operation touched a write-protected region.
    ///
    /// Reserved for the write-protection check, which is currently
    /// disabled; no operation produces this today.
    AccessDenied,

    /// An offset, length or parameter violated the chip's addressing or
    /// alignment contract.
    InputValue,

    #[doc(hidden)]
    __NonExhaustive(private::Private),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => f.write_str("chip stayed busy past the completion budget"),
            Error::AccessDenied => f.write_str("region is write-protected"),
            Error::InputValue => f.write_str("offset, length or parameter out of range"),
            Error::__NonExhaustive(_) => unreachable!(),
        }
    }
}
