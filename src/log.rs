//! Logging macros that forward to the `log` crate when the `log` feature is
//! enabled and compile to nothing otherwise.
//!
//! The disabled expansions still run the arguments through `format_args!`
//! so both configurations type-check the same call sites.

#[cfg(feature = "log")]
macro_rules! info {
    ($($t:tt)*) => {
        log::info!($($t)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($t:tt)*) => {{
        let _ = format_args!($($t)*);
    }};
}

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => {
        log::trace!($($t)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{
        let _ = format_args!($($t)*);
    }};
}
