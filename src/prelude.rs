//! The prelude is a collection of all traits in this crate.
//!
//! The traits are renamed on the way out so a glob import cannot collide
//! with other names in scope.

pub use crate::Monotonic as _w25_flash_Monotonic;
pub use crate::Transport as _w25_flash_Transport;
