//! Shared library for the Kakehashi chat relay.
//!
//! Holds everything both sides of the wire need: the JSON protocol types,
//! time utilities with a clock abstraction, and logging setup.

pub mod logger;
pub mod protocol;
pub mod time;
