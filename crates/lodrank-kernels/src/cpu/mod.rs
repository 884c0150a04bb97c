//! CPU kernel implementations

pub mod fallback;

pub use fallback::*;
