//! # System Module
//!
//! Stage machine and capability gating.

mod stage;

pub use stage::*;
