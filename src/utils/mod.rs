//! # utils
//!
//! crate utilities

pub mod tty;
