#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! wbutil command-line front end
//!
//! Argument definitions, configuration, and command implementations for
//! the `wbutil` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;

pub use cli::{Cli, Command, ConfigAction};
pub use config::WbutilConfig;
