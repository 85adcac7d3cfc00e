//! wbutil helper utilities: umbrella crate.
//!
//! This crate re-exports all wbutil components for convenience.
//! Use feature flags to enable specific functionality.

#![doc = include_str!("../README.md")]

pub use wbutil_core as core;

pub use wbutil_core::{coroutine, error, fs, func, misc, pipeline};
pub use wbutil_core::{
    Broadcast, Chain, Compose, Error, ItemKey, PersistentDict, Pipeline, Printer, Result,
    RetryPolicy, Sink, UniqExt, broadcast, compose, partial, partial_right, save_obj, try_open,
    uniq,
};

#[cfg(feature = "math")]
pub use wbutil_math as math;

#[cfg(feature = "cli")]
pub use wbutil_cli as cli;
