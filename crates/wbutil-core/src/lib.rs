#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! wbutil core library
//!
//! Small helpers with no dependencies on the rest of the workspace.

pub mod coroutine;
pub mod error;
pub mod fs;
pub mod func;
pub mod misc;
pub mod pipeline;

mod proptests;

// Re-exports for convenience
pub use coroutine::{Broadcast, MapSink, PrettyPrinter, Printer, Sink, broadcast, map_sink};
pub use error::{Error, Result};
pub use fs::{Codec, JsonCodec, PersistentDict, TomlCodec, read_or, save_obj, try_open};
pub use func::{Chain, Compose, compose, partial, partial_right};
pub use misc::{RetryPolicy, UniqExt, uniq};
pub use pipeline::{ItemKey, Pipeline};
