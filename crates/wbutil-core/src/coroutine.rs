//! Push-based sinks for wiring small data-flow graphs.
//!
//! A [`Sink`] accepts items one at a time. Sinks are ready as soon as they
//! are constructed, and can be fanned out with [`broadcast`] or fed through
//! a transform with [`map_sink`].
//!
//! ```
//! use wbutil_core::coroutine::{broadcast, map_sink, Sink};
//!
//! let mut evens = Vec::new();
//! let mut all = Vec::new();
//! {
//!     let targets: Vec<Box<dyn Sink<i32> + '_>> = vec![
//!         Box::new(|x: i32| if x % 2 == 0 { evens.push(x) }),
//!         Box::new(map_sink(|x: i32| x * 10, |x: i32| all.push(x))),
//!     ];
//!     let mut fan = broadcast(targets);
//!     for i in 1..=4 {
//!         fan.send(i);
//!     }
//! }
//! assert_eq!(evens, vec![2, 4]);
//! assert_eq!(all, vec![10, 20, 30, 40]);
//! ```

use std::fmt::{Debug, Display};
use std::io::{self, Write};

/// A consumer of pushed items.
pub trait Sink<T> {
    /// Deliver one item.
    fn send(&mut self, item: T);
}

impl<T, F> Sink<T> for F
where
    F: FnMut(T),
{
    fn send(&mut self, item: T) {
        self(item)
    }
}

// ============================================================================
// Broadcast
// ============================================================================

/// Sink that forwards each item to every target, in order.
pub struct Broadcast<'a, T> {
    targets: Vec<Box<dyn Sink<T> + 'a>>,
}

impl<T> Broadcast<'_, T> {
    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<T: Clone> Sink<T> for Broadcast<'_, T> {
    fn send(&mut self, item: T) {
        if let Some((last, rest)) = self.targets.split_last_mut() {
            for target in rest {
                (**target).send(item.clone());
            }
            (**last).send(item);
        }
    }
}

/// Send each item to multiple targets.
pub fn broadcast<'a, T: Clone>(targets: Vec<Box<dyn Sink<T> + 'a>>) -> Broadcast<'a, T> {
    Broadcast { targets }
}

// ============================================================================
// MapSink
// ============================================================================

/// Sink that transforms items before forwarding them.
pub struct MapSink<F, S> {
    func: F,
    target: S,
}

impl<T, U, F, S> Sink<T> for MapSink<F, S>
where
    F: FnMut(T) -> U,
    S: Sink<U>,
{
    fn send(&mut self, item: T) {
        let mapped = (self.func)(item);
        self.target.send(mapped);
    }
}

/// Turn a plain function into a stage that feeds `target`.
pub fn map_sink<F, S>(func: F, target: S) -> MapSink<F, S> {
    MapSink { func, target }
}

// ============================================================================
// Printers
// ============================================================================

/// Sink that writes each item's `Display` form on its own line.
///
/// The first write failure is kept and later items are dropped; check it
/// with [`Printer::error`] or [`Printer::into_result`].
pub struct Printer<W: Write = io::Stdout> {
    out: W,
    error: Option<io::Error>,
}

impl Printer<io::Stdout> {
    /// Printer writing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Printer<W> {
    /// Printer writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// The first write failure, if any.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Recover the writer, ignoring any write failure.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Flush and recover the writer, or return the first write failure.
    pub fn into_result(mut self) -> io::Result<W> {
        match self.error.take() {
            Some(e) => Err(e),
            None => {
                self.out.flush()?;
                Ok(self.out)
            }
        }
    }
}

impl<T: Display, W: Write> Sink<T> for Printer<W> {
    fn send(&mut self, item: T) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.out, "{item}") {
            tracing::warn!(error = %e, "Printer sink failed to write");
            self.error = Some(e);
        }
    }
}

/// Sink that writes each item's pretty `Debug` form followed by a blank line.
pub struct PrettyPrinter<W: Write = io::Stdout> {
    out: W,
}

impl PrettyPrinter<io::Stdout> {
    /// Pretty printer writing to stdout.
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> PrettyPrinter<W> {
    /// Pretty printer writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<T: Debug, W: Write> Sink<T> for PrettyPrinter<W> {
    fn send(&mut self, item: T) {
        if let Err(e) = writeln!(self.out, "{item:#?}\n") {
            tracing::warn!(error = %e, "PrettyPrinter sink failed to write");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_sink() {
        let mut got = Vec::new();
        let mut sink = |x: u8| got.push(x);
        sink.send(1);
        sink.send(2);
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn test_broadcast_reaches_every_target_in_order() {
        let log = std::cell::RefCell::new(Vec::new());
        {
            let targets: Vec<Box<dyn Sink<String> + '_>> = vec![
                Box::new(|s: String| log.borrow_mut().push(format!("a:{s}"))),
                Box::new(|s: String| log.borrow_mut().push(format!("b:{s}"))),
            ];
            let mut fan = broadcast(targets);
            assert_eq!(fan.len(), 2);
            fan.send("x".to_string());
            fan.send("y".to_string());
        }
        assert_eq!(log.into_inner(), vec!["a:x", "b:x", "a:y", "b:y"]);
    }

    #[test]
    fn test_broadcast_empty_drops_items() {
        let mut fan: Broadcast<'_, i32> = broadcast(Vec::new());
        assert!(fan.is_empty());
        fan.send(1);
    }

    #[test]
    fn test_map_sink_chains() {
        let mut out = Vec::new();
        {
            let mut stage = map_sink(
                |x: i32| x + 1,
                map_sink(|x: i32| x * 2, |x: i32| out.push(x)),
            );
            stage.send(1);
            stage.send(5);
        }
        assert_eq!(out, vec![4, 12]);
    }

    #[test]
    fn test_printer_writes_lines() {
        let mut printer = Printer::new(Vec::new());
        printer.send(1);
        printer.send("two");
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(text, "1\ntwo\n");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_printer_keeps_first_write_error() {
        let mut printer = Printer::new(ClosedPipe);
        printer.send("a");
        printer.send("b");
        assert_eq!(
            printer.error().map(io::Error::kind),
            Some(io::ErrorKind::BrokenPipe)
        );
        let err = printer.into_result().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_printer_into_result_ok() {
        let mut printer = Printer::new(Vec::new());
        printer.send("x");
        assert!(printer.error().is_none());
        assert_eq!(printer.into_result().unwrap(), b"x\n".to_vec());
    }

    #[test]
    fn test_pretty_printer_adds_blank_line() {
        let mut printer = PrettyPrinter::new(Vec::new());
        printer.send(vec![1]);
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(text, "[\n    1,\n]\n\n");
    }
}
