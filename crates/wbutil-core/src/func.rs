//! Functional-programming helpers.
//!
//! Composition here always runs left to right (first function first).
//! [`Chain::reversed`] recovers the traditional mathematical ordering for
//! homogeneous chains.

use std::fmt;
use std::sync::Arc;

/// Compose two functions left to right: `compose(f, g)(x) == g(f(x))`.
///
/// # Examples
///
/// ```
/// use wbutil_core::func::compose;
///
/// let times2_to_str = compose(|x: i32| x * 2, |x: i32| x.to_string());
/// assert_eq!(times2_to_str(10), "20");
/// ```
pub fn compose<A, B, C, F, G>(f: F, g: G) -> impl Fn(A) -> C
where
    F: Fn(A) -> B,
    G: Fn(B) -> C,
{
    move |a| g(f(a))
}

/// Builder for left-to-right pipelines whose stages may change type.
///
/// N-ary stages are expressed by passing tuples between them.
///
/// ```
/// use wbutil_core::func::Compose;
///
/// let switch_and_str = Compose::new(|(a, b): (i32, i32)| (b, a))
///     .then(|(a, b): (i32, i32)| (a.to_string(), b.to_string()));
/// assert_eq!(switch_and_str.call((1, 2)), ("2".to_string(), "1".to_string()));
/// ```
#[derive(Clone, Copy)]
pub struct Compose<F> {
    f: F,
}

impl<F> Compose<F> {
    /// Start a pipeline with a single stage.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Append a stage run after everything already in the pipeline.
    pub fn then<A, B, C, G>(self, g: G) -> Compose<impl Fn(A) -> C>
    where
        F: Fn(A) -> B,
        G: Fn(B) -> C,
    {
        Compose::new(compose(self.f, g))
    }

    /// Invoke the pipeline.
    pub fn call<A, B>(&self, arg: A) -> B
    where
        F: Fn(A) -> B,
    {
        (self.f)(arg)
    }

    /// Unwrap the composed function.
    pub fn into_fn(self) -> F {
        self.f
    }
}

impl<F> fmt::Debug for Compose<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compose").finish_non_exhaustive()
    }
}

type Stage<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

/// An ordered list of `T -> T` functions applied left to right.
///
/// An empty chain is the identity.
pub struct Chain<T> {
    stages: Vec<Stage<T>>,
}

impl<T> Chain<T> {
    /// An empty chain.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage.
    pub fn then<F>(mut self, f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.stages.push(Arc::new(f));
        self
    }

    /// Apply every stage in order.
    pub fn call(&self, arg: T) -> T {
        self.stages.iter().fold(arg, |acc, f| f(acc))
    }

    /// The same stages in reverse calling order.
    pub fn reversed(&self) -> Self {
        Self {
            stages: self.stages.iter().rev().cloned().collect(),
        }
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stages.len())
            .finish()
    }
}

/// Bind the leftmost argument of a binary function.
pub fn partial<A, B, R, F>(f: F, a: A) -> impl Fn(B) -> R
where
    F: Fn(A, B) -> R,
    A: Clone,
{
    move |b| f(a.clone(), b)
}

/// Bind the rightmost argument of a binary function.
///
/// ```
/// use wbutil_core::func::partial_right;
///
/// let data = vec![1, 2, 3, 4];
/// let scale_data = partial_right(
///     |k: i32, data: Vec<i32>| data.into_iter().map(|x| x * k).collect::<Vec<_>>(),
///     data,
/// );
/// assert_eq!(scale_data(10), vec![10, 20, 30, 40]);
/// ```
pub fn partial_right<A, B, R, F>(f: F, b: B) -> impl Fn(A) -> R
where
    F: Fn(A, B) -> R,
    B: Clone,
{
    move |a| f(a, b.clone())
}
