//! Callable values.
//!
//! A callable is stored as an explicit pair of source text and compiled
//! handle. The source text is what identity comparison and snapshot export
//! see; the handle is what runs.
//!
//! Binding (see [`crate::pipeline::scheduler::bind`]) wraps a callable in a
//! new one that schedules a flush before delegating. The wrapper reports the
//! source text of the callable it wraps and remembers it as its original, so
//! a stored callable always freezes and exports like the one the description
//! carried.

use std::fmt;
use std::rc::Rc;

use crate::node::Node;
use super::Value;

type Handle = dyn Fn(&Node, &[Value]) -> Value;

struct Inner {
    source: String,
    handle: Box<Handle>,
    original: Option<Callable>,
}

/// A function value inside a description or a live store.
///
/// The handle receives the node it runs against (the receiver) and the call
/// arguments.
#[derive(Clone)]
pub struct Callable {
    inner: Rc<Inner>,
}

impl Callable {
    /// Create a callable from its source text and handle.
    ///
    /// Prefer the [`func!`](crate::func) macro, which captures the closure's
    /// own tokens as source text.
    pub fn new<F>(source: impl Into<String>, handle: F) -> Self
    where
        F: Fn(&Node, &[Value]) -> Value + 'static,
    {
        Self {
            inner: Rc::new(Inner {
                source: source.into(),
                handle: Box::new(handle),
                original: None,
            }),
        }
    }

    /// Create a wrapper around `original` that runs `handle` instead.
    pub(crate) fn wrap<F>(original: &Callable, handle: F) -> Self
    where
        F: Fn(&Node, &[Value]) -> Value + 'static,
    {
        let original = original.original().clone();
        Self {
            inner: Rc::new(Inner {
                source: original.source().to_string(),
                handle: Box::new(handle),
                original: Some(original),
            }),
        }
    }

    /// Source text.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// The unwrapped callable. Returns `self` for callables that were never bound.
    pub fn original(&self) -> &Callable {
        self.inner.original.as_ref().unwrap_or(self)
    }

    /// Whether this callable is a scheduler wrapper.
    pub fn is_bound(&self) -> bool {
        self.inner.original.is_some()
    }

    /// Invoke the handle.
    pub fn call(&self, this: &Node, args: &[Value]) -> Value {
        (self.inner.handle)(this, args)
    }

    /// Whether both values share the same handle allocation.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Body of the first block comment in the source text.
    ///
    /// The lines holding `/*` and `*/` are dropped, so
    /// `"|| { /*\n<b>hi</b>\n*/ }"` yields `"<b>hi</b>"`.
    pub fn multiline(&self) -> Option<String> {
        let source = self.source();
        let start = source.find("/*")?;
        let rest = &source[start + 2..];
        let end = rest.find("*/")?;
        let body = &rest[..end];
        let body = body.split_once('\n').map_or(body, |(_, tail)| tail);
        let body = body.rsplit_once('\n').map_or(body, |(head, _)| head);
        Some(body.to_string())
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.source() == other.source()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callable").field(&self.source()).finish()
    }
}

/// Build a [`Callable`] from a closure, using the closure's tokens as source text.
///
/// ```ignore
/// let inc = func!(|this, _args| {
///     let n = this.get("_count").as_f64().unwrap_or(0.0);
///     this.set("_count", n + 1.0);
///     Value::Null
/// });
/// ```
#[macro_export]
macro_rules! func {
    ($($closure:tt)+) => {
        $crate::Callable::new(stringify!($($closure)+), $($closure)+)
    };
}
