//! Command handlers and the state they can reach.
//!
//! A handler is registered together with the number of positional arguments
//! it accepts ([`Arity`]). The dispatcher checks that count before calling the
//! handler, so a mismatch becomes a usage message on the command rather than a
//! failure inside the handler.
//!
//! Handlers run with a [`Scope`](crate::Scope) whose receiver is the
//! namespace that owns the command. Long-lived resources a namespace wants to
//! share with its handlers (a database handle, a config struct) are stored in
//! its [`Services`] at build time:
//!
//! ```rust
//! use std::io::Write;
//!
//! use face_dispatch::{Arity, Cli, CommandDef};
//!
//! struct Greeting(&'static str);
//!
//! let cli = Cli::builder()
//!     .program_name("hello")
//!     .service(Greeting("hi"))
//!     .command(CommandDef::new("greet").handler(Arity::exactly(1), |scope, req| {
//!         let greeting = scope.require_service::<Greeting>()?;
//!         writeln!(scope.out(), "{} {}", greeting.0, req.args()[0])?;
//!         Ok(())
//!     }))
//!     .build()?;
//! # Ok::<(), face_dispatch::BuildError>(())
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ArgumentCountError;
use crate::request::Request;
use crate::scope::Scope;

/// The result type for command handlers.
pub type HandlerResult = Result<(), anyhow::Error>;

pub(crate) type HandlerFn = Arc<dyn Fn(&mut Scope<'_>, Request) -> HandlerResult + Send + Sync>;

/// How many positional arguments a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    pub fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub fn none() -> Self {
        Self::exactly(0)
    }

    pub fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    /// Any number of arguments, including none.
    pub fn any() -> Self {
        Self::at_least(0)
    }

    /// Between `min` and `max` arguments, inclusive.
    ///
    /// # Panics
    ///
    /// Panics if `max < min`.
    pub fn between(min: usize, max: usize) -> Self {
        assert!(max >= min, "arity upper bound {max} is below lower bound {min}");
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn accepts(&self, given: usize) -> bool {
        given >= self.min && self.max.map_or(true, |max| given <= max)
    }

    /// Returns an error describing the mismatch, if `given` is not accepted.
    pub fn check(&self, given: usize) -> Result<(), ArgumentCountError> {
        if self.accepts(given) {
            Ok(())
        } else {
            Err(ArgumentCountError {
                given,
                expected: *self,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}+", self.min),
        }
    }
}

/// A handler bound to its declared arity.
#[derive(Clone)]
pub struct Handler {
    arity: Arity,
    f: HandlerFn,
}

impl Handler {
    pub fn new<F>(arity: Arity, f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Request) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            arity,
            f: Arc::new(f),
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Checks the positional count, then calls the handler.
    pub(crate) fn invoke(
        &self,
        scope: &mut Scope<'_>,
        request: Request,
    ) -> Result<HandlerResult, ArgumentCountError> {
        self.arity.check(request.args().len())?;
        Ok((self.f)(scope, request))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Type-keyed container for the resources a namespace shares with its handlers.
///
/// Filled while the tree is defined and read-only afterwards, so values must
/// be `Send + Sync`. Use interior mutability inside a value if a handler must
/// change it.
#[derive(Default)]
pub struct Services {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}
