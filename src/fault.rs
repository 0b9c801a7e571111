//! Failures synthesized by the runtime itself.
//!
//! Effects fail with a caller-chosen error type `E`. A handful of failures do
//! not come from caller code at all: a deadline elapsing, a leaf panicking, a
//! spawned task being torn down. Those are reported as a [`Fault`], and every
//! operation that can produce one asks for `E: From<Fault>`.
//!
//! # Examples
//!
//! ```rust
//! use tributary::{Effect, Fault, Scheduler};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum AppError {
//!     Fault(Fault),
//! }
//!
//! impl From<Fault> for AppError {
//!     fn from(fault: Fault) -> Self {
//!         AppError::Fault(fault)
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let slow = Effect::<u32, AppError>::from_async(&Scheduler::Inline, || async {
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     Ok(1)
//! })
//! .timeout(Duration::from_millis(10));
//!
//! match slow.run().await {
//!     Err(AppError::Fault(fault)) => assert!(fault.is_timeout()),
//!     other => panic!("expected timeout, got {:?}", other),
//! }
//! # });
//! ```

use std::any::Any;
use std::time::Duration;

/// A failure produced by the runtime rather than by an effect's own code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The effect did not complete before its deadline.
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },
    /// A leaf computation panicked while being constructed or evaluated.
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },
    /// A spawned computation was cancelled before it produced an outcome.
    Aborted,
    /// No runtime was available to drive a blocking wait.
    Runtime(String),
    /// A value could not be encoded as JSON.
    Encode(String),
}

impl Fault {
    /// Create a timeout fault.
    pub fn timeout(after: Duration) -> Self {
        Fault::Timeout { after }
    }

    /// Build a fault from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Fault::Panicked { message }
    }

    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Fault::Timeout { .. })
    }

    /// Returns true if this is a captured panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, Fault::Panicked { .. })
    }

    pub(crate) fn from_join(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            Fault::from_panic(error.into_panic())
        } else {
            Fault::Aborted
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::Timeout { after } => write!(f, "operation timed out after {:?}", after),
            Fault::Panicked { message } => write!(f, "computation panicked: {}", message),
            Fault::Aborted => write!(f, "computation was aborted before completing"),
            Fault::Runtime(reason) => write!(f, "no runtime available: {}", reason),
            Fault::Encode(reason) => write!(f, "value could not be encoded as JSON: {}", reason),
        }
    }
}

impl std::error::Error for Fault {}
