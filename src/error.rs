//! Error types.
//!
//! Two classes exist:
//! - [`RenderError`] is recoverable. It is returned from component render
//!   functions and contained by the nearest error boundary.
//! - Invariant violations are programming errors. They go through
//!   [`invariant!`](crate::invariant) and panic.

use std::error::Error as StdError;
use std::sync::Arc;

/// An error raised while rendering a component.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("{0}")]
    Message(String),

    #[error("component `{name}` failed: {source}")]
    Component {
        name: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error(transparent)]
    External(Arc<dyn StdError + Send + Sync>),
}

impl RenderError {
    pub fn msg(message: impl Into<String>) -> Self {
        RenderError::Message(message.into())
    }

    pub fn external(err: impl StdError + Send + Sync + 'static) -> Self {
        RenderError::External(Arc::new(err))
    }

    /// Attach the failing component's name, unless it is already attributed.
    pub(crate) fn in_component(self, name: &str) -> Self {
        match self {
            RenderError::Component { .. } => self,
            other => RenderError::Component {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost message, without component attribution.
    pub fn root_cause(&self) -> &RenderError {
        match self {
            RenderError::Component { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Assert an internal consistency rule. Violations are not recoverable.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            panic!("invariant violation: {}", format_args!($($arg)*));
        }
    };
}

/// Unconditional invariant failure.
#[macro_export]
macro_rules! invariant_failed {
    ($($arg:tt)*) => {
        panic!("invariant violation: {}", format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_attribution_is_not_nested() {
        let err = RenderError::msg("boom").in_component("Inner").in_component("Outer");
        assert_eq!(err.to_string(), "component `Inner` failed: boom");
        assert_eq!(err.root_cause().to_string(), "boom");
    }

    #[test]
    fn test_external_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err = RenderError::external(io);
        assert_eq!(err.to_string(), "disk");
    }

    #[test]
    #[should_panic(expected = "invariant violation: bad 3")]
    fn test_invariant_panics() {
        invariant!(1 + 1 == 3, "bad {}", 3);
    }
}
