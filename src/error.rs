//! Crate error type.

use thiserror::Error;

/// Errors reported by fallible constructors.
///
/// Rasterization itself is deterministic and infallible once a pipeline is
/// built; out-of-order use of the render pipeline is a programming error
/// and panics instead of returning one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The dash phase passed to [`crate::Dasher::new`] was negative.
    #[error("dash phase must be >= 0, got {0}")]
    NegativeDashPhase(f64),

    /// The dash array was empty or contained no positive entry, so the
    /// phase normalization walk could never terminate.
    #[error("dash array must contain at least one positive entry")]
    InvalidDashPattern,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::NegativeDashPhase(-2.5);
        assert!(e.to_string().contains("-2.5"));
        let e = Error::InvalidDashPattern;
        assert!(e.to_string().contains("positive"));
    }
}
