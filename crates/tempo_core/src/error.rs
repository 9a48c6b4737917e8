//! Error types shared by the residual algebra, the Newton solver and the steppers.

use thiserror::Error;

/// Failures surfaced by the engine.
///
/// Construction-time problems (`DimensionMismatch`, `InvalidArgument`) are
/// reported before any evaluation happens. Solve-time problems
/// (`SingularJacobian`, `NotConverged`) abort the current step; no stepper
/// retries or shrinks the step on its own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdeError {
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Jacobian is singular at Newton iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("Newton solver failed to converge in {iterations} steps (‖f(x)‖ = {residual_norm})")]
    NotConverged {
        iterations: usize,
        residual_norm: f64,
    },

    #[error("Invalid argument: {what}")]
    InvalidArgument { what: String },
}

pub type OdeResult<T> = Result<T, OdeError>;

impl OdeError {
    pub(crate) fn mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        OdeError::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        OdeError::InvalidArgument { what: what.into() }
    }
}

/// Checks `actual == expected`, reporting a dimension mismatch otherwise.
pub(crate) fn ensure_dim(what: &'static str, expected: usize, actual: usize) -> OdeResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(OdeError::mismatch(what, expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dim_reports_both_sizes() {
        assert!(ensure_dim("state", 3, 3).is_ok());
        let err = ensure_dim("state", 3, 2).expect_err("sizes differ");
        let message = format!("{err}");
        assert!(message.contains("state"));
        assert!(message.contains("expected 3, got 2"));
    }
}
