//! Built-in term formulas.
//!
//! The controller falls back to these for every term a `BaseTerms` modifier
//! leaves unset.  The derivative acts on the process variable rather than the
//! error, so a setpoint change never produces a derivative spike.
//!
//! ```rust
//! use hookpid_core::terms;
//!
//! let e = terms::error(1.0, 0.0);
//! assert_eq!(terms::integrate(2.0, e, 0.5), 2.5);
//! assert_eq!(terms::derivative(5.0, 6.0, 1.0).unwrap(), -1.0);
//! assert!(terms::derivative(5.0, 6.0, 0.0).is_err());
//! ```

use hookpid_types::{PidError, PidResult, Real};

/// `setpoint - pv`.
pub fn error(setpoint: Real, pv: Real) -> Real {
    setpoint - pv
}

/// The unweighted proportional term is the error itself.
pub fn proportional(e: Real) -> Real {
    e
}

/// Accumulator after one more interval of error.
pub fn integrate(integration: Real, e: Real, dt: Real) -> Real {
    integration + e * dt
}

/// Backward difference of the process variable, negated.
///
/// # Errors
///
/// [`PidError::ZeroInterval`] when `dt == 0`.
pub fn derivative(previous_pv: Real, pv: Real, dt: Real) -> PidResult<Real> {
    if dt == 0.0 {
        return Err(PidError::ZeroInterval);
    }
    Ok((previous_pv - pv) / dt)
}
