//! Maps `Box<dyn Error>` from trait boundaries to typed `GuardError`.
//!
//! The traits in `wattguard_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `wattguard_hardware::HwError` downcasting.

use crate::error::GuardError;

/// Map a trait-boundary error to a typed `GuardError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> GuardError {
    #[cfg(feature = "hardware-errors")]
    {
        use wattguard_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::ConversionTimeout => GuardError::Timeout,
                HwError::ReplayExhausted => GuardError::SourceExhausted,
                other => GuardError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") {
        GuardError::Timeout
    } else if lower.contains("exhausted") {
        GuardError::SourceExhausted
    } else {
        GuardError::Hardware(s)
    }
}

/// True when `err` is (or wraps) the given `GuardError` variant class.
pub fn is_timeout(err: &eyre::Report) -> bool {
    matches!(err.downcast_ref::<GuardError>(), Some(GuardError::Timeout))
}

/// True when the sample source reported that it has no more readings.
pub fn is_exhausted(err: &eyre::Report) -> bool {
    matches!(
        err.downcast_ref::<GuardError>(),
        Some(GuardError::SourceExhausted)
    )
}
