//! Per-request admission outcome.

/// Result of checking one request against its bucket.
///
/// Produced by [`AdmissionController::check`](crate::AdmissionController::check)
/// and consumed by the HTTP layer to set rate limit headers and, when
/// `allowed` is false, to short-circuit with a 429.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Nominal requests-per-window of the applied policy
    pub limit: u32,
    /// Tokens left in the bucket after this check
    pub remaining: f64,
    /// Suggested wait before retrying; zero when allowed
    pub retry_after_secs: u64,
}

impl AdmissionDecision {
    /// Whole requests still available, rounded down.
    pub fn remaining_requests(&self) -> u64 {
        if self.remaining.is_finite() && self.remaining > 0.0 {
            self.remaining.floor() as u64
        } else {
            0
        }
    }

    /// Check if this decision admits the request.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Check if this decision rejects the request.
    pub fn is_rejected(&self) -> bool {
        !self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_rounds_down() {
        let decision = AdmissionDecision {
            allowed: true,
            limit: 10,
            remaining: 2.97,
            retry_after_secs: 0,
        };

        assert_eq!(decision.remaining_requests(), 2);
        assert!(decision.is_allowed());
        assert!(!decision.is_rejected());
    }

    #[test]
    fn test_remaining_never_negative() {
        let decision = AdmissionDecision {
            allowed: false,
            limit: 10,
            remaining: -0.0,
            retry_after_secs: 6,
        };

        assert_eq!(decision.remaining_requests(), 0);
        assert!(decision.is_rejected());
    }
}
