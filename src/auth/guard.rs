//! Failed-login attempt tracking for one login session.
//!
//! The guard is an explicit value the caller stores between requests
//! (in practice: the session). It is deliberately not keyed by account,
//! so attempts spread across sessions bypass it; see DESIGN.md.

use serde::{Deserialize, Serialize};

/// Cumulative failures before the session locks.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Still accepting credential checks.
    Open { remaining: u32 },
    /// Rejects all further checks until an explicit reset.
    Locked,
}

/// Per-session attempt counter with a lockout threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginAttemptGuard {
    failed_attempts: u32,
}

impl LoginAttemptGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self { failed_attempts: 0 }
    }

    #[must_use]
    pub const fn state(&self, max_attempts: u32) -> GuardState {
        if self.failed_attempts >= max_attempts {
            GuardState::Locked
        } else {
            GuardState::Open {
                remaining: max_attempts - self.failed_attempts,
            }
        }
    }

    #[must_use]
    pub const fn is_locked(&self, max_attempts: u32) -> bool {
        matches!(self.state(max_attempts), GuardState::Locked)
    }

    #[must_use]
    pub const fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Any single factor failing counts as one failed attempt.
    pub const fn record_failure(&mut self, max_attempts: u32) -> GuardState {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.state(max_attempts)
    }

    /// A fully successful verification clears the counter.
    pub const fn record_success(&mut self) {
        self.failed_attempts = 0;
    }

    /// Explicit reset action: zero the counter and reopen.
    pub const fn reset(&mut self) {
        self.failed_attempts = 0;
    }
}
