//! Progressive account-lockout policy.
//!
//! Three failed password checks inside a lockout window lock the account.
//! The lockout duration escalates with the account's cumulative lockout
//! count, which only ever grows: 15 minutes for a first lockout, 30 for a
//! second, 60 from the third on. Successful logins reset the per-window
//! attempt counter but never the cumulative count.

use chrono::{DateTime, Duration, Utc};

/// Failed password checks allowed before the account locks.
pub const MAX_FAILED_ATTEMPTS: i32 = 3;

/// Lockout duration for the lockout about to start, keyed by how many
/// lockouts the account has accumulated so far.
pub fn lockout_duration(cumulative_count: i32) -> Duration {
    match cumulative_count {
        i32::MIN..=0 => Duration::minutes(15),
        1 => Duration::minutes(30),
        _ => Duration::minutes(60),
    }
}

/// What the state machine should do with a failed password check, given the
/// post-increment attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAttemptOutcome {
    /// Below the threshold; report how many attempts are left.
    AttemptsRemaining(i32),
    /// Threshold reached; lock for the given duration and bump the
    /// cumulative count.
    Lock { minutes: i64 },
}

pub fn on_failed_attempt(new_attempt_count: i32, cumulative_count: i32) -> FailedAttemptOutcome {
    if new_attempt_count >= MAX_FAILED_ATTEMPTS {
        FailedAttemptOutcome::Lock {
            minutes: lockout_duration(cumulative_count).num_minutes(),
        }
    } else {
        FailedAttemptOutcome::AttemptsRemaining(MAX_FAILED_ATTEMPTS - new_attempt_count)
    }
}

/// Lockout gate evaluated before the password is ever touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lockout on record.
    NotLocked,
    /// Window still open; reject with the remaining minutes.
    Locked { minutes_remaining: i64 },
    /// Window has lapsed; clear it and reset the counter before continuing.
    Lapsed,
}

pub fn check_lock(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LockState {
    match locked_until {
        None => LockState::NotLocked,
        Some(until) if until > now => LockState::Locked {
            minutes_remaining: minutes_remaining(until, now),
        },
        Some(_) => LockState::Lapsed,
    }
}

/// Whole minutes until the window ends, rounded up so a lock with 20
/// seconds left still reports 1 minute.
pub fn minutes_remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (until - now).num_seconds().max(0);
    (seconds + 59) / 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_escalates_with_cumulative_count() {
        assert_eq!(lockout_duration(0), Duration::minutes(15));
        assert_eq!(lockout_duration(1), Duration::minutes(30));
        assert_eq!(lockout_duration(2), Duration::minutes(60));
        assert_eq!(lockout_duration(7), Duration::minutes(60));
    }

    #[test]
    fn third_failure_always_locks() {
        assert_eq!(
            on_failed_attempt(1, 0),
            FailedAttemptOutcome::AttemptsRemaining(2)
        );
        assert_eq!(
            on_failed_attempt(2, 0),
            FailedAttemptOutcome::AttemptsRemaining(1)
        );
        assert_eq!(
            on_failed_attempt(3, 0),
            FailedAttemptOutcome::Lock { minutes: 15 }
        );
        // A counter that somehow overshoots still locks, never a fourth chance.
        assert_eq!(
            on_failed_attempt(4, 0),
            FailedAttemptOutcome::Lock { minutes: 15 }
        );
    }

    #[test]
    fn lock_duration_follows_history_at_lock_time() {
        assert_eq!(
            on_failed_attempt(3, 1),
            FailedAttemptOutcome::Lock { minutes: 30 }
        );
        assert_eq!(
            on_failed_attempt(3, 2),
            FailedAttemptOutcome::Lock { minutes: 60 }
        );
        assert_eq!(
            on_failed_attempt(3, 9),
            FailedAttemptOutcome::Lock { minutes: 60 }
        );
    }

    #[test]
    fn future_lock_rejects_with_remaining_minutes() {
        let now = Utc::now();
        let state = check_lock(Some(now + Duration::minutes(14) + Duration::seconds(20)), now);
        assert_eq!(
            state,
            LockState::Locked {
                minutes_remaining: 15
            }
        );
    }

    #[test]
    fn past_lock_is_lazily_cleared() {
        let now = Utc::now();
        assert_eq!(check_lock(Some(now - Duration::seconds(1)), now), LockState::Lapsed);
        assert_eq!(check_lock(None, now), LockState::NotLocked);
    }

    #[test]
    fn remaining_minutes_round_up_and_never_go_negative() {
        let now = Utc::now();
        assert_eq!(minutes_remaining(now + Duration::seconds(20), now), 1);
        assert_eq!(minutes_remaining(now + Duration::minutes(30), now), 30);
        assert_eq!(minutes_remaining(now - Duration::minutes(5), now), 0);
    }
}
