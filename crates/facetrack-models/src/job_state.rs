//! Media job lifecycle states.
//!
//! The service reports a job's state as a small integer. A job is only
//! finished once its `EndTime` is set; the state code is informational.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job state as reported by the `State` property of a job entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Scheduled,
    Processing,
    Finished,
    Error,
    Canceled,
    Canceling,
}

impl JobState {
    /// Parse a state code (`"0"` through `"6"`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(JobState::Queued),
            "1" => Some(JobState::Scheduled),
            "2" => Some(JobState::Processing),
            "3" => Some(JobState::Finished),
            "4" => Some(JobState::Error),
            "5" => Some(JobState::Canceled),
            "6" => Some(JobState::Canceling),
            _ => None,
        }
    }

    /// Numeric code used on the wire.
    pub fn code(&self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Scheduled => 1,
            JobState::Processing => 2,
            JobState::Finished => 3,
            JobState::Error => 4,
            JobState::Canceled => 5,
            JobState::Canceling => 6,
        }
    }

    /// Human label for the state.
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Queued => "Queued",
            JobState::Scheduled => "Scheduled",
            JobState::Processing => "Processing",
            JobState::Finished => "Finished",
            JobState::Error => "Error",
            JobState::Canceled => "Canceled",
            JobState::Canceling => "Canceling",
        }
    }

    /// Check if no further state changes are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Error | JobState::Canceled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Translate a raw state code into its label.
///
/// Unknown codes translate to an empty label rather than an error, so a
/// service that introduces new states never breaks a polling loop.
pub fn translate_job_state(code: &str) -> &'static str {
    JobState::from_code(code).map(|s| s.label()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_all_known_codes() {
        let expected = [
            ("0", "Queued"),
            ("1", "Scheduled"),
            ("2", "Processing"),
            ("3", "Finished"),
            ("4", "Error"),
            ("5", "Canceled"),
            ("6", "Canceling"),
        ];

        for (code, label) in expected {
            assert_eq!(translate_job_state(code), label, "code {}", code);
        }
    }

    #[test]
    fn test_translate_unknown_code_is_empty() {
        assert_eq!(translate_job_state("7"), "");
        assert_eq!(translate_job_state("-1"), "");
        assert_eq!(translate_job_state(""), "");
        assert_eq!(translate_job_state("Queued"), "");
        assert_eq!(translate_job_state(" 1"), "");
    }

    #[test]
    fn test_code_roundtrip() {
        for code in 0..=6u8 {
            let state = JobState::from_code(&code.to_string()).unwrap();
            assert_eq!(state.code(), code);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Finished.is_terminal());
        assert!(JobState::Error.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Canceling.is_terminal());
    }
}
