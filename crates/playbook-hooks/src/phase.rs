use std::fmt;
use std::str::FromStr;

use playbook_core::PlaybookError;
use serde::{Deserialize, Serialize};

/// The four lifecycle phases every invocation runs through.
///
/// `Before` and `After` bracket the body; `OnError` runs instead of `After`
/// when the body fails (and may recover it); `OnTeardown` always runs last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Before,
    After,
    OnError,
    OnTeardown,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Before, Phase::After, Phase::OnError, Phase::OnTeardown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
            Phase::OnError => "on_error",
            Phase::OnTeardown => "on_teardown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = PlaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Phase::Before),
            "after" => Ok(Phase::After),
            "on_error" => Ok(Phase::OnError),
            "on_teardown" => Ok(Phase::OnTeardown),
            _ => Err(PlaybookError::UnknownPhase { phase: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let err = "during".parse::<Phase>().unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_PHASE");
        assert!(err.to_string().contains("during"));
    }
}
