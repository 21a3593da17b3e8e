//! Provisioning lifecycle.

use chrono::{DateTime, Utc};
use isoboot_shared::errors::{IsobootError, IsobootResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a provisioning run stands.
///
/// Transitions:
/// ```text
/// Identified → Planned → Partitioned → Formatted → BiosInstalled
///   → UefiInstalled → ConfigInstalled → DirectoryReady → Done
///
/// any non-terminal state → Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisionState {
    /// Target device resolved and confirmed.
    Identified,
    /// Partition plan computed and accepted.
    Planned,
    Partitioned,
    Formatted,
    BiosInstalled,
    UefiInstalled,
    ConfigInstalled,
    DirectoryReady,
    Done,
    /// A stage failed; the device is in an unspecified state.
    Aborted,
}

impl ProvisionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisionState::Done | ProvisionState::Aborted)
    }

    pub fn can_transition_to(&self, target: ProvisionState) -> bool {
        use ProvisionState::*;
        if target == Aborted {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Identified, Planned)
                | (Planned, Partitioned)
                | (Partitioned, Formatted)
                | (Formatted, BiosInstalled)
                | (BiosInstalled, UefiInstalled)
                | (UefiInstalled, ConfigInstalled)
                | (ConfigInstalled, DirectoryReady)
                | (DirectoryReady, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionState::Identified => "identified",
            ProvisionState::Planned => "planned",
            ProvisionState::Partitioned => "partitioned",
            ProvisionState::Formatted => "formatted",
            ProvisionState::BiosInstalled => "bios-installed",
            ProvisionState::UefiInstalled => "uefi-installed",
            ProvisionState::ConfigInstalled => "config-installed",
            ProvisionState::DirectoryReady => "directory-ready",
            ProvisionState::Done => "done",
            ProvisionState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus when it was entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionStatus {
    pub state: ProvisionState,
    pub last_updated: DateTime<Utc>,
}

impl ProvisionStatus {
    pub fn new() -> Self {
        Self {
            state: ProvisionState::Identified,
            last_updated: Utc::now(),
        }
    }

    pub fn transition_to(&mut self, target: ProvisionState) -> IsobootResult<()> {
        if !self.state.can_transition_to(target) {
            return Err(IsobootError::InvalidState(format!(
                "Cannot transition from {} to {}",
                self.state, target
            )));
        }
        tracing::debug!(from = %self.state, to = %target, "Provision state changed");
        self.state = target;
        self.last_updated = Utc::now();
        Ok(())
    }
}

impl Default for ProvisionStatus {
    fn default() -> Self {
        Self::new()
    }
}
