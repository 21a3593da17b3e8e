//! Boot menu state machine.
//!
//! ```text
//! Idle → Scanning → Probing* → MenuBuilt → Selected → ChainLoading → ReturnedToMenu
//!                                  ↑                                       │
//!                                  └───────────────────────────────────────┘
//!                                   Selected → Halted | Rebooted
//! ```
//!
//! The scan happens once per boot; returning from a nested configuration
//! shows the same menu again.

use isoboot_shared::ProvisionedLayout;
use isoboot_shared::errors::{IsobootError, IsobootResult};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::env::{BootEnvironment, ChainOutcome};
use crate::menu::{Menu, MenuEntry};
use crate::probe::{self, ProbeOutcome};
use crate::scan;
use crate::scope::ExecutionScope;
use crate::slot::LoopbackSlot;

/// What to do when a candidate has no nested configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeFailurePolicy {
    /// Block until the operator acknowledges, then skip the candidate.
    #[default]
    Acknowledge,
    /// Log and skip without prompting (unattended use).
    SilentSkip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverState {
    Idle,
    Scanning,
    Probing,
    MenuBuilt,
    Selected,
    ChainLoading,
    ReturnedToMenu,
    Halted,
    Rebooted,
}

impl ResolverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolverState::Halted | ResolverState::Rebooted)
    }

    pub fn can_transition_to(&self, target: ResolverState) -> bool {
        use ResolverState::*;
        matches!(
            (self, target),
            (Idle, Scanning)
                | (Scanning, Probing)
                | (Scanning, MenuBuilt)
                | (Probing, Probing)
                | (Probing, MenuBuilt)
                | (MenuBuilt, Selected)
                | (Selected, ChainLoading)
                | (Selected, Halted)
                | (Selected, Rebooted)
                | (ChainLoading, ReturnedToMenu)
                | (ReturnedToMenu, MenuBuilt)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverState::Idle => "idle",
            ResolverState::Scanning => "scanning",
            ResolverState::Probing => "probing",
            ResolverState::MenuBuilt => "menu-built",
            ResolverState::Selected => "selected",
            ResolverState::ChainLoading => "chain-loading",
            ResolverState::ReturnedToMenu => "returned-to-menu",
            ResolverState::Halted => "halted",
            ResolverState::Rebooted => "rebooted",
        }
    }
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator choice on the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Entry(usize),
    Halt,
    Reboot,
}

/// Presents the menu and returns the operator's choice.
pub trait MenuSelector {
    fn select(&mut self, menu: &Menu) -> Selection;
}

/// How a boot session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootExit {
    Halt,
    Reboot,
}

pub struct BootMenuResolver<E: BootEnvironment> {
    env: E,
    slot: LoopbackSlot,
    layout: ProvisionedLayout,
    policy: ProbeFailurePolicy,
    state: ResolverState,
    menu: Option<Menu>,
}

impl<E: BootEnvironment> BootMenuResolver<E> {
    pub fn new(env: E, layout: ProvisionedLayout) -> Self {
        Self {
            env,
            slot: LoopbackSlot::new(),
            layout,
            policy: ProbeFailurePolicy::default(),
            state: ResolverState::Idle,
            menu: None,
        }
    }

    pub fn with_policy(mut self, policy: ProbeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn into_env(self) -> E {
        self.env
    }

    /// Menu built by the last scan, if any.
    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    fn transition(&mut self, target: ResolverState) -> IsobootResult<()> {
        if !self.state.can_transition_to(target) {
            return Err(IsobootError::InvalidState(format!(
                "boot menu cannot go from {} to {}",
                self.state, target
            )));
        }
        tracing::trace!(from = %self.state, to = %target, "Boot menu transition");
        self.state = target;
        Ok(())
    }

    /// Scan the image directory, probe every candidate and build the menu.
    pub fn build_menu(&mut self) -> IsobootResult<Menu> {
        self.transition(ResolverState::Scanning)?;
        let candidates = scan::scan(&mut self.env, &self.layout);

        let mut entries = Vec::new();
        for candidate in &candidates {
            self.transition(ResolverState::Probing)?;
            match probe::probe(&mut self.slot, &mut self.env, candidate, &self.layout) {
                ProbeOutcome::Attachable { config, .. } => {
                    entries.push(MenuEntry::new(candidate.path.clone(), config));
                }
                ProbeOutcome::Skippable { reason } => {
                    tracing::warn!(image = %candidate.path, reason = %reason, "Skipping image");
                    if self.policy == ProbeFailurePolicy::Acknowledge {
                        self.env.acknowledge(&format!(
                            "{}\nPress any key to skip this image.",
                            reason
                        ));
                    }
                }
            }
        }

        self.transition(ResolverState::MenuBuilt)?;
        tracing::info!(
            scanned = candidates.len(),
            entries = entries.len(),
            "Boot menu built"
        );

        let menu = Menu::new(entries);
        self.menu = Some(menu.clone());
        Ok(menu)
    }

    /// Chain-load menu entry `index` and come back to the menu.
    ///
    /// The root binding and the loopback slot are restored whatever the
    /// nested configuration does.
    pub fn chain_load(&mut self, index: usize) -> IsobootResult<ChainOutcome> {
        let entry = self
            .menu
            .as_ref()
            .and_then(|menu| menu.entry(index))
            .cloned()
            .ok_or_else(|| IsobootError::InvalidState(format!("no menu entry {}", index)))?;

        self.transition(ResolverState::Selected)?;
        self.transition(ResolverState::ChainLoading)?;

        let chained = ExecutionScope::enter(
            &mut self.slot,
            &mut self.env,
            &entry,
            &self.layout.image_path_var,
        )
        .map(|mut scope| scope.chain_load());

        let outcome = match chained {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("cannot attach {}: {}", entry.image, e);
                tracing::error!(image = %entry.image, error = %e, "Chain-load failed");
                self.env.acknowledge(&message);
                ChainOutcome::Failed(message)
            }
        };

        self.transition(ResolverState::ReturnedToMenu)?;
        self.transition(ResolverState::MenuBuilt)?;
        Ok(outcome)
    }

    /// Full boot session: build the menu once, then serve selections until
    /// the operator halts or reboots.
    pub fn run<S: MenuSelector>(&mut self, selector: &mut S) -> IsobootResult<BootExit> {
        let menu = self.build_menu()?;

        loop {
            match selector.select(&menu) {
                Selection::Entry(index) if index < menu.len() => {
                    self.chain_load(index)?;
                }
                Selection::Entry(index) => {
                    tracing::warn!(index, "Ignoring selection outside the menu");
                }
                Selection::Halt => {
                    self.transition(ResolverState::Selected)?;
                    self.transition(ResolverState::Halted)?;
                    return Ok(BootExit::Halt);
                }
                Selection::Reboot => {
                    self.transition(ResolverState::Selected)?;
                    self.transition(ResolverState::Rebooted)?;
                    return Ok(BootExit::Reboot);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use ResolverState::*;
        assert!(Idle.can_transition_to(Scanning));
        assert!(Scanning.can_transition_to(MenuBuilt));
        assert!(Probing.can_transition_to(Probing));
        assert!(Selected.can_transition_to(Halted));
        assert!(ChainLoading.can_transition_to(ReturnedToMenu));
        assert!(ReturnedToMenu.can_transition_to(MenuBuilt));
    }

    #[test]
    fn test_invalid_transitions() {
        use ResolverState::*;
        assert!(!Idle.can_transition_to(MenuBuilt));
        assert!(!MenuBuilt.can_transition_to(ChainLoading));
        assert!(!ChainLoading.can_transition_to(MenuBuilt));
        assert!(!Halted.can_transition_to(Scanning));
        assert!(Halted.is_terminal());
    }
}
