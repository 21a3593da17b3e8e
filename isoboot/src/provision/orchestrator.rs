//! Sequential stage runner.

use chrono::{DateTime, Utc};
use isoboot_shared::constants::geometry;
use isoboot_shared::errors::{IsobootError, IsobootResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::stages::{Stage, StageContext};
use super::state::{ProvisionState, ProvisionStatus};
use crate::device::BlockDevice;
use crate::options::IsobootOptions;
use crate::partition::{PartitionPlan, usable_mib};
use crate::tools::CommandRunner;

/// Timing of one completed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Outcome of a provisioning run, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub device: BlockDevice,
    pub plan: PartitionPlan,
    pub state: ProvisionState,
    pub stages: Vec<StageMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ProvisionReport {
    pub fn is_success(&self) -> bool {
        self.state == ProvisionState::Done
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.stages.iter().map(|s| s.duration_ms).sum()
    }
}

/// Runs the stage table against one device, once.
///
/// There is no resume: a failed run leaves the device in an unspecified
/// state and must be started again from the partition stage.
pub struct Provisioner<'r> {
    runner: &'r dyn CommandRunner,
    device: BlockDevice,
    plan: PartitionPlan,
    options: IsobootOptions,
    work_dir: PathBuf,
    owner: Option<(u32, u32)>,
    status: ProvisionStatus,
    stages: Vec<StageMetrics>,
    failed_stage: Option<Stage>,
    error: Option<String>,
    started_at: DateTime<Utc>,
}

impl<'r> Provisioner<'r> {
    /// Accept `plan` for `device`. Fails if the plan does not fit.
    pub fn new(
        runner: &'r dyn CommandRunner,
        device: BlockDevice,
        plan: PartitionPlan,
        options: IsobootOptions,
        work_dir: impl Into<PathBuf>,
    ) -> IsobootResult<Self> {
        plan.validate()?;
        let device_end = geometry::LEADING_GAP_MIB + usable_mib(device.size);
        if plan.data().end_mib > device_end {
            return Err(IsobootError::InvalidState(format!(
                "plan ends at {} MiB but {} only has room up to {} MiB",
                plan.data().end_mib,
                device.path.display(),
                device_end
            )));
        }

        let mut status = ProvisionStatus::new();
        status.transition_to(ProvisionState::Planned)?;

        Ok(Self {
            runner,
            device,
            plan,
            options,
            work_dir: work_dir.into(),
            owner: None,
            status,
            stages: Vec::new(),
            failed_stage: None,
            error: None,
            started_at: Utc::now(),
        })
    }

    /// Hand the image directory to this uid/gid.
    pub fn with_owner(mut self, owner: Option<(u32, u32)>) -> Self {
        self.owner = owner;
        self
    }

    pub fn state(&self) -> ProvisionState {
        self.status.state
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run every stage in order. The first failure aborts the run.
    pub fn run(&mut self) -> IsobootResult<ProvisionReport> {
        if self.status.state != ProvisionState::Planned {
            return Err(IsobootError::InvalidState(format!(
                "provisioning already ran (state {})",
                self.status.state
            )));
        }

        tracing::info!(
            device = %self.device.path.display(),
            data_mib = self.plan.data().size_mib(),
            "Provisioning device"
        );
        self.started_at = Utc::now();

        for stage in Stage::ALL {
            if let Err(e) = self.run_stage(stage) {
                tracing::error!(stage = %stage, error = %e, "Provisioning aborted");
                self.failed_stage = Some(stage);
                self.error = Some(e.to_string());
                self.status.transition_to(ProvisionState::Aborted)?;
                return Err(e);
            }
        }

        self.status.transition_to(ProvisionState::Done)?;
        let report = self.report();
        tracing::info!(
            device = %self.device.path.display(),
            duration_ms = report.total_duration_ms(),
            "Provisioning complete"
        );
        Ok(report)
    }

    fn run_stage(&mut self, stage: Stage) -> IsobootResult<()> {
        let ctx = StageContext {
            runner: self.runner,
            device: &self.device,
            plan: &self.plan,
            options: &self.options,
            work_dir: &self.work_dir,
            owner: self.owner,
        };

        tracing::info!(stage = %stage, "Running stage");
        let started_at = Utc::now();
        let timer = Instant::now();
        stage.run(&ctx)?;
        let duration_ms = timer.elapsed().as_millis() as u64;
        tracing::debug!(stage = %stage, duration_ms, "Stage complete");

        self.stages.push(StageMetrics {
            stage,
            started_at,
            duration_ms,
        });
        if let Some(state) = stage.completes() {
            self.status.transition_to(state)?;
        }
        Ok(())
    }

    /// Snapshot of the run so far; after a failure it names the stage.
    pub fn report(&self) -> ProvisionReport {
        ProvisionReport {
            device: self.device.clone(),
            plan: self.plan.clone(),
            state: self.status.state,
            stages: self.stages.clone(),
            failed_stage: self.failed_stage,
            error: self.error.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
