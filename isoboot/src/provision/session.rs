//! Interactive provisioning: every checkpoint first, then the stages.
//!
//! Nothing destructive runs until the operator has chosen a size, supplied
//! a credential and confirmed the wipe.

use isoboot_shared::errors::{IsobootError, IsobootResult};
use std::path::{Path, PathBuf};

use super::orchestrator::{ProvisionReport, Provisioner};
use crate::device::{BlockDevice, Enumerator, detect_new_device};
use crate::operator::{Operator, Prompt, ask_credential, ask_size, confirm};
use crate::options::IsobootOptions;
use crate::partition::{PartitionPlan, PartitionPlanner};
use crate::tools::{CommandRunner, PrivilegeGate, PrivilegedRunner};
use crate::util::invoking_user;

/// Ask for the data partition size until it fits.
///
/// `initial` is tried first without prompting. Out-of-range answers are
/// reported and asked again, unless the operator cannot be re-asked, in
/// which case the rejection ends the session. Sizes are never clamped.
pub fn prepare_plan(
    planner: &PartitionPlanner,
    device: &BlockDevice,
    operator: &mut dyn Operator,
    initial: Option<u64>,
) -> IsobootResult<PartitionPlan> {
    let range = planner.data_size_range(device.size)?;
    let prompt = Prompt::DataPartitionSize {
        min_mib: *range.start(),
        max_mib: *range.end(),
        default_mib: *range.end(),
    };

    let mut requested = initial;
    loop {
        let size = match requested.take() {
            Some(size) => size,
            None => ask_size(operator, &prompt)?,
        };
        match planner.plan(device.size, size) {
            Ok(plan) => return Ok(plan),
            Err(e) if e.is_recoverable_input() && operator.can_reprompt() => {
                tracing::debug!(requested = size, "Rejected data partition size");
                operator.notify(&e.to_string());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Obtain the privilege gate. Root runs directly; everyone else supplies
/// one credential, checked before it is used for anything.
pub fn acquire_privilege<R: CommandRunner + ?Sized>(
    runner: &R,
    operator: &mut dyn Operator,
    running_as_root: bool,
) -> IsobootResult<PrivilegeGate> {
    if running_as_root {
        return Ok(PrivilegeGate::Root);
    }
    let gate = PrivilegeGate::Sudo(ask_credential(operator)?);
    gate.validate(runner)?;
    Ok(gate)
}

pub fn confirm_destructive(
    operator: &mut dyn Operator,
    device: &BlockDevice,
    plan: &PartitionPlan,
) -> IsobootResult<()> {
    confirm(
        operator,
        &Prompt::ConfirmDestructive {
            device: device.clone(),
            plan: plan.clone(),
        },
    )
}

/// How the target device is chosen.
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// Diff enumerations around an attach prompt.
    Detect,
    /// Use this path; it must be a hotplug disk and is still confirmed.
    Path(PathBuf),
}

/// One interactive provisioning session.
pub struct SessionRequest<'a> {
    pub source: DeviceSource,
    pub data_size_mib: Option<u64>,
    pub work_dir: &'a Path,
    pub running_as_root: bool,
}

fn select_device(
    source: &DeviceSource,
    enumerator: &dyn Enumerator,
    operator: &mut dyn Operator,
) -> IsobootResult<BlockDevice> {
    match source {
        DeviceSource::Detect => detect_new_device(enumerator, operator),
        DeviceSource::Path(path) => {
            let snapshot = enumerator.snapshot()?;
            let device = snapshot.get(path).cloned().ok_or_else(|| {
                IsobootError::Storage(format!("{} is not a block device", path.display()))
            })?;
            if !device.is_candidate() {
                return Err(IsobootError::InvalidState(format!(
                    "{} is not a removable whole disk",
                    path.display()
                )));
            }
            confirm(
                operator,
                &Prompt::ConfirmDevice {
                    device: device.clone(),
                },
            )?;
            Ok(device)
        }
    }
}

/// Identify, plan, authorize, confirm, then provision.
pub fn run_session<R: CommandRunner>(
    runner: R,
    enumerator: &dyn Enumerator,
    operator: &mut dyn Operator,
    options: &IsobootOptions,
    request: SessionRequest<'_>,
) -> IsobootResult<ProvisionReport> {
    let device = select_device(&request.source, enumerator, operator)?;
    let plan = prepare_plan(&options.planner(), &device, operator, request.data_size_mib)?;
    let gate = acquire_privilege(&runner, operator, request.running_as_root)?;
    confirm_destructive(operator, &device, &plan)?;

    let runner = PrivilegedRunner::new(runner, gate);
    let owner = if options.chown_image_dir {
        invoking_user()
    } else {
        None
    };
    let mut provisioner =
        Provisioner::new(&runner, device, plan, options.clone(), request.work_dir)?
            .with_owner(owner);
    provisioner.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use crate::operator::Response;

    /// Answers every size prompt with the largest size, like `--yes`.
    struct Unattended {
        asked: usize,
    }

    impl Operator for Unattended {
        fn ask(&mut self, prompt: &Prompt) -> IsobootResult<Response> {
            self.asked += 1;
            match prompt {
                Prompt::DataPartitionSize { default_mib, .. } => Ok(Response::SizeMib(*default_mib)),
                _ => Ok(Response::Confirmed),
            }
        }

        fn notify(&mut self, _message: &str) {}

        fn can_reprompt(&self) -> bool {
            false
        }
    }

    fn usb_8g() -> BlockDevice {
        BlockDevice::new("/dev/sdb", 8 << 30, true, DeviceKind::Disk)
    }

    #[test]
    fn test_rejected_size_is_not_replaced_when_unattended() {
        let mut operator = Unattended { asked: 0 };
        let err = prepare_plan(&PartitionPlanner::default(), &usb_8g(), &mut operator, Some(100))
            .unwrap_err();
        assert!(matches!(
            err,
            IsobootError::SizeOutOfRange {
                requested: 100,
                min: 256,
                max: 8139
            }
        ));
        assert_eq!(operator.asked, 0);
    }

    #[test]
    fn test_unattended_without_size_takes_default() {
        let mut operator = Unattended { asked: 0 };
        let plan =
            prepare_plan(&PartitionPlanner::default(), &usb_8g(), &mut operator, None).unwrap();
        assert_eq!(plan.data().size_mib(), 8139);
        assert_eq!(operator.asked, 1);
    }
}
