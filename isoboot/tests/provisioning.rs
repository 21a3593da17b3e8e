//! Integration tests for the provisioning pipeline.
//!
//! All external tools are replaced by a recording runner, so these tests
//! check the exact command sequence, abort behaviour and the ordering of
//! human checkpoints relative to the first destructive command.

use isoboot::device::{BlockDevice, DeviceSnapshot, Enumerator};
use isoboot::operator::Response;
use isoboot::partition::{PartitionPlan, PartitionPlanner};
use isoboot::provision::{DeviceSource, SessionRequest, Stage, run_session};
use isoboot::tools::Credential;
use isoboot::{IsobootError, IsobootOptions, IsobootResult, ProvisionState, Provisioner};
use isoboot_test_utils::{GIB, RecordingRunner, ScriptedOperator, usb_disk, work_dir};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn plan_for(device: &BlockDevice, data_mib: u64) -> PartitionPlan {
    PartitionPlanner::default()
        .plan(device.size, data_mib)
        .unwrap()
}

fn expected_transcript(work: &Path) -> Vec<String> {
    let esp = work.join("esp");
    let data = work.join("data");
    let w = |p: &Path| p.display().to_string();
    vec![
        "parted --script /dev/sdb mklabel gpt \
         mkpart BIOS 1MiB 2MiB set 1 bios_grub on \
         mkpart EFI fat32 2MiB 52MiB set 2 esp on set 2 boot on \
         mkpart ISOS ext2 52MiB 4148MiB"
            .to_string(),
        "partprobe /dev/sdb".to_string(),
        "mkfs.fat -F 32 -n ISOBOOT_EFI /dev/sdb2".to_string(),
        "mkfs.ext2 -F -L isoboot_data /dev/sdb3".to_string(),
        format!("mount -t vfat /dev/sdb2 {}", w(&esp)),
        format!(
            "grub-install --target=i386-pc --recheck --removable --boot-directory={}/boot /dev/sdb",
            w(&esp)
        ),
        format!("umount {}", w(&esp)),
        format!("mount -t vfat /dev/sdb2 {}", w(&esp)),
        format!(
            "grub-install --target=x86_64-efi --recheck --removable --efi-directory={} --boot-directory={}/boot",
            w(&esp),
            w(&esp)
        ),
        format!("umount {}", w(&esp)),
        format!("mount -t vfat /dev/sdb2 {}", w(&esp)),
        format!(
            "install -D -m 0644 {} {}/boot/grub/grub.cfg",
            w(&work.join("grub.cfg")),
            w(&esp)
        ),
        format!("umount {}", w(&esp)),
        format!("mount -t ext2 /dev/sdb3 {}", w(&data)),
        format!("mkdir -p {}/isos", w(&data)),
        format!("umount {}", w(&data)),
    ]
}

/// Replays snapshots in order.
struct SequenceEnumerator(RefCell<VecDeque<DeviceSnapshot>>);

impl SequenceEnumerator {
    fn new(snapshots: impl IntoIterator<Item = DeviceSnapshot>) -> Self {
        Self(RefCell::new(snapshots.into_iter().collect()))
    }
}

impl Enumerator for SequenceEnumerator {
    fn snapshot(&self) -> IsobootResult<DeviceSnapshot> {
        self.0
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| IsobootError::Internal("no more snapshots".to_string()))
    }
}

fn no_chown() -> IsobootOptions {
    IsobootOptions {
        chown_image_dir: false,
        ..Default::default()
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

#[test]
fn full_run_issues_stages_in_order() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let device = usb_disk("/dev/sdb", 8);
    let plan = plan_for(&device, 4096);

    let mut provisioner =
        Provisioner::new(&runner, device, plan, no_chown(), work.path()).unwrap();
    assert_eq!(provisioner.state(), ProvisionState::Planned);

    let report = provisioner.run().unwrap();
    assert_eq!(report.state, ProvisionState::Done);
    assert!(report.is_success());
    assert_eq!(
        report.stages.iter().map(|s| s.stage).collect::<Vec<_>>(),
        Stage::ALL.to_vec()
    );
    assert_eq!(runner.transcript(), expected_transcript(work.path()));
    assert!(runner.calls().iter().all(|c| c.privileged));

    let staged = std::fs::read_to_string(work.path().join("grub.cfg")).unwrap();
    assert!(staged.contains("isoboot_data"));
}

#[test]
fn rerun_issues_identical_transcript() {
    let work = work_dir();
    let device = usb_disk("/dev/sdb", 8);
    let plan = plan_for(&device, 4096);

    let first = RecordingRunner::new();
    Provisioner::new(&first, device.clone(), plan.clone(), no_chown(), work.path())
        .unwrap()
        .run()
        .unwrap();

    let second = RecordingRunner::new();
    Provisioner::new(&second, device, plan, no_chown(), work.path())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(first.transcript(), second.transcript());
}

#[test]
fn failing_stage_aborts_and_unmounts() {
    let runner = RecordingRunner::new().fail_when("--target=x86_64-efi", 1, "no EFI support");
    let work = work_dir();
    let device = usb_disk("/dev/sdb", 8);
    let plan = plan_for(&device, 4096);

    let mut provisioner =
        Provisioner::new(&runner, device, plan, no_chown(), work.path()).unwrap();
    let err = provisioner.run().unwrap_err();

    match err {
        IsobootError::ToolFailed { tool, status, stderr } => {
            assert_eq!(tool, "grub-install");
            assert_eq!(status, Some(1));
            assert_eq!(stderr, "no EFI support");
        }
        other => panic!("expected ToolFailed, got {other}"),
    }
    assert_eq!(provisioner.state(), ProvisionState::Aborted);

    let report = provisioner.report();
    assert_eq!(report.failed_stage, Some(Stage::InstallUefi));
    assert_eq!(report.stages.len(), 4);

    let transcript = runner.transcript();
    assert_eq!(
        transcript.last().unwrap(),
        &format!("umount {}", work.path().join("esp").display())
    );
    assert_eq!(runner.count("mount"), runner.count("umount"));
    assert_eq!(runner.count("install"), 0);
    assert_eq!(runner.count("mkdir"), 0);
}

#[test]
fn partition_failure_stops_everything() {
    let runner = RecordingRunner::new().fail_when("parted", 1, "Error: device busy");
    let work = work_dir();
    let device = usb_disk("/dev/sdb", 8);
    let plan = plan_for(&device, 4096);

    let mut provisioner =
        Provisioner::new(&runner, device, plan, no_chown(), work.path()).unwrap();
    assert!(provisioner.run().is_err());
    assert_eq!(runner.transcript().len(), 1);
    assert_eq!(provisioner.report().failed_stage, Some(Stage::Partition));
}

#[test]
fn provisioner_runs_once() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let device = usb_disk("/dev/sdb", 8);
    let plan = plan_for(&device, 4096);

    let mut provisioner =
        Provisioner::new(&runner, device, plan, no_chown(), work.path()).unwrap();
    provisioner.run().unwrap();
    assert!(matches!(
        provisioner.run(),
        Err(IsobootError::InvalidState(_))
    ));
}

#[test]
fn plan_larger_than_device_is_rejected() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let plan = plan_for(&usb_disk("/dev/sdb", 16), 12 * 1024);

    let result = Provisioner::new(
        &runner,
        usb_disk("/dev/sdb", 8),
        plan,
        no_chown(),
        work.path(),
    );
    assert!(matches!(result, Err(IsobootError::InvalidState(_))));
    assert!(runner.transcript().is_empty());
}

#[test]
fn image_directory_handed_to_owner() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let device = usb_disk("/dev/sdb", 8);
    let plan = plan_for(&device, 4096);

    Provisioner::new(&runner, device, plan, IsobootOptions::default(), work.path())
        .unwrap()
        .with_owner(Some((1000, 1000)))
        .run()
        .unwrap();

    let image_dir = work.path().join("data").join("isos");
    assert!(
        runner
            .transcript()
            .contains(&format!("chown 1000:1000 {}", image_dir.display()))
    );
}

#[test]
fn nvme_partitions_use_separator() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let device = usb_disk("/dev/nvme0n1", 8);
    let plan = plan_for(&device, 1024);

    Provisioner::new(&runner, device, plan, no_chown(), work.path())
        .unwrap()
        .run()
        .unwrap();

    let transcript = runner.transcript();
    assert!(transcript.contains(&"mkfs.fat -F 32 -n ISOBOOT_EFI /dev/nvme0n1p2".to_string()));
    assert!(transcript.contains(&"mkfs.ext2 -F -L isoboot_data /dev/nvme0n1p3".to_string()));
}

// ============================================================================
// INTERACTIVE SESSION
// ============================================================================

fn detect_sequence() -> SequenceEnumerator {
    let fixed = BlockDevice::new("/dev/sda", 500 * GIB, false, isoboot::DeviceKind::Disk);
    SequenceEnumerator::new([
        DeviceSnapshot::new([fixed.clone()]),
        DeviceSnapshot::new([fixed, usb_disk("/dev/sdb", 8)]),
    ])
}

#[test]
fn session_prompts_before_any_destructive_command() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let mut operator = ScriptedOperator::new([
        Response::Confirmed,
        Response::Confirmed,
        Response::SizeMib(100),
        Response::SizeMib(4096),
        Response::Secret(Credential::new("pw")),
        Response::Confirmed,
    ]);

    let report = run_session(
        &runner,
        &detect_sequence(),
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Detect,
            data_size_mib: None,
            work_dir: work.path(),
            running_as_root: false,
        },
    )
    .unwrap();

    assert_eq!(report.state, ProvisionState::Done);
    assert_eq!(report.plan.data().size_mib(), 4096);
    assert_eq!(
        operator.prompts(),
        &[
            "attach-device",
            "confirm-device",
            "data-partition-size",
            "data-partition-size",
            "credential",
            "confirm-destructive",
        ]
    );
    assert_eq!(operator.notifications().len(), 1);
    assert!(operator.notifications()[0].contains("out of range"));

    let calls = runner.calls();
    assert_eq!(calls[0].args, vec!["-S", "-p", "", "-v"]);
    assert!(calls[1..].iter().all(|c| c.program == "sudo"));
    assert!(calls[1].args.contains(&"parted".to_string()));
    assert!(calls.iter().all(|c| c.stdin.as_deref().is_some_and(|s| s.starts_with("pw\n"))));
}

#[test]
fn declining_destructive_confirmation_runs_nothing() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let mut operator = ScriptedOperator::new([
        Response::Confirmed,
        Response::Confirmed,
        Response::Secret(Credential::new("pw")),
        Response::Declined,
    ]);

    let err = run_session(
        &runner,
        &detect_sequence(),
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Detect,
            data_size_mib: Some(2048),
            work_dir: work.path(),
            running_as_root: false,
        },
    )
    .unwrap_err();

    assert!(matches!(err, IsobootError::Cancelled(ref p) if p == "confirm-destructive"));
    // Only the credential check ran.
    assert_eq!(runner.transcript().len(), 1);
    assert_eq!(runner.count("sudo"), 1);
}

#[test]
fn root_skips_credential_prompt() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let mut operator = ScriptedOperator::new([
        Response::Confirmed,
        Response::Confirmed,
        Response::Confirmed,
    ]);

    let report = run_session(
        &runner,
        &detect_sequence(),
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Detect,
            data_size_mib: Some(4096),
            work_dir: work.path(),
            running_as_root: true,
        },
    )
    .unwrap();

    assert!(report.is_success());
    assert!(!operator.prompts().contains(&"credential".to_string()));
    assert_eq!(runner.transcript(), expected_transcript(work.path()));
}

#[test]
fn rejected_credential_stops_before_partitioning() {
    let runner = RecordingRunner::new().fail_when("sudo -S -p  -v", 1, "Sorry, try again.");
    let work = work_dir();
    let mut operator = ScriptedOperator::new([
        Response::Confirmed,
        Response::Confirmed,
        Response::Secret(Credential::new("wrong")),
    ]);

    let err = run_session(
        &runner,
        &detect_sequence(),
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Detect,
            data_size_mib: Some(4096),
            work_dir: work.path(),
            running_as_root: false,
        },
    )
    .unwrap_err();

    assert!(matches!(err, IsobootError::ToolFailed { ref tool, .. } if tool == "sudo"));
    assert_eq!(runner.transcript().len(), 1);
    assert!(!operator.prompts().contains(&"confirm-destructive".to_string()));
}

#[test]
fn ambiguous_attach_stops_session() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let enumerator = SequenceEnumerator::new([
        DeviceSnapshot::default(),
        DeviceSnapshot::new([usb_disk("/dev/sdb", 8), usb_disk("/dev/sdc", 16)]),
    ]);
    let mut operator = ScriptedOperator::new([Response::Confirmed]);

    let err = run_session(
        &runner,
        &enumerator,
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Detect,
            data_size_mib: None,
            work_dir: work.path(),
            running_as_root: true,
        },
    )
    .unwrap_err();

    assert!(err.is_ambiguous_environment());
    assert_eq!(operator.prompts(), &["attach-device"]);
    assert!(runner.transcript().is_empty());
}

#[test]
fn explicit_fixed_disk_is_refused() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let fixed = BlockDevice::new("/dev/sda", 500 * GIB, false, isoboot::DeviceKind::Disk);
    let enumerator = SequenceEnumerator::new([DeviceSnapshot::new([fixed])]);
    let mut operator = ScriptedOperator::default();

    let err = run_session(
        &runner,
        &enumerator,
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Path("/dev/sda".into()),
            data_size_mib: None,
            work_dir: work.path(),
            running_as_root: true,
        },
    )
    .unwrap_err();

    assert!(matches!(err, IsobootError::InvalidState(_)));
    assert!(operator.prompts().is_empty());
}

#[test]
fn too_small_device_fails_before_prompting_for_size() {
    let runner = RecordingRunner::new();
    let work = work_dir();
    let tiny = BlockDevice::new("/dev/sdb", 128 * 1024 * 1024, true, isoboot::DeviceKind::Disk);
    let enumerator = SequenceEnumerator::new([DeviceSnapshot::new([tiny])]);
    let mut operator = ScriptedOperator::new([Response::Confirmed]);

    let err = run_session(
        &runner,
        &enumerator,
        &mut operator,
        &no_chown(),
        SessionRequest {
            source: DeviceSource::Path("/dev/sdb".into()),
            data_size_mib: None,
            work_dir: work.path(),
            running_as_root: true,
        },
    )
    .unwrap_err();

    assert!(matches!(err, IsobootError::DeviceTooSmall { .. }));
    assert_eq!(operator.prompts(), &["confirm-device"]);
}
