//! Before/after device resolution.

use isoboot_shared::errors::{IsobootError, IsobootResult};
use std::collections::BTreeSet;

use super::enumerate::Enumerator;
use super::model::{BlockDevice, DeviceSnapshot};
use crate::operator::{Operator, Prompt, confirm};

/// The single candidate disk present in `after` but not in `before`.
///
/// Only hotplug whole disks count. Devices that disappeared are ignored.
pub fn resolve_new_device(
    before: &DeviceSnapshot,
    after: &DeviceSnapshot,
) -> IsobootResult<BlockDevice> {
    let known: BTreeSet<&BlockDevice> = before.candidates().collect();
    let mut added: Vec<&BlockDevice> = after
        .candidates()
        .filter(|device| !known.contains(device))
        .collect();

    match added.len() {
        0 => Err(IsobootError::NoDeviceDetected),
        1 => Ok(added.remove(0).clone()),
        _ => Err(IsobootError::AmbiguousDevice {
            paths: added.into_iter().map(|d| d.path.clone()).collect(),
        }),
    }
}

/// Interactive identification: snapshot, ask the operator to plug the
/// device in, snapshot again, resolve, then confirm the result.
pub fn detect_new_device(
    enumerator: &dyn Enumerator,
    operator: &mut dyn Operator,
) -> IsobootResult<BlockDevice> {
    let before = enumerator.snapshot()?;
    confirm(operator, &Prompt::AttachDevice)?;
    let after = enumerator.snapshot()?;

    let device = resolve_new_device(&before, &after)?;
    tracing::info!(device = %device.path.display(), size = device.size, "Detected new device");

    confirm(
        operator,
        &Prompt::ConfirmDevice {
            device: device.clone(),
        },
    )?;
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use proptest::prelude::*;

    fn disk(path: &str) -> BlockDevice {
        BlockDevice::new(path, 8 << 30, true, DeviceKind::Disk)
    }

    #[test]
    fn test_single_new_device() {
        let before = DeviceSnapshot::new([disk("/dev/sda")]);
        let after = DeviceSnapshot::new([disk("/dev/sda"), disk("/dev/sdb")]);
        assert_eq!(
            resolve_new_device(&before, &after).unwrap().path,
            std::path::PathBuf::from("/dev/sdb")
        );
    }

    #[test]
    fn test_no_new_device() {
        let snapshot = DeviceSnapshot::new([disk("/dev/sda")]);
        assert!(matches!(
            resolve_new_device(&snapshot, &snapshot),
            Err(IsobootError::NoDeviceDetected)
        ));
    }

    #[test]
    fn test_two_new_devices_is_ambiguous() {
        let before = DeviceSnapshot::default();
        let after = DeviceSnapshot::new([disk("/dev/sdc"), disk("/dev/sdb")]);
        match resolve_new_device(&before, &after) {
            Err(IsobootError::AmbiguousDevice { paths }) => {
                assert_eq!(paths.len(), 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_removed_device_ignored() {
        let before = DeviceSnapshot::new([disk("/dev/sdb"), disk("/dev/sdc")]);
        let after = DeviceSnapshot::new([disk("/dev/sdc"), disk("/dev/sdd")]);
        assert_eq!(
            resolve_new_device(&before, &after).unwrap().path,
            std::path::PathBuf::from("/dev/sdd")
        );
    }

    #[test]
    fn test_new_partition_is_not_a_device() {
        let before = DeviceSnapshot::new([disk("/dev/sdb")]);
        let after = DeviceSnapshot::new([
            disk("/dev/sdb"),
            BlockDevice::new("/dev/sdb1", 1 << 30, true, DeviceKind::Partition),
        ]);
        assert!(matches!(
            resolve_new_device(&before, &after),
            Err(IsobootError::NoDeviceDetected)
        ));
    }

    #[test]
    fn test_fixed_disk_is_not_a_candidate() {
        let after = DeviceSnapshot::new([BlockDevice::new(
            "/dev/nvme1n1",
            1 << 40,
            false,
            DeviceKind::Disk,
        )]);
        assert!(matches!(
            resolve_new_device(&DeviceSnapshot::default(), &after),
            Err(IsobootError::NoDeviceDetected)
        ));
    }

    proptest! {
        #[test]
        fn prop_resolution_ignores_enumeration_order(
            existing in proptest::collection::btree_set("[a-f]", 0..5),
            added in proptest::collection::btree_set("[g-k]", 0..3),
            seed in any::<u64>(),
        ) {
            let before: Vec<_> = existing.iter().map(|s| disk(&format!("/dev/sd{s}"))).collect();
            let mut after = before.clone();
            after.extend(added.iter().map(|s| disk(&format!("/dev/sd{s}"))));

            let forward = resolve_new_device(
                &DeviceSnapshot::new(before.clone()),
                &DeviceSnapshot::new(after.clone()),
            );
            let rotation = (seed as usize) % after.len().max(1);
            after.rotate_left(rotation);
            let mut before_rev = before;
            before_rev.reverse();
            let shuffled = resolve_new_device(
                &DeviceSnapshot::new(before_rev),
                &DeviceSnapshot::new(after),
            );

            match added.len() {
                0 => {
                    prop_assert!(matches!(forward, Err(IsobootError::NoDeviceDetected)));
                    prop_assert!(matches!(shuffled, Err(IsobootError::NoDeviceDetected)));
                }
                1 => prop_assert_eq!(forward.unwrap().path, shuffled.unwrap().path),
                n => {
                    let count = |r: IsobootResult<BlockDevice>| match r {
                        Err(IsobootError::AmbiguousDevice { paths }) => paths.len(),
                        _ => 0,
                    };
                    prop_assert_eq!(count(forward), n);
                    prop_assert_eq!(count(shuffled), n);
                }
            }
        }
    }
}
