use predicates::prelude::*;
use rstest::rstest;

mod common;

#[test]
fn test_help_lists_commands() {
    let ctx = common::isoboot();
    let mut assert = ctx.new_cmd().arg("--help").assert().success();
    for command in ["list", "plan", "provision", "grub-config", "menu", "config"] {
        assert = assert.stdout(predicate::str::contains(command));
    }
}

#[rstest]
#[case::plan("plan")]
#[case::provision("provision")]
#[case::menu("menu")]
fn test_subcommand_help(#[case] command: &str) {
    let ctx = common::isoboot();
    ctx.new_cmd()
        .args([command, "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_command_fails() {
    let ctx = common::isoboot();
    ctx.new_cmd().arg("format-everything").assert().failure();
}

#[test]
fn test_provision_rejects_bad_size_before_touching_devices() {
    let ctx = common::isoboot();
    ctx.new_cmd()
        .args(["provision", "--size", "lots"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid size 'lots'"));
}

#[test]
fn test_menu_requires_image_dir() {
    let ctx = common::isoboot();
    ctx.new_cmd().arg("menu").assert().failure();
}
