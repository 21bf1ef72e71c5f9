use assert_cmd::Command;
use predicates::prelude::*;

fn wayscan_cmd() -> Command {
    Command::cargo_bin("wayscan").expect("binary exists")
}

#[test]
fn wayscan_help_prints_usage() {
    wayscan_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recognize its text"))
        .stdout(predicate::str::contains("--autocopy"))
        .stdout(predicate::str::contains("--provider"));
}

#[test]
fn version_includes_package_version() {
    wayscan_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn requires_wayland_env() {
    wayscan_cmd()
        .env_remove("WAYLAND_DISPLAY")
        .env_remove("RUST_LOG")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("WAYLAND_DISPLAY not set"));
}

#[test]
fn unknown_provider_exits_with_error() {
    wayscan_cmd()
        .env_remove("RUST_LOG")
        .env("WAYLAND_DISPLAY", "wayland-test-missing")
        .args(["--provider", "abbyy"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown provider 'abbyy'"));
}

#[test]
fn quiet_and_verbose_conflict() {
    wayscan_cmd()
        .args(["--quiet", "--verbose"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn dump_config_schema_prints_sections() {
    Command::cargo_bin("dump_config_schema")
        .expect("binary exists")
        .assert()
        .success()
        .stdout(predicate::str::contains("recognition"))
        .stdout(predicate::str::contains("render_inactive"));
}
