//! Integration tests for the command-line interface
//!
//! A shell script stands in for clang-format so these tests do not depend on
//! a system installation.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_format-on-save"))
        .args(args)
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

/// Create a project with a stub formatter that emits `report` for every file.
#[cfg(unix)]
fn setup_workspace(report: &str) -> TempDir {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".clang-format"), "BasedOnStyle: LLVM\n").unwrap();

    let stub = dir.path().join("fake-clang-format");
    fs::write(
        &stub,
        format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'fake clang-format 1.0'; exit 0; fi\ncat > /dev/null\ncat <<'XML'\n{report}\nXML\n"
        ),
    )
    .unwrap();
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();

    fs::write(
        dir.path().join(".format-on-save.toml"),
        format!("executable = {:?}\n", stub.display().to_string()),
    )
    .unwrap();

    fs::write(dir.path().join("main.c"), "int  x;\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "int  x;\n").unwrap();

    dir
}

#[cfg(unix)]
const FIX_SPACING: &str = "<?xml version='1.0'?>\n<replacements xml:space='preserve' incomplete_format='false'>\n<replacement offset='3' length='2'> </replacement>\n</replacements>";

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = run(&["format", "--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Format files"));
}

#[test]
fn test_missing_formatter_fails_before_editing() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".format-on-save.toml"),
        "executable = \"/nonexistent/clang-format-for-tests\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("main.c"), "int  x;\n").unwrap();

    let output = run(&["format", "main.c"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No formatter executable detected"));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.c")).unwrap(),
        "int  x;\n"
    );
}

#[cfg(unix)]
#[test]
fn test_format_applies_replacements() {
    let dir = setup_workspace(FIX_SPACING);
    let output = run(&["format", "main.c"], dir.path());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Formatted"));
    assert!(stdout.contains("Summary:"));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.c")).unwrap(),
        "int x;\n"
    );
}

#[cfg(unix)]
#[test]
fn test_format_directory_skips_other_extensions() {
    let dir = setup_workspace(FIX_SPACING);
    let output = run(&["format", "."], dir.path());

    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(dir.path().join("main.c")).unwrap(),
        "int x;\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "int  x;\n"
    );
}

#[cfg(unix)]
#[test]
fn test_dry_run_leaves_files() {
    let dir = setup_workspace(FIX_SPACING);
    let output = run(&["format", "--dry-run", "--diff", "main.c"], dir.path());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("+int x;"));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.c")).unwrap(),
        "int  x;\n"
    );
}

#[cfg(unix)]
#[test]
fn test_check_fails_when_changes_needed() {
    let dir = setup_workspace(FIX_SPACING);
    let output = run(&["check", "main.c"], dir.path());

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Needs formatting"));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.c")).unwrap(),
        "int  x;\n"
    );
}

#[cfg(unix)]
#[test]
fn test_check_passes_when_formatted() {
    let dir = setup_workspace("<replacements xml:space='preserve' incomplete_format='false'>\n</replacements>");
    let output = run(&["check", "main.c"], dir.path());

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Already formatted"));
}

#[cfg(unix)]
#[test]
fn test_check_passes_when_replacements_rewrite_same_text() {
    let dir = setup_workspace(
        "<replacements xml:space='preserve' incomplete_format='false'>\n<replacement offset='0' length='3'>int</replacement>\n</replacements>",
    );
    let output = run(&["check", "main.c"], dir.path());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Already formatted"));
    assert!(!stdout.contains("Needs formatting"));
}

#[cfg(unix)]
#[test]
fn test_incomplete_record_is_reported_not_applied() {
    let dir = setup_workspace("<replacements><replacement offset='3'> </replacement></replacements>");
    let output = run(&["format", "main.c"], dir.path());

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Aborted"));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.c")).unwrap(),
        "int  x;\n"
    );
}
