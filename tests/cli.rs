use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn entlog(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_entlog"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn diff_prints_one_record_per_line() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("old.c"), "#ifdef X\nint a;\n#endif\n").unwrap();
    std::fs::write(
        dir.path().join("new.c"),
        "#ifdef X\nint a;\nint b;\n#endif\nvoid f (int x) { }\n",
    )
    .unwrap();

    let output = entlog(dir.path(), &["diff", "old.c", "new.c"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output), "[X](b): New.\n(f): New.\n");
}

#[test]
fn diff_json_lists_records() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("old.c"), "void f(void) { return; }\n").unwrap();
    std::fs::write(dir.path().join("new.c"), "void f(void) { return 1; }\n").unwrap();

    let output = entlog(dir.path(), &["diff", "old.c", "new.c", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["name"], "f");
    assert_eq!(json[0]["kind"], "functionDefinition");
    assert_eq!(json[0]["action"], "modified");
}

#[test]
fn diff_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = entlog(dir.path(), &["diff", "nope.c", "also-nope.c"]);
    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(42));
}

#[test]
fn tree_dumps_scopes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.c"),
        "#include <stdio.h>\n#ifndef SHARED\nstatic int x = 1;\n#endif\n",
    )
    .unwrap();

    let output = entlog(dir.path(), &["tree", "a.c"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "Scope:\n    INCLUDE: stdio.h\n    Scope: !SHARED\n        ASSIGN: x\n    EndScope: !SHARED\nEndScope:\n"
    );
}

#[test]
fn raw_prints_header_lines_and_skips_changelog() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("raw.txt"),
        "\
commit 5a1b2c3d
Author: Jane Doe <jane@example.com>

    Move things.

:100644 100644 1a2b3c4 5d6e7f8 M\tChangeLog
:100644 100644 1a2b3c4 5d6e7f8 M\telf/dl-load.c
:100644 100644 1a2b3c4 1a2b3c4 R100\told.c\tnew.c
:100644 100755 1a2b3c4 1a2b3c4 T\tscripts/run.sh
",
    )
    .unwrap();

    let output = entlog(dir.path(), &["raw", "--file", "raw.txt"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout(&output),
        "\
\t* elf/dl-load.c: Modified.
\t* old.c: Move to...
\t* new.c: ... here.
\t* scripts/run.sh: Changed file permission bits from 100644 to 100755
"
    );
}

#[test]
fn raw_unknown_status_exits_42() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_entlog"))
        .arg("raw")
        .current_dir(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"commit 5a1b2c3d\n:100644 100644 1a2b3c4 5d6e7f8 X\ta.c\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(42));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("5a1b2c3d"), "{stderr}");
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".entlog.toml"), "[decode]\nencodings = []\n").unwrap();
    std::fs::write(dir.path().join("a.c"), "int a;\n").unwrap();

    let output = entlog(dir.path(), &["tree", "a.c"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("encodings"));
}

#[test]
fn log_outside_a_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = entlog(dir.path(), &["log", "HEAD~1", "HEAD"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("repository"));
}
