use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn mockchat(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mockchat"))
        .arg("--config-dir")
        .arg(config_dir)
        .args(args)
        .env("MOCKCHAT__CHAT__REPLY_DELAY_MS", "10")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run mockchat")
}

fn chat_with_input(config_dir: &Path, input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_mockchat"))
        .arg("--config-dir")
        .arg(config_dir)
        .arg("chat")
        .env("MOCKCHAT__CHAT__REPLY_DELAY_MS", "10")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn mockchat chat");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().expect("Failed to wait on mockchat")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_register_login_logout_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    let output = mockchat(dir, &["whoami"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Not signed in"));

    let output = mockchat(
        dir,
        &["register", "--name", "Ada", "--email", "ada@x.io", "--password", "pw1"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Welcome, Ada!"));

    let output = mockchat(
        dir,
        &["register", "--name", "Eve", "--email", "ada@x.io", "--password", "x"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));

    let output = mockchat(dir, &["whoami"]);
    assert!(stdout(&output).contains("Ada <ada@x.io>"));

    assert!(mockchat(dir, &["logout"]).status.success());
    assert!(mockchat(dir, &["logout"]).status.success());
    assert!(stdout(&mockchat(dir, &["whoami"])).contains("Not signed in"));

    let output = mockchat(dir, &["login", "--email", "ada@x.io", "--password", "wrong"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid email or password"));

    let output = mockchat(dir, &["login", "--email", "ada@x.io", "--password", "pw1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Signed in as Ada"));

    let output = mockchat(dir, &["status"]);
    let out = stdout(&output);
    assert!(out.contains("Registered: 1"));
    let expected = format!("Storage directory: {}", dir.join("storage").display());
    assert!(out.contains(&expected));
}

#[test]
fn test_chat_requires_session() {
    let temp_dir = TempDir::new().unwrap();
    let output = chat_with_input(temp_dir.path(), "hello\n");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not signed in"));
}

#[test]
fn test_chat_prints_canned_reply() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let output = mockchat(
        dir,
        &["register", "--name", "Ada", "--email", "ada@x.io", "--password", "pw1"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = chat_with_input(dir, "hello\n/list\n");
    let out = stdout(&output);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.contains("Signed in as Ada"));
    assert!(out.contains("How can I help you today?"));
    assert!(out.contains("1. hello"));
    assert!(out.contains("I'm here to assist you!"));
}
