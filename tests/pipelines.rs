#![cfg(unix)]

use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use sush::Interpreter;

fn run(sh: &mut Interpreter, line: &str) -> (i32, String) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = sh.execute_line_with_output(line, &mut out, &mut err);
    (code, String::from_utf8(err).unwrap())
}

#[test]
fn redirect_out_then_in() {
    let dir = tempfile::tempdir().unwrap();
    let f = dir.path().join("f");
    let copy = dir.path().join("copy");
    let mut sh = Interpreter::default();

    assert_eq!(run(&mut sh, &format!("echo hi > {}", f.display())).0, 0);
    assert_eq!(run(&mut sh, &format!("cat < {} > {}", f.display(), copy.display())).0, 0);
    assert_eq!(fs::read_to_string(&copy).unwrap(), "hi\n");
}

#[test]
fn printf_into_sort() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sh = Interpreter::default();

    let (code, err) = run(&mut sh, &format!(r#"printf "c\nb\na\n" | sort > {}"#, out.display()));
    assert_eq!(code, 0, "{err}");
    assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\nc\n");
}

#[test]
fn append_twice() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log");
    let mut sh = Interpreter::default();

    run(&mut sh, &format!("echo first >> {}", log.display()));
    run(&mut sh, &format!("echo second >> {}", log.display()));
    assert_eq!(fs::read_to_string(&log).unwrap(), "first\nsecond\n");
}

#[test]
fn quoted_pipe_is_an_argument() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sh = Interpreter::default();

    let (code, err) = run(&mut sh, &format!(r#"echo "a|b" > {}"#, out.display()));
    assert_eq!(code, 0, "{err}");
    assert_eq!(fs::read_to_string(&out).unwrap(), "a|b\n");
}

#[test]
fn trailing_pipe_is_rejected() {
    let mut sh = Interpreter::default();
    let (code, err) = run(&mut sh, "ls |");
    assert_eq!(code, sush::SYNTAX_ERROR);
    assert!(err.contains("stage 2 has no command"), "{err}");
}

#[test]
fn binary_runs_single_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_sush"))
        .args(["--no-rc", "-c", "printf ok"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, b"ok");
}

#[test]
fn binary_reads_lines_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_sush"))
        .arg("--no-rc")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"setenv SUSH_IT hello\ngetenv SUSH_IT\nexit\necho unreachable\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "hello\n");
}

#[test]
fn binary_exit_status_is_last_stage() {
    let status = Command::new(env!("CARGO_BIN_EXE_sush"))
        .args(["--no-rc", "-c", "true | false"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn pipe_exhaustion_reports_and_reaps() {
    use std::time::{Duration, Instant};

    // Five descriptors leave room for 0-2 plus the first pipe only, so the
    // second pipe cannot be created while the first `cat` is running.
    let script = r#"exec 3>&- 4>&- 5>&- 6>&- 7>&- 8>&- 9>&-; ulimit -n 5 && exec "$0" --no-rc -c "cat | cat | cat | cat""#;
    let mut child = Command::new("/bin/sh")
        .args(["-c", script, env!("CARGO_BIN_EXE_sush")])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(20);
    while child.try_wait().unwrap().is_none() {
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("sush did not return after the pipe failure");
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "{stderr}");
    assert!(stderr.contains("sush: cannot create pipe"), "{stderr}");
}
