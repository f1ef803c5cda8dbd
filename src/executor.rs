//! Runs a [`Pipeline`] as a chain of child processes.
//!
//! Every stage gets its own process. Consecutive stages are joined by an
//! anonymous pipe; the parent drops its copy of each pipe end as soon as the
//! child holding it has been spawned, so a reader sees end-of-input exactly
//! when its writer exits. Pipes are close-on-exec, so a child only ever
//! holds the two ends it was handed as stdin and stdout.

use crate::command::ExitCode;
use crate::error::ShellError;
use crate::external::{exit_code, find_command_path};
use crate::pipeline::{OutputMode, Pipeline, Stage};
use os_pipe::{PipeReader, PipeWriter};
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Status used for a stage whose program could not be found.
pub const NOT_FOUND: ExitCode = 127;
/// Status used for a stage whose program was found but could not be started.
pub const NOT_EXECUTABLE: ExitCode = 126;

/// Exit statuses of every stage of a finished pipeline, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    statuses: Vec<ExitCode>,
}

impl PipelineOutcome {
    pub fn statuses(&self) -> &[ExitCode] {
        &self.statuses
    }

    /// Status of the last stage, which is the status of the pipeline.
    pub fn status(&self) -> ExitCode {
        self.statuses.last().copied().unwrap_or(0)
    }

    pub fn success(&self) -> bool {
        self.status() == 0
    }
}

/// A stage whose program could not be started, with the status it is recorded as.
struct StageFailure {
    error: ShellError,
    status: ExitCode,
}

/// Redirect files of one stage, opened by the parent before anything is spawned.
struct Redirects {
    input: Option<File>,
    output: Option<File>,
}

/// Executes every stage of `pipeline` and waits for all of them.
///
/// `env` is the frozen `name=value` environment handed to every child; the
/// program of each stage is looked up on its `PATH`. A stage whose program
/// cannot be found or started is reported on `diagnostics` and recorded
/// with a failing status while its siblings keep running.
///
/// # Errors
/// [`ShellError::Resource`] when a redirect file cannot be opened or a pipe
/// cannot be created. Redirect files are all opened before the first spawn,
/// so a bad one means nothing runs. After a pipe failure no further stages
/// are spawned, but the ones already running are still waited for.
pub fn run_pipeline(
    pipeline: &Pipeline,
    env: &[String],
    diagnostics: &mut dyn Write,
) -> Result<PipelineOutcome, ShellError> {
    let vars: Vec<(&str, &str)> = env.iter().filter_map(|entry| entry.split_once('=')).collect();
    let search_paths = vars
        .iter()
        .find(|(name, _)| *name == "PATH")
        .map(|(_, value)| OsStr::new(*value));

    let redirects = pipeline
        .stages()
        .iter()
        .map(open_redirects)
        .collect::<Result<Vec<_>, _>>()?;

    let count = pipeline.len();
    let mut statuses = vec![0; count];
    let mut running: Vec<(usize, Child)> = Vec::with_capacity(count);
    // None means the stage reads the shell's own stdin.
    let mut upstream: Option<PipeReader> = None;

    for ((index, stage), files) in pipeline.stages().iter().enumerate().zip(redirects) {
        let (next_upstream, downstream) = if index + 1 < count {
            match os_pipe::pipe() {
                Ok((reader, writer)) => (Some(reader), Some(writer)),
                Err(e) => {
                    tracing::debug!("pipe for stage {} failed, reaping {} child(ren)", index + 1, running.len());
                    drop(upstream.take());
                    reap(&mut running, &mut statuses);
                    return Err(ShellError::resource("cannot create pipe", e));
                }
            }
        } else {
            (None, None)
        };

        // Both pipe ends handed over here are closed in the parent when this
        // call returns, whether or not the spawn succeeded.
        match spawn_stage(stage, files, upstream.take(), downstream, &vars, search_paths) {
            Ok(child) => {
                tracing::debug!("stage {} spawned: pid {} {:?}", index + 1, child.id(), stage.argv);
                running.push((index, child));
            }
            Err(failure) => {
                let _ = writeln!(diagnostics, "sush: {}", failure.error);
                statuses[index] = failure.status;
            }
        }

        upstream = next_upstream;
    }

    reap(&mut running, &mut statuses);
    tracing::debug!("pipeline finished: {statuses:?}");
    Ok(PipelineOutcome { statuses })
}

/// Waits for every spawned child, recording its status.
fn reap(running: &mut Vec<(usize, Child)>, statuses: &mut [ExitCode]) {
    for (index, mut child) in running.drain(..) {
        statuses[index] = match child.wait() {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::warn!("failed to wait for pid {}: {e}", child.id());
                1
            }
        };
    }
}

fn open_redirects(stage: &Stage) -> Result<Redirects, ShellError> {
    let input = stage
        .input_file()
        .map(|path| File::open(path).map_err(|e| redirect_error(path, e)))
        .transpose()?;
    let output = stage
        .output_file()
        .map(|path| open_output(path, stage.mode).map_err(|e| redirect_error(path, e)))
        .transpose()?;
    Ok(Redirects { input, output })
}

fn spawn_stage(
    stage: &Stage,
    files: Redirects,
    upstream: Option<PipeReader>,
    downstream: Option<PipeWriter>,
    vars: &[(&str, &str)],
    search_paths: Option<&OsStr>,
) -> Result<Child, StageFailure> {
    let program = find_command_path(search_paths, Path::new(stage.program())).ok_or_else(|| {
        StageFailure {
            error: ShellError::Exec {
                program: stage.program().to_string(),
                reason: "command not found".to_string(),
            },
            status: NOT_FOUND,
        }
    })?;

    // A redirect file wins over the pipe; the unused pipe end is dropped.
    let stdin: Stdio = match files.input {
        Some(file) => file.into(),
        None => upstream.map_or_else(Stdio::inherit, Stdio::from),
    };
    let stdout: Stdio = match files.output {
        Some(file) => file.into(),
        None => downstream.map_or_else(Stdio::inherit, Stdio::from),
    };

    let mut command = Command::new(&*program);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(stage.program());
    }
    command
        .args(stage.args())
        .env_clear()
        .envs(vars.iter().copied())
        .stdin(stdin)
        .stdout(stdout);

    command.spawn().map_err(|e| StageFailure {
        error: ShellError::Exec {
            program: stage.program().to_string(),
            reason: e.to_string(),
        },
        status: NOT_EXECUTABLE,
    })
}

fn open_output(path: &Path, mode: OutputMode) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    match mode {
        OutputMode::Truncate => options.truncate(true),
        OutputMode::Append => options.append(true),
    };
    options.open(path)
}

fn redirect_error(path: &Path, source: io::Error) -> ShellError {
    ShellError::resource(path.display().to_string(), source)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::lexer::split_into_tokens;
    use crate::parser::build_stage;
    use std::fs;

    fn pipeline(stages: &[String]) -> Pipeline {
        let stages = stages
            .iter()
            .map(|text| build_stage(split_into_tokens(text).unwrap(), 1).unwrap())
            .collect();
        Pipeline::new(stages).unwrap()
    }

    fn run(p: &Pipeline) -> (PipelineOutcome, String) {
        let env = Environment::new().snapshot();
        let mut diagnostics = Vec::new();
        let outcome = run_pipeline(p, &env, &mut diagnostics).unwrap();
        (outcome, String::from_utf8(diagnostics).unwrap())
    }

    #[test]
    fn test_truncate_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let copy = dir.path().join("copy.txt");

        let (outcome, _) = run(&pipeline(&[format!("echo hi > {}", out.display())]));
        assert!(outcome.success());
        let (outcome, _) = run(&pipeline(&[format!("cat < {} > {}", out.display(), copy.display())]));
        assert!(outcome.success());

        assert_eq!(fs::read(&copy).unwrap(), b"hi\n");
    }

    #[test]
    fn test_truncate_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, "old contents that are long\n").unwrap();

        run(&pipeline(&[format!("echo new > {}", f.display())]));
        assert_eq!(fs::read_to_string(&f).unwrap(), "new\n");
    }

    #[test]
    fn test_append_keeps_previous_lines() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f");

        run(&pipeline(&[format!("echo one >> {}", f.display())]));
        run(&pipeline(&[format!("echo two >> {}", f.display())]));
        assert_eq!(fs::read_to_string(&f).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_two_stage_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sorted");
        let (outcome, diagnostics) = run(&pipeline(&[
            r#"printf "b\na\n""#.into(),
            format!("sort > {}", out.display()),
        ]));

        assert_eq!(outcome.statuses(), &[0, 0]);
        assert!(diagnostics.is_empty(), "{diagnostics}");
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_three_stage_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        fs::write(&input, "c\na\nb\na\n").unwrap();

        let (outcome, _) = run(&pipeline(&[
            format!("sort < {}", input.display()),
            "uniq".into(),
            format!("wc -l > {}", out.display()),
        ]));

        assert!(outcome.success());
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
    }

    #[test]
    fn test_missing_middle_program() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let (outcome, diagnostics) = run(&pipeline(&[
            "echo data".into(),
            "no_such_program_for_sush_tests".into(),
            format!("cat > {}", out.display()),
        ]));

        assert_eq!(outcome.statuses().len(), 3);
        assert_eq!(outcome.statuses()[1], NOT_FOUND);
        assert_eq!(outcome.statuses()[2], 0);
        assert!(diagnostics.contains("no_such_program_for_sush_tests: command not found"));
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn test_missing_input_file_aborts_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let missing = dir.path().join("missing");
        let p = pipeline(&[
            format!("cat < {}", missing.display()),
            format!("wc -c > {}", out.display()),
        ]);

        let env = Environment::new().snapshot();
        let mut diagnostics = Vec::new();
        match run_pipeline(&p, &env, &mut diagnostics) {
            Err(ShellError::Resource { what, source }) => {
                assert!(what.ends_with("missing"), "{what}");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!out.exists(), "downstream stage must not run");
    }

    #[test]
    fn test_unwritable_output_file_aborts_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let p = pipeline(&[
            format!("touch {}", marker.display()),
            format!("cat > {}", dir.path().display()),
        ]);

        let env = Environment::new().snapshot();
        let mut diagnostics = Vec::new();
        let res = run_pipeline(&p, &env, &mut diagnostics);
        assert!(matches!(res, Err(ShellError::Resource { .. })), "{res:?}");
        assert!(!marker.exists(), "no stage may run");

        let sole = pipeline(&[format!("echo hi > {}", dir.path().display())]);
        assert!(matches!(
            run_pipeline(&sole, &env, &mut diagnostics),
            Err(ShellError::Resource { .. })
        ));
    }

    #[test]
    fn test_exit_status_of_last_stage() {
        let (outcome, _) = run(&pipeline(&["true".into(), "false".into()]));
        assert_eq!(outcome.status(), 1);
        assert!(!outcome.success());
    }

    #[test]
    fn test_children_see_only_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("env");
        let mut env = Environment::from_vars([("PATH", "/usr/bin:/bin"), ("SUSH_ONLY", "yes")]);
        let snapshot = env.snapshot();
        env.set("SUSH_LATE", "no");

        let mut diagnostics = Vec::new();
        let p = pipeline(&[format!("env > {}", out.display())]);
        run_pipeline(&p, &snapshot, &mut diagnostics).unwrap();

        let printed = fs::read_to_string(&out).unwrap();
        assert!(printed.contains("SUSH_ONLY=yes"));
        assert!(!printed.contains("SUSH_LATE"));
    }

    #[test]
    fn test_program_found_via_snapshot_path() {
        let env = vec!["PATH=/nonexistent_dir_for_sush".to_string()];
        let mut diagnostics = Vec::new();
        let outcome = run_pipeline(&pipeline(&["true".into()]), &env, &mut diagnostics).unwrap();
        assert_eq!(outcome.status(), NOT_FOUND);

        let outcome = run_pipeline(&pipeline(&["/bin/sh -c true".into()]), &env, &mut diagnostics).unwrap();
        assert_eq!(outcome.status(), 0);
    }
}
