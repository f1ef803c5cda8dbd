use crate::command::{CommandTable, ExitCode};
use crate::config;
use crate::env::Environment;
use crate::error::ShellError;
use crate::executor;
use crate::parser;
use crate::pipeline::CommandLine;
use crate::source::{LineSource, ReaderSource};
use anyhow::Context;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

/// Status reported for a line that could not be parsed.
pub const SYNTAX_ERROR: ExitCode = 2;

/// The command interpreter: an environment plus the table of built-ins.
///
/// Each line is parsed into a [`CommandLine`]. Built-in lines run in this
/// process against the environment; everything else is handed to the
/// executor as a pipeline of child processes.
///
/// Example
/// ```
/// use sush::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let mut err = Vec::new();
/// sh.execute_line_with_output("setenv GREETING hi", &mut out, &mut err);
/// sh.execute_line_with_output("getenv GREETING", &mut out, &mut err);
/// assert_eq!(out, b"hi\n");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: CommandTable,
}

impl Interpreter {
    /// Create an interpreter with a custom environment and command table.
    pub fn new(env: Environment, commands: CommandTable) -> Self {
        Self { env, commands }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Parse a line against this interpreter's built-in table.
    pub fn parse(&self, line: &str) -> Result<CommandLine, ShellError> {
        Ok(parser::parse_line(line, |name| self.commands.contains(name))?)
    }

    /// Run one line with the process's own stdout and stderr.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.execute_line_with_output(line, &mut stdout.lock(), &mut stderr.lock())
    }

    /// Run one line. Built-ins print to `stdout`; every diagnostic, including
    /// per-stage failures of a pipeline, goes to `stderr`.
    ///
    /// External programs write straight to the inherited stdout or their
    /// redirect files, never to `stdout`.
    pub fn execute_line_with_output(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> ExitCode {
        match self.try_execute(line, stdout, stderr) {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!("line failed: {e:?}");
                let _ = writeln!(stderr, "sush: {e}");
                match e {
                    ShellError::MalformedLine(_) => SYNTAX_ERROR,
                    _ => 1,
                }
            }
        }
    }

    fn try_execute(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<ExitCode, ShellError> {
        match self.parse(line)? {
            CommandLine::Empty => Ok(0),
            CommandLine::Internal(words) => {
                let Some((name, args)) = words.split_first() else {
                    return Ok(0);
                };
                let Some(command) = self.commands.lookup(name) else {
                    return Err(ShellError::Exec {
                        program: name.clone(),
                        reason: "command not found".to_string(),
                    });
                };
                let code = command.run(args, stdout, &mut self.env)?;
                let _ = stdout.flush();
                Ok(code)
            }
            CommandLine::External(pipeline) => {
                // Keep our buffered output ahead of the children's.
                let _ = stdout.flush();
                let snapshot = self.env.snapshot();
                let outcome = executor::run_pipeline(&pipeline, &snapshot, stderr)?;
                Ok(outcome.status())
            }
        }
    }

    /// Read and run lines until the source is exhausted or `exit` runs.
    ///
    /// The prompt is re-read from `PS1` before every line. Returns the
    /// status of the last line run.
    pub fn run_source(&mut self, source: &mut dyn LineSource) -> anyhow::Result<ExitCode> {
        let mut last = 0;
        while !self.should_exit() {
            let prompt = config::prompt(&self.env);
            let Some(line) = source.next_line(&prompt)? else {
                break;
            };
            last = self.execute_line(&line);
        }
        Ok(last)
    }

    /// Replay a start-up file line by line.
    ///
    /// Files that are not both readable and executable by their owner are
    /// skipped silently and count as success.
    pub fn run_rc_file(&mut self, path: &Path) -> anyhow::Result<ExitCode> {
        if !config::is_replayable(path) {
            tracing::debug!("skipping start-up file {}", path.display());
            return Ok(0);
        }
        tracing::info!("replaying start-up file {}", path.display());
        let file = File::open(path).with_context(|| format!("can't open {}", path.display()))?;
        self.run_source(&mut ReaderSource::new(BufReader::new(file)))
    }
}

impl Default for Interpreter {
    /// An interpreter seeded from the process environment with every built-in.
    fn default() -> Self {
        Self::new(Environment::new(), CommandTable::default())
    }
}
