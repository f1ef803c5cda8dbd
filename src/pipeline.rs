//! Data model shared by the parser and the executor.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a stage reads its standard input from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    /// Whatever the stage is handed: the shell's stdin or the upstream pipe.
    #[default]
    Inherit,
    /// A file opened read-only.
    File(PathBuf),
}

/// Where a stage writes its standard output to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputSink {
    /// The shell's stdout, or the downstream pipe.
    #[default]
    Inherit,
    /// A file, created if missing.
    File(PathBuf),
}

/// How an output file is opened. Ignored when the sink is [`OutputSink::Inherit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// `>`: the file is cut to zero length first.
    #[default]
    Truncate,
    /// `>>`: writes go to the end of the file.
    Append,
}

/// One element of a pipeline.
///
/// `argv[0]` is the command name and is never empty. Redirect operators and
/// their file operands have already been removed from `argv`; the
/// NULL-terminated form the kernel wants is produced by
/// [`std::process::Command`] at spawn time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
    pub input: InputSource,
    pub output: OutputSink,
    pub mode: OutputMode,
}

impl Stage {
    /// A stage with inherited input and output.
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            input: InputSource::Inherit,
            output: OutputSink::Inherit,
            mode: OutputMode::Truncate,
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn input_file(&self) -> Option<&Path> {
        match &self.input {
            InputSource::File(path) => Some(path),
            InputSource::Inherit => None,
        }
    }

    pub fn output_file(&self) -> Option<&Path> {
        match &self.output {
            OutputSink::File(path) => Some(path),
            OutputSink::Inherit => None,
        }
    }
}

/// Position of a stage within its pipeline; decides which redirects are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePosition {
    Sole,
    First,
    Middle,
    Last,
}

impl StagePosition {
    /// Position of the stage at `index` (0-based) in a pipeline of `count` stages.
    pub fn of(index: usize, count: usize) -> Self {
        match (index, count) {
            (_, 1) => StagePosition::Sole,
            (0, _) => StagePosition::First,
            (i, n) if i + 1 == n => StagePosition::Last,
            _ => StagePosition::Middle,
        }
    }

    /// Maximum number of `(input, output)` redirects a stage here may carry.
    pub fn redirect_limits(self) -> (usize, usize) {
        match self {
            StagePosition::Sole => (1, 1),
            StagePosition::First => (1, 0),
            StagePosition::Middle => (0, 0),
            StagePosition::Last => (0, 1),
        }
    }
}

impl fmt::Display for StagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StagePosition::Sole => "sole",
            StagePosition::First => "first",
            StagePosition::Middle => "middle",
            StagePosition::Last => "last",
        };
        f.write_str(name)
    }
}

/// The ordered chain of stages built from one line. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Returns `None` for an empty stage list.
    pub fn new(stages: Vec<Stage>) -> Option<Self> {
        if stages.is_empty() {
            None
        } else {
            Some(Self { stages })
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// A parsed line, classified once before anything runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Nothing to do.
    Empty,
    /// The first stage names a built-in; these are its words exactly as typed.
    Internal(Vec<String>),
    /// Everything else: processes connected by pipes.
    External(Pipeline),
}
