use crate::pipeline::StagePosition;
use std::io;

/// Reasons a command line is rejected before anything is spawned.
///
/// Stage numbers are 1-based, counted from the left of the line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedLine {
    /// A double quote was opened and never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,

    /// A pipeline stage has no command name.
    #[error("stage {stage} has no command")]
    EmptyCommand { stage: usize },

    /// A redirect operator is not followed by a file name.
    #[error("stage {stage}: redirect without a target file")]
    MissingRedirectTarget { stage: usize },

    /// A stage declares more redirects than its position allows.
    #[error("stage {stage}: illegal redirect for the {position} stage")]
    IllegalRedirect {
        stage: usize,
        position: StagePosition,
    },
}

/// Errors surfaced by the interpreter while processing one line.
///
/// None of these end the main loop; the line is abandoned and the next
/// one is read.
#[derive(thiserror::Error, Debug)]
pub enum ShellError {
    /// The line failed lexing, stage building or redirect validation.
    #[error("invalid command line: {0}")]
    MalformedLine(#[from] MalformedLine),

    /// A pipe or redirect file could not be set up.
    #[error("{what}: {source}")]
    Resource {
        what: String,
        #[source]
        source: io::Error,
    },

    /// A stage's program could not be found or launched.
    #[error("{program}: {reason}")]
    Exec { program: String, reason: String },

    /// A built-in rejected its arguments or failed.
    #[error("{name}: {message}")]
    InternalCommand { name: String, message: String },
}

impl ShellError {
    pub(crate) fn resource(what: impl Into<String>, source: io::Error) -> Self {
        Self::Resource {
            what: what.into(),
            source,
        }
    }
}
