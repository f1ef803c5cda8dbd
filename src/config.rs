//! Start-up configuration: command-line options, the rc file and the prompt.

use crate::env::Environment;
use argh::FromArgs;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// Name of the start-up file looked up in `$SUSHHOME`.
pub const RC_FILE_NAME: &str = ".sushrc";
/// Variable naming the directory that holds the start-up file.
pub const HOME_VAR: &str = "SUSHHOME";
/// Variable holding the prompt string.
pub const PROMPT_VAR: &str = "PS1";
/// Prompt shown when `PS1` is unset.
pub const DEFAULT_PROMPT: &str = ">";
/// Variable consulted for the log level when `--log-level` is absent.
pub const LOG_VAR: &str = "SUSH_LOG";

#[derive(FromArgs, Debug, Default)]
/// A small command interpreter with pipes and redirections.
pub struct Options {
    #[argh(option, short = 'c')]
    /// run this single command line and exit with its status.
    pub command: Option<String>,

    #[argh(option)]
    /// start-up file to replay instead of $SUSHHOME/.sushrc.
    pub rc: Option<PathBuf>,

    #[argh(switch)]
    /// do not replay any start-up file.
    pub no_rc: bool,

    #[argh(option)]
    /// log level: off, error, warn, info, debug or trace.
    pub log_level: Option<String>,
}

impl Options {
    /// The start-up file to replay, if any.
    ///
    /// `--rc` wins; otherwise `$SUSHHOME/.sushrc`, or `.sushrc` in the
    /// current directory when `SUSHHOME` is unset.
    pub fn rc_path(&self, env: &Environment) -> Option<PathBuf> {
        if self.no_rc {
            return None;
        }
        if let Some(path) = &self.rc {
            return Some(path.clone());
        }
        Some(match env.get(HOME_VAR) {
            Some(dir) => Path::new(dir).join(RC_FILE_NAME),
            None => PathBuf::from(RC_FILE_NAME),
        })
    }

    /// Log level from `--log-level`, then `$SUSH_LOG`; `warn` when neither
    /// is set or parses.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
            .clone()
            .or_else(|| std::env::var(LOG_VAR).ok())
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::WARN)
    }
}

/// The prompt for the next line: `$PS1` or [`DEFAULT_PROMPT`].
pub fn prompt(env: &Environment) -> String {
    env.get(PROMPT_VAR).unwrap_or(DEFAULT_PROMPT).to_string()
}

/// Whether a start-up file may be replayed: it must be readable and
/// executable by its owner.
#[cfg(unix)]
pub fn is_replayable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o500 == 0o500)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_replayable(path: &Path) -> bool {
    path.is_file()
}
