use crate::command::{ExitCode, InternalCommand};
use crate::env::Environment;
use crate::error::ShellError;
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::LazyLock;

static VARIABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "setenv" or "cd".
    fn name() -> &'static str;

    /// Executes the command against the interpreter's environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Adapts a [`BuiltinCommand`] type to the object-safe [`InternalCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand> InternalCommand for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn run(
        &self,
        args: &[String],
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode, ShellError> {
        let failure = |message: String| ShellError::InternalCommand {
            name: T::name().to_string(),
            message,
        };

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let cmd = match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd,
            // --help
            Err(EarlyExit { output, status: Ok(()) }) => {
                stdout
                    .write_all(output.as_bytes())
                    .map_err(|e| failure(e.to_string()))?;
                return Ok(0);
            }
            Err(EarlyExit { output, status: Err(()) }) => {
                return Err(failure(output.trim_end().to_string()));
            }
        };

        tracing::debug!("running built-in {} {:?}", T::name(), args);
        cmd.execute(stdout, env).map_err(|e| failure(format!("{e:#}")))
    }
}

fn check_variable_name(name: &str) -> Result<()> {
    if !VARIABLE_NAME.is_match(name) {
        bail!("invalid variable name: {name:?}");
    }
    Ok(())
}

#[derive(FromArgs)]
/// Set an environment variable, replacing any previous value.
pub struct Setenv {
    #[argh(positional)]
    /// variable name; letters, digits and underscores, not starting with a digit.
    pub name: String,

    #[argh(positional)]
    /// value to store.
    pub value: String,
}

impl BuiltinCommand for Setenv {
    fn name() -> &'static str {
        "setenv"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        check_variable_name(&self.name)?;
        env.set(self.name, self.value);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print one environment variable, or all of them as name=value lines.
pub struct Getenv {
    #[argh(positional)]
    /// variable to print; prints the whole environment when omitted.
    pub name: Option<String>,
}

impl BuiltinCommand for Getenv {
    fn name() -> &'static str {
        "getenv"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match &self.name {
            None => {
                for (name, value) in env.vars() {
                    writeln!(stdout, "{name}={value}")?;
                }
            }
            Some(name) => match env.get(name) {
                Some(value) => writeln!(stdout, "{value}")?,
                None => bail!("{name} is not set"),
            },
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove an environment variable.
pub struct Unsetenv {
    #[argh(positional)]
    /// variable to remove.
    pub name: String,
}

impl BuiltinCommand for Unsetenv {
    fn name() -> &'static str {
        "unsetenv"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        check_variable_name(&self.name)?;
        env.unset(&self.name);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the working directory of the shell and of every program it starts later.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, relative to the current one; $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    /// Moves the process and the store together: `PWD` gets the new
    /// directory and `OLDPWD` the one being left.
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.target.as_deref() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => env.get("HOME").map(PathBuf::from).context("HOME is not set")?,
        };

        // join() keeps an absolute target as is
        let resolved = fs::canonicalize(env.current_dir.join(&target))
            .with_context(|| format!("{}: no such directory", target.display()))?;
        if !resolved.is_dir() {
            bail!("{}: not a directory", target.display());
        }
        std::env::set_current_dir(&resolved)
            .with_context(|| format!("{}: cannot enter", target.display()))?;

        let pwd = resolved.to_string_lossy().into_owned();
        let previous = std::mem::replace(&mut env.current_dir, resolved);
        env.set("OLDPWD", previous.to_string_lossy());
        env.set("PWD", pwd);
        tracing::debug!("cd {} -> {}", previous.display(), env.current_dir.display());
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell once the current line is done.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}
