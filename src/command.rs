use crate::env::Environment;
use crate::error::ShellError;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Object-safe handler for one internal command.
///
/// Internal commands run inside the interpreter process with direct access to
/// the [`Environment`]; they are never forked.
pub trait InternalCommand {
    /// Name the command is invoked by, e.g. "cd".
    fn name(&self) -> &'static str;

    /// Runs the command with the words following its name.
    fn run(
        &self,
        args: &[String],
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode, ShellError>;
}

/// Name to handler lookup for the internal commands, built once at start-up.
pub struct CommandTable {
    commands: Vec<Box<dyn InternalCommand>>,
}

impl CommandTable {
    pub fn new(commands: Vec<Box<dyn InternalCommand>>) -> Self {
        Self { commands }
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn InternalCommand> {
        self.commands
            .iter()
            .find(|cmd| cmd.name() == name)
            .map(|cmd| cmd.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|cmd| cmd.name())
    }
}

impl Default for CommandTable {
    /// The built-ins: `setenv`, `getenv`, `unsetenv`, `cd`, `pwd`, `exit`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Setenv>::default()),
            Box::new(Factory::<Getenv>::default()),
            Box::new(Factory::<Unsetenv>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}
