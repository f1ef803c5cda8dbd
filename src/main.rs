use std::io::{self, IsTerminal};
use std::process::ExitCode;
use sush::Interpreter;
use sush::config::Options;
use sush::source::{EditorSource, ReaderSource};

fn main() -> ExitCode {
    let options: Options = argh::from_env();

    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(options.log_level())
        .with_target(false)
        .without_time()
        .try_init();

    let mut sh = Interpreter::default();

    if let Some(line) = &options.command {
        let code = sh.execute_line(line);
        return status(code);
    }

    if let Some(rc) = options.rc_path(sh.env()) {
        if let Err(e) = sh.run_rc_file(&rc) {
            eprintln!("sush: {e:#}");
        }
    }
    if sh.should_exit() {
        return ExitCode::SUCCESS;
    }

    let result = if io::stdin().is_terminal() {
        EditorSource::new()
            .map_err(anyhow::Error::from)
            .and_then(|mut editor| sh.run_source(&mut editor))
    } else {
        sh.run_source(&mut ReaderSource::new(io::stdin().lock()))
    };

    match result {
        Ok(code) => status(code),
        Err(e) => {
            eprintln!("sush: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn status(code: sush::command::ExitCode) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
