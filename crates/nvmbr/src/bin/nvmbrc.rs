//! `nvmbrc` — the command-line driver: a REPL with no arguments, or a
//! single script file read and interpreted to completion.

use clap::Parser;
use nvmbr::InterpretError;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Run NVMbr scripts, or start an interactive session with no arguments.
#[derive(Parser)]
#[command(name = "nvmbrc", version, about)]
struct Args {
    /// Script to execute. Omit to start a REPL.
    path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(u8::try_from(exitcode::USAGE).expect("sysexits fit in u8"));
        }
    };

    match args.path {
        None => match nvmbr::repl::run() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err}");
                ExitCode::from(u8::try_from(exitcode::IOERR).expect("sysexits fit in u8"))
            }
        },
        Some(path) => run_file(&path),
    }
}

fn run_file(path: &PathBuf) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file \"{}\": {err}", path.display());
            return ExitCode::from(u8::try_from(exitcode::IOERR).expect("sysexits fit in u8"));
        }
    };

    match nvmbr::interpret(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(InterpretError::Compile(_)) => {
            ExitCode::from(u8::try_from(exitcode::DATAERR).expect("sysexits fit in u8"))
        }
        Err(InterpretError::Runtime(_)) => {
            ExitCode::from(u8::try_from(exitcode::SOFTWARE).expect("sysexits fit in u8"))
        }
    }
}
