//! The interactive read-eval-print loop.
//!
//! One long-lived [`Vm`] backs the whole session, so a global defined on one
//! line is still visible on the next - the same persistence the original's
//! `repl()` gets for free by keeping a single process-wide `VM`.

use crate::vm::{InterpretError, Vm};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "> ";

/// Run the REPL until EOF (Ctrl-D) or an interrupt (Ctrl-C).
///
/// # Errors
///
/// Returns an error if the line editor itself fails (not for NVMbr compile
/// or runtime errors, which are reported to stderr and simply resume the
/// loop - one bad line doesn't end the session).
pub fn run() -> rustyline::Result<()> {
    let mut vm = Vm::new();
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                // Diagnostics are already written to stderr by `interpret`;
                // one bad line doesn't end the session.
                let _: Result<(), InterpretError> = vm.interpret(&line);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
