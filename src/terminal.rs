//! Operator input from the controlling terminal

use anyhow::{Context, Result};
use console::Term;
use dialoguer::Password;
use reconcile::{KeySource, Keystroke};
use std::io::{self, ErrorKind};

/// Ctrl-C as delivered in raw mode
const END_OF_TEXT: char = '\u{3}';

/// Single key presses from the terminal, without waiting for Enter
///
/// Reads and echoes through stderr so stdout can be piped to a log.
pub struct TerminalKeys {
    term: Term,
}

impl TerminalKeys {
    pub fn new() -> Self {
        Self { term: Term::stderr() }
    }
}

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> io::Result<Keystroke> {
        let key = match self.term.read_char() {
            Ok(key) => key,
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(Keystroke::Cancel),
            Err(e) => return Err(e),
        };

        let keystroke = to_keystroke(key);
        match keystroke {
            Keystroke::Char(c) if !c.is_control() => self.term.write_line(&c.to_string())?,
            _ => self.term.write_line("")?,
        }
        Ok(keystroke)
    }
}

fn to_keystroke(key: char) -> Keystroke {
    if key == END_OF_TEXT {
        Keystroke::Cancel
    } else {
        Keystroke::Char(key)
    }
}

/// Ask for the bind password without echoing it
pub fn prompt_password(bind_dn: &str) -> Result<String> {
    Password::new()
        .with_prompt(format!("Password for {bind_dn}"))
        .allow_empty_password(true)
        .interact()
        .context("Could not read the bind password")
}
