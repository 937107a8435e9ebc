use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::process::Command;

use inquire::{error::InquireError, Text};
use log::debug;

pub type InputResult<T> = Result<T, InquireError>;

/// The interactive side of a command: showing a preview and asking the
/// user to confirm.
pub trait Prompt {
    fn preview(&mut self, pdf: &Path) -> io::Result<()>;
    fn confirm(&mut self, question: &str) -> InputResult<bool>;
}

/// Prompts on the controlling terminal and opens files with the
/// platform's default viewer.
pub struct Terminal;

impl Prompt for Terminal {
    fn preview(&mut self, pdf: &Path) -> io::Result<()> {
        let mut cmd = open_command(pdf);
        debug!("Running {:?}", cmd);
        cmd.spawn().map(|_| ())
    }

    fn confirm(&mut self, question: &str) -> InputResult<bool> {
        if !io::stdin().is_terminal() {
            return read_answer(question);
        }
        match Text::new(question).prompt() {
            Ok(answer) => Ok(is_yes(&answer)),
            Err(InquireError::OperationCanceled)
            | Err(InquireError::OperationInterrupted) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn read_answer(question: &str) -> InputResult<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{} ", question)?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

/// Only an explicit yes counts; an empty line cancels.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn open_command(path: &Path) -> Command {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(windows) {
        let mut cmd = Command::new("rundll32");
        cmd.arg("url.dll,FileProtocolHandler");
        cmd
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path);
    cmd
}
