use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::engine::core::DialogMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOptions {
    YesNo,
    YesNoCancel,
    OkCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAnswer {
    Yes,
    No,
    Cancel,
}

/// Modal messages shown on behalf of the game. Implementations block the
/// calling thread until the player answers.
pub trait Dialogs {
    fn show(&mut self, msg: &str, title: &str);

    fn confirm(&mut self, msg: &str, title: &str, options: DialogOptions) -> DialogAnswer;

    fn input(&mut self, msg: &str, title: &str) -> Option<String>;

    fn confirm_yes_no(&mut self, msg: &str, title: &str) -> bool {
        self.confirm(msg, title, DialogOptions::YesNo) == DialogAnswer::Yes
    }
}

pub fn from_mode(mode: DialogMode) -> Box<dyn Dialogs> {
    match mode {
        DialogMode::Auto => Box::new(AutoDialogs::default()),
        DialogMode::Console => Box::new(ConsoleDialogs::stdio()),
    }
}

/// Answers without asking anybody: queued replies first, then the
/// fallback answer. Shown messages are kept for inspection.
#[derive(Debug, Clone)]
pub struct AutoDialogs {
    fallback: DialogAnswer,
    answers: VecDeque<DialogAnswer>,
    inputs: VecDeque<String>,
    shown: Vec<String>,
}

impl Default for AutoDialogs {
    fn default() -> Self {
        Self::answering(DialogAnswer::Yes)
    }
}

impl AutoDialogs {
    pub fn answering(fallback: DialogAnswer) -> Self {
        Self {
            fallback,
            answers: VecDeque::new(),
            inputs: VecDeque::new(),
            shown: Vec::new(),
        }
    }

    pub fn push_answer(&mut self, answer: DialogAnswer) {
        self.answers.push_back(answer);
    }

    pub fn push_input(&mut self, input: impl Into<String>) {
        self.inputs.push_back(input.into());
    }

    pub fn shown(&self) -> &[String] {
        &self.shown
    }
}

impl Dialogs for AutoDialogs {
    fn show(&mut self, msg: &str, title: &str) {
        tracing::info!(target: "dialog", title, msg, "message");
        self.shown.push(msg.to_string());
    }

    fn confirm(&mut self, msg: &str, title: &str, options: DialogOptions) -> DialogAnswer {
        let answer = self.answers.pop_front().unwrap_or(self.fallback);
        tracing::info!(target: "dialog", title, msg, ?options, ?answer, "auto-confirmed");
        answer
    }

    fn input(&mut self, msg: &str, title: &str) -> Option<String> {
        let input = self.inputs.pop_front();
        tracing::info!(target: "dialog", title, msg, ?input, "auto-input");
        input
    }
}

/// Text prompts on a reader/writer pair, stdin and stderr by default.
pub struct ConsoleDialogs<R, W> {
    reader: R,
    writer: W,
}

impl ConsoleDialogs<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsoleDialogs<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn prompt(&mut self, title: &str, msg: &str, hint: &str) -> Option<String> {
        let header = if title.is_empty() {
            String::new()
        } else {
            format!("[{title}] ")
        };
        let written = write!(self.writer, "{header}{msg}{hint}").and_then(|_| self.writer.flush());
        if let Err(err) = written {
            tracing::warn!(target: "dialog", %err, "failed to write prompt");
        }
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(err) => {
                tracing::warn!(target: "dialog", %err, "failed to read answer");
                None
            }
        }
    }
}

impl<R: BufRead, W: Write> Dialogs for ConsoleDialogs<R, W> {
    fn show(&mut self, msg: &str, title: &str) {
        self.prompt(title, msg, " [enter] ");
    }

    fn confirm(&mut self, msg: &str, title: &str, options: DialogOptions) -> DialogAnswer {
        let hint = match options {
            DialogOptions::YesNo => " [y/n] ",
            DialogOptions::YesNoCancel => " [y/n/c] ",
            DialogOptions::OkCancel => " [ok/c] ",
        };
        let Some(reply) = self.prompt(title, msg, hint) else {
            return DialogAnswer::Cancel;
        };
        match reply.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "ok" => DialogAnswer::Yes,
            "n" | "no" if options != DialogOptions::OkCancel => DialogAnswer::No,
            _ if options == DialogOptions::YesNo => DialogAnswer::No,
            _ => DialogAnswer::Cancel,
        }
    }

    fn input(&mut self, msg: &str, title: &str) -> Option<String> {
        self.prompt(title, msg, ": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &str) -> ConsoleDialogs<&[u8], Vec<u8>> {
        ConsoleDialogs::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn auto_dialogs_replay_queue_then_fallback() {
        let mut dialogs = AutoDialogs::answering(DialogAnswer::No);
        dialogs.push_answer(DialogAnswer::Yes);
        assert!(dialogs.confirm_yes_no("Are you sure to exit?", ""));
        assert!(!dialogs.confirm_yes_no("Are you sure to exit?", ""));
        dialogs.push_input("ice1000");
        assert_eq!(dialogs.input("name", "").as_deref(), Some("ice1000"));
        assert_eq!(dialogs.input("name", ""), None);
        dialogs.show("hello", "");
        assert_eq!(dialogs.shown(), ["hello"]);
    }

    #[test]
    fn console_parses_answers() {
        assert_eq!(console("yes\n").confirm("q", "", DialogOptions::YesNo), DialogAnswer::Yes);
        assert_eq!(console("n\n").confirm("q", "", DialogOptions::YesNoCancel), DialogAnswer::No);
        assert_eq!(console("maybe\n").confirm("q", "", DialogOptions::YesNo), DialogAnswer::No);
        assert_eq!(console("maybe\n").confirm("q", "", DialogOptions::YesNoCancel), DialogAnswer::Cancel);
        assert_eq!(console("").confirm("q", "", DialogOptions::YesNo), DialogAnswer::Cancel);
    }

    #[test]
    fn console_input_strips_newline_and_writes_prompt() {
        let mut dialogs = console("player one\r\n");
        assert_eq!(dialogs.input("Name", "Setup").as_deref(), Some("player one"));
        assert_eq!(String::from_utf8(dialogs.writer).unwrap(), "[Setup] Name: ");
    }
}
