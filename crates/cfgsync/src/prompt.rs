//! Line-oriented user interaction.
//!
//! All interactive components talk to a [`Prompter`], so the terminal can be
//! swapped for a scripted transcript. `b` and `q` are reserved answers on every
//! prompt; closed input ends the whole session.

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{self, BufRead as _, Write as _};

/// Output/input seam between the engine and the user.
pub trait Prompter {
    /// Show one line of output.
    fn say(&mut self, line: &str);
    /// Show `prompt` and read one line. `None` means input is closed.
    fn ask(&mut self, prompt: &str) -> Option<String>;
}

/// Result of a bounded prompt loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompted<T> {
    Value(T),
    /// User answered `b`.
    Back,
    /// User answered `q`.
    Quit,
    /// Input was closed.
    Closed,
    /// Too many invalid answers.
    Exhausted,
}

/// Ask until `parse` accepts an answer, at most `max_attempts` times.
///
/// Reserved answers (`b`, `q`) short-circuit before `parse` sees them.
pub fn ask_until<T, E, F>(
    prompter: &mut dyn Prompter,
    prompt: &str,
    max_attempts: usize,
    mut parse: F,
) -> Prompted<T>
where
    E: Display,
    F: FnMut(&str) -> Result<T, E>,
{
    for attempt in 1..=max_attempts {
        let Some(raw) = prompter.ask(prompt) else {
            return Prompted::Closed;
        };
        let answer = raw.trim();
        if answer.eq_ignore_ascii_case("b") {
            return Prompted::Back;
        }
        if answer.eq_ignore_ascii_case("q") {
            return Prompted::Quit;
        }
        match parse(answer) {
            Ok(v) => return Prompted::Value(v),
            Err(e) => {
                tracing::debug!(attempt, "rejected answer: {}", e);
                prompter.say(&format!("  {e} (attempt {attempt} of {max_attempts})"));
            }
        }
    }
    tracing::info!("prompt exhausted after {} attempts", max_attempts);
    prompter.say("  Too many invalid answers, going back.");
    Prompted::Exhausted
}

/// Yes/no confirmation.
pub fn confirm(prompter: &mut dyn Prompter, prompt: &str, max_attempts: usize) -> Prompted<bool> {
    ask_until(prompter, prompt, max_attempts, |answer| {
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => Err(format!("please answer y or n, not '{answer}'")),
        }
    })
}

/// Parse a 1-based menu index into a 0-based one.
pub fn parse_index(answer: &str, count: usize) -> Result<usize, String> {
    match answer.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(format!("'{answer}' is not a number between 1 and {count}")),
    }
}

/// Prompter over the process's stdin/stdout.
pub struct TerminalPrompter {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn say(&mut self, line: &str) {
        let mut out = self.stdout.lock();
        if let Err(e) = writeln!(out, "{line}") {
            tracing::warn!("failed to write to stdout: {}", e);
        }
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        {
            let mut out = self.stdout.lock();
            let _ = write!(out, "{prompt}");
            let _ = out.flush();
        }
        let mut line = String::new();
        match self.stdin.lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::warn!("failed to read stdin: {}", e);
                None
            }
        }
    }
}

/// Prompter that replays canned answers and records everything shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// True if any shown line or prompt contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|l| l.contains(needle))
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        self.transcript.push(prompt.to_string());
        self.answers.pop_front()
    }
}
