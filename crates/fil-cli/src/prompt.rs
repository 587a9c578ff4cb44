//! Line-based terminal prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use tracing::warn;

use fil_core::Spool;
use fil_move::{Choice, SpoolChooser};
use fil_planner::{Answer, Decision};

/// Prompts are only shown when every standard stream is a real terminal.
pub fn interactive_allowed(non_interactive: bool) -> bool {
    if non_interactive {
        return false;
    }
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() || !io::stderr().is_terminal() {
        return false;
    }
    let term = std::env::var("TERM").unwrap_or_default();
    let term = term.trim();
    !term.is_empty() && !term.eq_ignore_ascii_case("dumb")
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// One trimmed line, or `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question} ")?;
        self.output.flush()?;
        self.read_line()
    }

    /// Yes/no question defaulting to no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let reply = self.ask(&format!("{question} [y/N]"))?;
        Ok(matches!(
            reply.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }

    /// Numbered selection. Blank input takes `default`; `q` or end of
    /// input cancels.
    pub fn select(
        &mut self,
        label: &str,
        items: &[String],
        default: Option<usize>,
    ) -> io::Result<Option<usize>> {
        writeln!(self.output, "{label}")?;
        for (index, item) in items.iter().enumerate() {
            writeln!(self.output, "  {:>3}) {item}", index + 1)?;
        }
        loop {
            let hint = match default {
                Some(index) => format!("Choice [1-{}, q to cancel, default {}]:", items.len(), index + 1),
                None => format!("Choice [1-{}, q to cancel]:", items.len()),
            };
            let Some(reply) = self.ask(&hint)? else {
                return Ok(None);
            };
            if reply.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            if reply.is_empty() {
                if default.is_some() {
                    return Ok(default);
                }
                continue;
            }
            match reply.parse::<usize>() {
                Ok(n) if (1..=items.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(self.output, "Not a valid choice: {reply}")?,
            }
        }
    }

    /// Ask the operator about one swap decision.
    pub fn answer(&mut self, decision: &Decision) -> io::Result<Answer> {
        let question = decision.to_string();
        match decision {
            Decision::ConfirmRestage { .. } | Decision::ConfirmCrossPrinter { .. } => {
                Ok(if self.confirm(&question)? { Answer::Yes } else { Answer::No })
            }
            Decision::EvictDestination { .. } => {
                let reply = self.ask(&format!("{question}\n  >"))?;
                Ok(Answer::Destination(reply.unwrap_or_default()))
            }
            Decision::ConfirmLoad { .. } => {
                let reply = self.ask(&format!("{question} Press Enter when done, n to skip:"))?;
                Ok(match reply.as_deref() {
                    None => Answer::No,
                    Some(text) if text.eq_ignore_ascii_case("n") => Answer::No,
                    Some(_) => Answer::Done,
                })
            }
        }
    }
}

impl<R: BufRead, W: Write> SpoolChooser for Prompter<R, W> {
    fn choose(&mut self, selector: &str, matches: &[Spool], others: &[Spool]) -> Choice {
        let spools: Vec<&Spool> = matches.iter().chain(others.iter()).collect();
        let items: Vec<String> = spools.iter().map(|spool| spool.to_string()).collect();
        let label = format!("{} spools match {selector:?}; pick one:", matches.len());
        match self.select(&label, &items, None) {
            Ok(Some(index)) => Choice::Selected(spools[index].id),
            Ok(None) => Choice::Cancelled,
            Err(err) => {
                warn!("prompt failed: {err}");
                Choice::Cancelled
            }
        }
    }
}
