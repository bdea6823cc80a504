//! Repository eviction: an interactive selection state machine that picks
//! how many of the lowest-ranked repositories to delete, then a batch
//! executor that pops them from the consumption heap and issues deletions.
//!
//! Selection flow:
//!
//! ```text
//! AwaitingNumber --int--> AwaitingConfirmation --"y"--> Validated(n)
//!       ^  |                       |
//!       +--+ not an int            +--other--> AwaitingNumber
//! any non-terminal state --end of input--> Cancelled
//! ```
//!
//! Input lines are taken as typed apart from the line terminator, so `" 5 "`
//! is not a number and `"y "` is not a confirmation.
//!
//! The `0 < n <= 50` bound is checked once, after confirmation, and a
//! violation is fatal for the run.

#![allow(missing_docs)]

use std::io::{BufRead, Write};

use serde::Serialize;

use crate::core::errors::{Result, RrpError};
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::retention::RunContext;
use crate::retention::ranking::RankingHeap;
use crate::retention::scoring::RepoCandidate;

/// Largest repository batch an operator may confirm in one run.
pub const MAX_REPO_BATCH: i64 = 50;

// ──────────────────── selection ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    AwaitingNumber,
    AwaitingConfirmation { requested: i64 },
    Validated { count: i64 },
    Cancelled,
}

impl SelectionState {
    /// Advance on one input line; `None` means the input stream ended.
    #[must_use]
    pub fn step(self, line: Option<&str>) -> Self {
        match (self, line) {
            (Self::Validated { .. } | Self::Cancelled, _) => self,
            (_, None) => Self::Cancelled,
            (Self::AwaitingNumber, Some(raw)) => match strip_terminator(raw).parse::<i64>() {
                Ok(requested) => Self::AwaitingConfirmation { requested },
                Err(_) => Self::AwaitingNumber,
            },
            (Self::AwaitingConfirmation { requested }, Some(raw)) => {
                if strip_terminator(raw).eq_ignore_ascii_case("y") {
                    Self::Validated { count: requested }
                } else {
                    Self::AwaitingNumber
                }
            }
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Validated { .. } | Self::Cancelled)
    }

    /// Prompt to print after moving from `previous` into `self`.
    fn prompt(self, previous: Option<Self>) -> Option<String> {
        match (previous, self) {
            (None, Self::AwaitingNumber) => {
                Some("\nPlease input the number of repositories you wish to delete: ".to_string())
            }
            (Some(Self::AwaitingNumber), Self::AwaitingNumber) => {
                Some("Invalid number, please input again: ".to_string())
            }
            (Some(Self::AwaitingConfirmation { .. }), Self::AwaitingNumber) => Some(
                "Not confirmed. Please input the number of repositories you wish to delete again: "
                    .to_string(),
            ),
            (_, Self::AwaitingConfirmation { requested }) => {
                Some(format!("The number you input: {requested}\nConfirm [y/n]: "))
            }
            _ => None,
        }
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Drive the selection state machine over `input`, writing prompts to `output`.
///
/// Returns `None` when the input ends before a number is confirmed.
pub fn prompt_batch_size<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<i64>> {
    let mut state = SelectionState::AwaitingNumber;
    let mut previous = None;
    let mut line = String::new();

    loop {
        if let Some(prompt) = state.prompt(previous) {
            write!(output, "{prompt}").map_err(|e| RrpError::io("<stdout>", e))?;
            output.flush().map_err(|e| RrpError::io("<stdout>", e))?;
        }
        match state {
            SelectionState::Validated { count } => return Ok(Some(count)),
            SelectionState::Cancelled => return Ok(None),
            _ => {}
        }

        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|e| RrpError::io("<stdin>", e))?;
        previous = Some(state);
        state = state.step((read > 0).then_some(line.as_str()));
    }
}

/// Enforce `0 < count <= MAX_REPO_BATCH` on a confirmed selection.
pub fn validate_batch_size(count: i64) -> Result<usize> {
    if count <= 0 || count > MAX_REPO_BATCH {
        return Err(RrpError::Validation {
            details: format!(
                "repository batch size {count} is outside the allowed range (0, {MAX_REPO_BATCH}]"
            ),
        });
    }
    usize::try_from(count).map_err(|_| RrpError::Validation {
        details: format!("repository batch size {count} does not fit in usize"),
    })
}

// ──────────────────── execution ────────────────────

/// A deletion request that the store rejected.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDeletion {
    pub name: String,
    pub error_code: String,
    pub error: String,
}

/// Outcome of one repository eviction batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvictionReport {
    pub requested: usize,
    pub deleted: Vec<RepoCandidate>,
    pub failed: Vec<FailedDeletion>,
    /// True when the heap ran dry before `requested` candidates were popped.
    pub exhausted: bool,
}

impl EvictionReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}

/// Pops the lowest-ranked repositories and issues soft deletions.
pub struct RepoEvictor<'ctx, 'a> {
    ctx: &'ctx mut RunContext<'a>,
}

impl<'ctx, 'a> RepoEvictor<'ctx, 'a> {
    pub fn new(ctx: &'ctx mut RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Delete up to `count` candidates from `heap`.
    ///
    /// Every deletion is independent: a failure is logged and recorded, and
    /// the batch moves on to the next candidate. Nothing is rolled back.
    pub fn execute(&mut self, heap: &mut RankingHeap, count: usize) -> Result<EvictionReport> {
        let mut report = EvictionReport {
            requested: count,
            ..EvictionReport::default()
        };

        for _ in 0..count {
            if heap.is_empty() {
                report.exhausted = true;
                break;
            }
            let candidate = heap.pop()?;
            let outcome = self.ctx.store.delete_repository(&candidate.name);

            let mut entry = LogEntry::new(EventType::RepoDelete, Severity::Info)
                .repository(candidate.name.clone())
                .outcome(outcome.as_ref().map(|_| ()));
            entry.score = Some(candidate.score);
            self.ctx.log.write_entry(&entry);

            match outcome {
                Ok(()) => report.deleted.push(candidate),
                Err(error) => report.failed.push(FailedDeletion {
                    name: candidate.name,
                    error_code: error.code().to_string(),
                    error: error.to_string(),
                }),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_prompt(input: &str) -> (Option<i64>, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let picked = prompt_batch_size(&mut reader, &mut out).unwrap();
        (picked, String::from_utf8(out).unwrap())
    }

    #[test]
    fn step_follows_transitions() {
        use SelectionState::*;
        assert_eq!(AwaitingNumber.step(Some("abc")), AwaitingNumber);
        assert_eq!(
            AwaitingNumber.step(Some("7\n")),
            AwaitingConfirmation { requested: 7 }
        );
        assert_eq!(
            AwaitingConfirmation { requested: 7 }.step(Some("Y")),
            Validated { count: 7 }
        );
        assert_eq!(
            AwaitingConfirmation { requested: 7 }.step(Some("yes")),
            AwaitingNumber
        );
        assert_eq!(AwaitingNumber.step(None), Cancelled);
        assert_eq!(AwaitingConfirmation { requested: 1 }.step(None), Cancelled);
        assert_eq!(Cancelled.step(Some("5")), Cancelled);
        assert!(Validated { count: 3 }.is_terminal());
    }

    #[test]
    fn surrounding_whitespace_is_not_trimmed() {
        use SelectionState::*;
        assert_eq!(AwaitingNumber.step(Some(" 5 \n")), AwaitingNumber);
        assert_eq!(
            AwaitingNumber.step(Some("5\r\n")),
            AwaitingConfirmation { requested: 5 }
        );
        assert_eq!(
            AwaitingConfirmation { requested: 5 }.step(Some("y \n")),
            AwaitingNumber
        );
        assert_eq!(run_prompt(" 2\n2\ny\n").0, Some(2));
    }

    #[test]
    fn reprompts_until_number_confirmed() {
        let (picked, out) = run_prompt("ten\n\n3\nn\n4\ny\n");
        assert_eq!(picked, Some(4));
        assert_eq!(out.matches("Invalid number").count(), 2);
        assert!(out.contains("Not confirmed"));
        assert!(out.contains("The number you input: 4"));
    }

    #[test]
    fn end_of_input_cancels_without_error() {
        assert_eq!(run_prompt("").0, None);
        assert_eq!(run_prompt("5\n").0, None);
    }

    #[test]
    fn out_of_range_value_is_accepted_by_prompt() {
        // The bound is enforced after confirmation, not during entry.
        assert_eq!(run_prompt("0\ny\n").0, Some(0));
        assert_eq!(run_prompt("-4\ny\n").0, Some(-4));
        assert_eq!(run_prompt("51\ny\n").0, Some(51));
    }

    #[test]
    fn batch_size_bounds() {
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(-1).is_err());
        assert!(validate_batch_size(51).is_err());
        assert_eq!(validate_batch_size(1).unwrap(), 1);
        assert_eq!(validate_batch_size(50).unwrap(), 50);
        assert_eq!(validate_batch_size(51).unwrap_err().code(), "RRP-4001");
    }
}
