//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` prints `"  → {message}"`
/// - `success()` prints `"  ✓ {message}"`
/// - `warn()` prints `"  ! {message}"`
/// - `begin_wait()` shows a spinner on a TTY, else behaves like `step()`
///
/// All of them are suppressed when `ctx.quiet`. Any line clears a running
/// spinner first.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    pub(super) spinner: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            spinner: RefCell::new(None),
        }
    }

    fn end_wait(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            progress::clear(&pb);
        }
    }

    fn line(&self, marker: &str, message: &str) {
        self.end_wait();
        if !self.ctx.quiet {
            eprintln!("  {marker} {message}");
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.line(&"→".style(self.ctx.styles.step).to_string(), message);
    }

    fn success(&self, message: &str) {
        self.line(&"✓".style(self.ctx.styles.success).to_string(), message);
    }

    fn warn(&self, message: &str) {
        self.line(&"!".style(self.ctx.styles.warning).to_string(), message);
    }

    fn begin_wait(&self, message: &str) {
        if self.ctx.show_progress() {
            self.end_wait();
            *self.spinner.borrow_mut() = Some(progress::spinner(message));
        } else {
            self.step(message);
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.end_wait();
    }
}
