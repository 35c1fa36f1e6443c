//! Run log output
//!
//! The engine logs three kinds of things: progress lines for the run and
//! its retry rounds, per-unit failures as they happen, and the end-of-run
//! failure listings. [`Logger`] renders all of them with an elapsed-time
//! stamp so interleaved worker output can be read in order. Quiet mode
//! drops everything except errors; verbose mode adds per-unit detail lines.

use std::time::{Duration, Instant};

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    started: Instant,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            started: Instant::now(),
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            started: Instant::now(),
        }
    }

    fn prefix(&self) -> String {
        stamp_for(self.started.elapsed())
    }

    /// Progress line
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", self.prefix(), message);
        }
    }

    /// Recoverable oddity, e.g. namespaces left uncreated after retries
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} warning: {}", self.prefix(), message);
        }
    }

    /// Per-unit or fatal failure; printed even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("{} error: {}", self.prefix(), message);
    }

    /// Per-unit detail (credential resolution, tag listings, job
    /// completions); only shown in verbose mode
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{}   .. {}", self.prefix(), message);
        }
    }

    /// End-of-run failure listing: a heading line followed by one indented
    /// line per failed unit. Nothing is printed when there are no entries.
    pub fn failure_list(&self, heading: &str, entries: &[String]) {
        if self.quiet || entries.is_empty() {
            return;
        }
        println!("{} {}:", self.prefix(), heading);
        for entry in entries {
            println!("          {}", entry);
        }
    }
}

/// `[  12.3s]`, fixed width so stamped lines line up
fn stamp_for(elapsed: Duration) -> String {
    format!("[{:>6.1}s]", elapsed.as_secs_f64())
}
