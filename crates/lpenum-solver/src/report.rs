//! Sinks the solver reports through: a [`Printer`] for the human-readable
//! trace and an [`ErrorHandler`] for branches that had to be abandoned.

use crate::error::SolveError;

/// Receives progress text in the order it is produced
pub trait Printer {
    fn emit(&mut self, text: &str);
}

/// Receives every failure that ends a branch of the search
pub trait ErrorHandler {
    fn handle(&mut self, error: &SolveError);
}

impl Printer for String {
    fn emit(&mut self, text: &str) {
        self.push_str(text);
    }
}

impl<P: Printer + ?Sized> Printer for &mut P {
    fn emit(&mut self, text: &str) {
        (**self).emit(text);
    }
}

/// Writes the trace to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn emit(&mut self, text: &str) {
        print!("{}", text);
    }
}

/// Forwards the trace to the `log` facade at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPrinter;

impl Printer for LogPrinter {
    fn emit(&mut self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            log::debug!("{}", line);
        }
    }
}

/// Discards the trace
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPrinter;

impl Printer for NullPrinter {
    fn emit(&mut self, _text: &str) {}
}

/// Logs failures at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrors;

impl ErrorHandler for LogErrors {
    fn handle(&mut self, error: &SolveError) {
        log::error!("branch abandoned: {}", error);
    }
}

impl ErrorHandler for Vec<SolveError> {
    fn handle(&mut self, error: &SolveError) {
        self.push(error.clone());
    }
}

impl<H: ErrorHandler + ?Sized> ErrorHandler for &mut H {
    fn handle(&mut self, error: &SolveError) {
        (**self).handle(error);
    }
}
