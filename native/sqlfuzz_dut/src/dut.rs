/// Statement testing and outcome classification
///
/// `DutAdapter` runs one candidate statement, classifies whatever the engine
/// reported, then confirms the connection is still alive. A dead connection
/// overrides every other classification.
use crate::backend::Backend;
use crate::error::{AdapterError, DutError, EngineError};
use regex::Regex;
use tracing::{debug, warn};

/// What a matching rule turns an engine error into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Syntax,
    UserAbort,
    Timeout,
}

/// Statement outcomes that are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The harness itself stopped row iteration early.
    UserAbort,
}

/// Engine-declared `(pattern, classification)` list, evaluated in order.
///
/// A pattern must match the whole engine message, not a substring of it.
/// Coupled to engine message wording: an engine upgrade that rewords a
/// message silently moves it to `Failure`.
#[derive(Debug)]
pub struct ErrorRules {
    rules: Vec<(Regex, Classification)>,
    busy_codes: &'static [i32],
}

impl ErrorRules {
    /// Compile `rules`, anchoring every pattern at both ends.
    pub fn new(rules: &[(&str, Classification)]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(pattern, class)| Ok((Regex::new(&format!("^(?:{pattern})$"))?, *class)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(ErrorRules {
            rules,
            busy_codes: &[],
        })
    }

    /// Result codes meaning busy/locked, classified as `Timeout` before any
    /// pattern is consulted.
    pub fn with_busy_codes(mut self, codes: &'static [i32]) -> Self {
        self.busy_codes = codes;
        self
    }

    pub fn classify(&self, err: &EngineError) -> Option<Classification> {
        if let Some(code) = err.code {
            if self.busy_codes.contains(&(code & 0xff)) {
                return Some(Classification::Timeout);
            }
        }
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(&err.message))
            .map(|(_, class)| *class)
    }

    /// Map an engine error onto the test outcome taxonomy. Unmatched errors
    /// are confirmed failures, never silent successes.
    pub fn verdict(&self, err: EngineError) -> Result<Outcome, DutError> {
        match self.classify(&err) {
            Some(Classification::Syntax) => Err(DutError::Syntax(err.message)),
            Some(Classification::UserAbort) => Ok(Outcome::UserAbort),
            Some(Classification::Timeout) => Err(DutError::Timeout(err.message)),
            None => Err(DutError::Failure(err.to_string())),
        }
    }
}

/// Device under test: the fuzz driver's only view of an engine.
pub trait Dut {
    /// `Ok` for success or a benign abort; `Err(DutError::Broken)` ends the
    /// session, any other `Err` ends only this statement.
    fn test(&mut self, stmt: &str) -> Result<Outcome, DutError>;
}

/// Test executor over any backend. Owns its connection.
#[derive(Debug)]
pub struct DutAdapter<B: Backend> {
    backend: B,
}

impl<B: Backend> DutAdapter<B> {
    pub fn new(backend: B) -> Self {
        DutAdapter { backend }
    }

    /// Parse `conninfo` with the backend's option spec and connect.
    pub fn open(conninfo: &str) -> Result<Self, AdapterError> {
        let info = B::parse_conninfo(conninfo)?;
        Ok(DutAdapter::new(B::connect(&info)?))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_inner(self) -> B {
        self.backend
    }
}

impl<B: Backend> Dut for DutAdapter<B> {
    fn test(&mut self, stmt: &str) -> Result<Outcome, DutError> {
        let verdict = match self.backend.run(stmt) {
            Ok(()) => Ok(Outcome::Success),
            Err(err) => self.backend.error_rules().verdict(err),
        };

        if let Err(e) = self.backend.probe() {
            warn!(target: "sqlfuzz::dut", engine = B::ENGINE, "{e}");
            return Err(DutError::Broken(e.to_string()));
        }

        debug!(target: "sqlfuzz::dut", engine = B::ENGINE, "{stmt:?} -> {verdict:?}");
        verdict
    }
}

impl<D: Dut + ?Sized> Dut for Box<D> {
    fn test(&mut self, stmt: &str) -> Result<Outcome, DutError> {
        (**self).test(stmt)
    }
}
