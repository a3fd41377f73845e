//! Unified error types for the dosing core and the patch command pipeline.
//!
//! A single [`Error`] enum that every subsystem converts into, with one
//! subsystem enum per half of the crate:
//!
//! - [`DosingError`]: why a decision cycle produced no output.
//! - [`TaskError`]: why a patch command did not complete.
//!
//! Nothing here panics or unwinds; every failure is a value the caller
//! (and the event channel) can inspect.

use core::fmt;

use crate::app::ports::ConfigError;
use crate::patch::task::TaskFunc;
use crate::patch::transport::ResultCode;
use crate::safety::LimitViolation;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A dosing decision cycle was aborted.
    Dosing(DosingError),
    /// A patch command task failed.
    Task(TaskError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dosing(e) => write!(f, "dosing: {e}"),
            Self::Task(e) => write!(f, "task: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl From<DosingError> for Error {
    fn from(e: DosingError) -> Self {
        Self::Dosing(e)
    }
}

impl From<TaskError> for Error {
    fn from(e: TaskError) -> Self {
        Self::Task(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Dosing errors
// ---------------------------------------------------------------------------

/// A required input for the decision cycle was unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Profile,
    Pump,
    /// Engine switched off, or the pump cannot run temp basals.
    EngineDisabled,
    GlucoseData,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => write!(f, "no profile selected"),
            Self::Pump => write!(f, "no pump selected"),
            Self::EngineDisabled => write!(f, "dosing engine disabled"),
            Self::GlucoseData => write!(f, "no glucose data available"),
        }
    }
}

/// Structural failure reported by the algorithm adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// The adapter could not consume the snapshot.
    MalformedInput(String),
    /// The adapter produced output that is not a usable recommendation.
    MalformedOutput(String),
}

impl fmt::Display for AlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            Self::MalformedOutput(msg) => write!(f, "malformed output: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DosingError {
    /// Terminal for the cycle; the previously published result stays.
    MissingInput(MissingInput),
    /// A `check_only` gate (or a non-finite verified value) failed.
    HardLimit(LimitViolation),
    /// The adapter failed; the published result is cleared.
    Algorithm(AlgorithmError),
}

impl DosingError {
    /// Whether this failure clears the published result.
    pub fn clears_cache(&self) -> bool {
        matches!(self, Self::Algorithm(_))
    }
}

impl fmt::Display for DosingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput(m) => write!(f, "{m}"),
            Self::HardLimit(v) => write!(f, "hard limit: {v}"),
            Self::Algorithm(e) => write!(f, "algorithm: {e}"),
        }
    }
}

impl From<MissingInput> for DosingError {
    fn from(m: MissingInput) -> Self {
        Self::MissingInput(m)
    }
}

impl From<LimitViolation> for DosingError {
    fn from(v: LimitViolation) -> Self {
        Self::HardLimit(v)
    }
}

impl From<AlgorithmError> for DosingError {
    fn from(e: AlgorithmError) -> Self {
        Self::Algorithm(e)
    }
}

// ---------------------------------------------------------------------------
// Task errors
// ---------------------------------------------------------------------------

/// The patch was not in a state that allows the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionFailure {
    NotConnected,
    NotActivated,
}

impl fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "patch not connected"),
            Self::NotActivated => write!(f, "patch not activated"),
        }
    }
}

/// Failure inside the device transport itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The link dropped while the command was outstanding.
    Disconnected,
    /// The bond-state observation ended without a terminal state.
    StreamClosed,
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "link disconnected"),
            Self::StreamClosed => write!(f, "bond-state stream closed"),
            Self::Io(msg) => write!(f, "I/O: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    /// Aborted before anything was transmitted.
    Precondition(PreconditionFailure),
    /// The patch answered with a negative acknowledgement.
    Rejected { func: TaskFunc, code: ResultCode },
    /// The invocation did not finish within its deadline.
    Timeout { func: TaskFunc, after_ms: u64 },
    /// The bond-state stream reported "unbonded" before "bonded".
    Unbonded,
    /// Caller-supplied arguments cannot form a device command.
    InvalidArgument(&'static str),
    Transport(TransportError),
    /// Local persistence of device state failed.
    Storage(ConfigError),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precondition(p) => write!(f, "precondition: {p}"),
            Self::Rejected { func, code } => write!(f, "{func:?} rejected by patch: {code:?}"),
            Self::Timeout { func, after_ms } => write!(f, "{func:?} timed out after {after_ms} ms"),
            Self::Unbonded => write!(f, "bond state returned to none"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<PreconditionFailure> for TaskError {
    fn from(p: PreconditionFailure) -> Self {
        Self::Precondition(p)
    }
}

impl From<TransportError> for TaskError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
