//! Query lifecycle phases and request outcomes
//!
//! Each phase owns one occupancy gauge and one duration histogram. The
//! naming table here is what dashboards and alerts key on, so names must
//! not drift.

use strum::{AsRefStr, EnumCount, EnumIter};

/// Metric namespace shared by every family.
pub const NAMESPACE: &str = "query";
/// Metric subsystem shared by every family.
pub const SUBSYSTEM: &str = "control";

/// Growth factor between consecutive bucket boundaries.
pub const BUCKET_FACTOR: f64 = 5.0;
/// Number of finite bucket boundaries per histogram.
pub const BUCKET_COUNT: usize = 7;

/// Extra label of the compiling families.
pub const COMPILER_TYPE_LABEL: &str = "compiler_type";
/// Extra label of the request outcome counter.
pub const RESULT_LABEL: &str = "result";
/// Extra label of the function usage counter.
pub const FUNCTION_LABEL: &str = "function";

/// Lifecycle phase of a query.
///
/// `All` spans admission through completion and is open for the whole
/// lifetime of a query, overlapping every other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    All,
    Compiling,
    Queueing,
    Requeueing,
    Planning,
    Executing,
}

impl Phase {
    /// Name of the occupancy gauge, without namespace and subsystem.
    pub fn active_name(self) -> &'static str {
        match self {
            Phase::All => "all_active",
            Phase::Compiling => "compiling_active",
            Phase::Queueing => "queueing_active",
            Phase::Requeueing => "requeueing_active",
            Phase::Planning => "planning_active",
            Phase::Executing => "executing_active",
        }
    }

    pub fn active_help(self) -> &'static str {
        match self {
            Phase::All => "Number of queries in all states",
            Phase::Compiling => "Number of queries actively compiling",
            Phase::Queueing => "Number of queries actively queueing",
            Phase::Requeueing => "Number of queries actively requeueing",
            Phase::Planning => "Number of queries actively planning",
            Phase::Executing => "Number of queries actively executing",
        }
    }

    /// Name of the duration histogram, without namespace and subsystem.
    pub fn duration_name(self) -> &'static str {
        match self {
            Phase::All => "all_duration_seconds",
            Phase::Compiling => "compiling_duration_seconds",
            Phase::Queueing => "queueing_duration_seconds",
            Phase::Requeueing => "requeueing_duration_seconds",
            Phase::Planning => "planning_duration_seconds",
            Phase::Executing => "executing_duration_seconds",
        }
    }

    pub fn duration_help(self) -> &'static str {
        match self {
            Phase::All => "Histogram of total times spent in all query states",
            Phase::Compiling => "Histogram of times spent compiling queries",
            Phase::Queueing => "Histogram of times spent queueing queries",
            Phase::Requeueing => "Histogram of times spent requeueing queries",
            Phase::Planning => "Histogram of times spent planning queries",
            Phase::Executing => "Histogram of times spent executing queries",
        }
    }

    /// Phase-specific label appended to the base labels, if any.
    pub fn extra_label(self) -> Option<&'static str> {
        match self {
            Phase::Compiling => Some(COMPILER_TYPE_LABEL),
            _ => None,
        }
    }

    /// First bucket boundary in seconds.
    ///
    /// Planning is three orders of magnitude faster than the other phases
    /// and gets its own starting point.
    pub fn bucket_start(self) -> f64 {
        match self {
            Phase::Planning => 1e-5,
            _ => 1e-3,
        }
    }
}

/// Known terminal outcomes of a query request.
///
/// The request counter accepts any string; these are the values the
/// controller itself produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RequestResult {
    Success,
    CompileError,
    QueueError,
}
