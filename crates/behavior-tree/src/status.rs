//! Status returned by behavior nodes.

use crate::{Error, Result};

/// The result of evaluating a behavior node.
///
/// A node that has never been ticked is vacuously successful, so the default
/// value is `Success`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    /// The behavior completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action executed without errors.
    #[default]
    Success,

    /// The behavior has not finished yet and must be ticked again on the
    /// next control-loop iteration.
    Running,

    /// The behavior failed.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be executed.
    Failure,
}

impl Status {
    /// Parses a status from its snake_case name.
    pub fn parse(value: &str) -> Result<Self> {
        value
            .parse()
            .map_err(|_| Error::IncorrectStatusValue(value.to_owned()))
    }

    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    /// Inverts the status: Success becomes Failure and vice versa.
    ///
    /// `Running` has no opposite and is returned unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Running => Status::Running,
            Status::Failure => Status::Success,
        }
    }
}

/// A status change: `prev` differs from `curr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub prev: Status,
    pub curr: Status,
}

impl Transition {
    /// The node just left the running state.
    #[inline]
    pub fn finished_running(self) -> bool {
        self.prev.is_running()
    }

    /// The node just entered the running state.
    #[inline]
    pub fn started_running(self) -> bool {
        self.curr.is_running()
    }
}

/// The status cell owned by a single node.
///
/// Setting the value it already holds is a no-op, which is why [`set`]
/// reports a [`Transition`] only when something changed. The owning node
/// turns those transitions into hook calls.
///
/// [`set`]: NodeStatus::set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStatus {
    value: Status,
}

impl NodeStatus {
    pub const fn new(value: Status) -> Self {
        Self { value }
    }

    #[inline]
    pub const fn get(&self) -> Status {
        self.value
    }

    /// Stores `value`, returning the transition if it differs from the
    /// current one.
    pub fn set(&mut self, value: Status) -> Option<Transition> {
        if value == self.value {
            return None;
        }

        let prev = std::mem::replace(&mut self.value, value);
        Some(Transition { prev, curr: value })
    }
}

impl PartialEq<Status> for NodeStatus {
    fn eq(&self, other: &Status) -> bool {
        self.value == *other
    }
}

impl From<Status> for NodeStatus {
    fn from(value: Status) -> Self {
        Self::new(value)
    }
}
