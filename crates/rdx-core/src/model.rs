use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown split '{0}'")]
pub struct UnknownSplit(pub String);

impl FromStr for Split {
    type Err = UnknownSplit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            "test" => Ok(Split::Test),
            other => Err(UnknownSplit(other.to_string())),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which code representation a candidate arrives in.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    /// Plain Rust, compiled as-is.
    Rust,
    /// Iron, oxidized back to Rust before compiling.
    Iron,
}

impl Arm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Rust => "rust",
            Arm::Iron => "iron",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reduce,
    Oxidize,
    Compile,
    Behavior,
}

impl Stage {
    /// Coarse phase used when bucketing failures (`transform` / `compile` / `test`).
    pub fn phase(&self) -> Phase {
        match self {
            Stage::Reduce | Stage::Oxidize => Phase::Transform,
            Stage::Compile => Phase::Compile,
            Stage::Behavior => Phase::Test,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Transform,
    Compile,
    Test,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    NotAttempted,
    Pass,
    Fail,
}

impl StageStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, StageStatus::Pass)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external process could not be started.
    ToolInvocation,
    Timeout,
    TransformFailure,
    NonDeterminism,
    OxidizeFailure,
    CompileFailure,
    BehaviorFailure,
    UnsupportedFamily,
    MissingFunction,
    /// The prompt names no value the family's probe can use.
    MissingParameter,
}
