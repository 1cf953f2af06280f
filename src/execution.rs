use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How the utility was launched. Runs are gated on an allow-list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ExecutionMethod {
    Workflow,
    Intool,
    Task,
    Eform,
    Ema,
}

impl ExecutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMethod::Workflow => "WORKFLOW",
            ExecutionMethod::Intool => "INTOOL",
            ExecutionMethod::Task => "TASK",
            ExecutionMethod::Eform => "EFORM",
            ExecutionMethod::Ema => "EMA",
        }
    }
}

impl fmt::Display for ExecutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMethod {
    type Err = String;

    fn from_str(s: &str) -> StdResult<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WORKFLOW" => Ok(ExecutionMethod::Workflow),
            "INTOOL" => Ok(ExecutionMethod::Intool),
            "TASK" => Ok(ExecutionMethod::Task),
            "EFORM" => Ok(ExecutionMethod::Eform),
            "EMA" => Ok(ExecutionMethod::Ema),
            other => Err(format!("unknown execution method: {other}")),
        }
    }
}

impl TryFrom<String> for ExecutionMethod {
    type Error = String;

    fn try_from(s: String) -> StdResult<Self, Self::Error> {
        s.parse()
    }
}

type StdResult<T, E> = std::result::Result<T, E>;

pub fn check_execution(actual: ExecutionMethod, allowed: &[ExecutionMethod]) -> Result<()> {
    if allowed.contains(&actual) {
        tracing::debug!(method = %actual, "execution method allowed");
        return Ok(());
    }
    tracing::error!(method = %actual, allowed = ?allowed, "execution method mismatch");
    Err(Error::ExecutionMethod {
        actual,
        allowed: allowed.to_vec(),
    })
}
