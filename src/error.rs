use crate::execution::ExecutionMethod;
use crate::model::EntityKind;
use std::result::Result as StdResult;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] tokio_postgres::Error),

    #[error("running as [{actual}] but only {allowed:?} are allowed")]
    ExecutionMethod {
        actual: ExecutionMethod,
        allowed: Vec<ExecutionMethod>,
    },

    #[error("{kind} not found: [{name}]")]
    NotFound { kind: EntityKind, name: String },

    #[error("unable to update document type [{name}]: {detail}")]
    Persistence { name: String, detail: String },

    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Errors that stop a run before any document type is touched.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, Error::ExecutionMethod { .. } | Error::NotFound { .. })
    }
}

pub type Result<T> = StdResult<T, Error>;
