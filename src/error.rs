use std::path::PathBuf;

use crate::graph::{AttrKind, DataType};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("program file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("program JSON could not be parsed: {source}")]
    Parse {
        #[from]
        source: JsonError,
    },
    #[error("operator `{op_type}` is registered more than once")]
    DuplicateOperator { op_type: String },
    #[error("operator `{op_type}` is not registered. Registered: {registered:?}")]
    UnknownOperator {
        op_type: String,
        registered: Vec<String>,
    },
    #[error("operator `{op_type}` has no gradient op maker")]
    NoGradientMaker { op_type: String },
    #[error("operator `{op_type}` requires input `{slot}`")]
    MissingInput { op_type: String, slot: String },
    #[error("operator `{op_type}` requires output `{slot}`")]
    MissingOutput { op_type: String, slot: String },
    #[error("operator `{op_type}` does not declare slot `{slot}`")]
    UnknownSlot { op_type: String, slot: String },
    #[error("operator `{op_type}` requires attribute `{attr}`")]
    MissingAttribute { op_type: String, attr: String },
    #[error("attribute `{attr}` of `{op_type}` expects {expected:?}, got {actual:?}")]
    AttributeTypeMismatch {
        op_type: String,
        attr: String,
        expected: AttrKind,
        actual: AttrKind,
    },
    #[error("variable `{var}` referenced by `{op_type}` is not declared")]
    UnknownVariable { op_type: String, var: String },
    #[error("operator `{op_type}` does not support data type {data_type:?}")]
    UnsupportedDataType {
        op_type: String,
        data_type: DataType,
    },
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("shape inference failed: {reason}")]
    ShapeInferenceFailed { reason: String },
    #[error("program could not be exported to {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OpError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OpError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OpError::ExportIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        OpError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        OpError::ShapeInferenceFailed {
            reason: reason.into(),
        }
    }
}
