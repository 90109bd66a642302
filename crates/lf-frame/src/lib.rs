#![forbid(unsafe_code)]

//! Two-dimensional labeled tables.
//!
//! A [`Table`] is a row-major grid of [`Cell`]s addressed through two
//! [`Index`]es. Binary operations align operands by outer-joining their label
//! sets ([`Table::combine`]); statistics are written once per row and reach the
//! other axis through transposition ([`Table::reduce`]).

use std::fmt;

use lf_index::IndexError;
use lf_types::TypeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod combine;
mod construct;
mod reduce;
mod table;
mod vector;

pub use combine::{BinaryOp, CombineOptions, Operand};
pub use construct::{TableInput, TableOptions};
pub use lf_index::{Index, Label, Labeled, Sequence};
pub use lf_types::{Cell, CellKind, NaPosition, Timestamp};
pub use reduce::{ReduceOptions, RowView, StatOptions, Statistic};
pub use table::{
    DropHow, DropOptions, Fill, LabelKey, PositionKey, ReindexOptions, RenameBy, Rows, Selection,
    Table,
};
pub use vector::{Vector, VectorOptions};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("cannot construct table: {0}")]
    Construction(String),
    #[error("length mismatch: expected {expected}, received {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Construction,
    Key,
    Range,
    SizeMismatch,
    Type,
    DuplicateLabel,
}

impl FrameError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Construction(_) => ErrorKind::Construction,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Self::Type(_) => ErrorKind::Type,
            Self::Index(err) => match err {
                IndexError::Key { .. } => ErrorKind::Key,
                IndexError::Range { .. } => ErrorKind::Range,
                IndexError::DuplicateLabel { .. } => ErrorKind::DuplicateLabel,
                IndexError::SizeMismatch { .. } | IndexError::InvalidAlignmentVectors => {
                    ErrorKind::SizeMismatch
                }
                IndexError::NotALabel { .. } => ErrorKind::Type,
            },
        }
    }
}

/// Axis selector. `Rows` (0) runs down each column, `Columns` (1) across each
/// row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "AxisRepr")]
pub enum Axis {
    #[default]
    Rows,
    Columns,
}

impl Axis {
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Rows => 0,
            Self::Columns => 1,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AxisRepr {
    Number(u8),
    Name(String),
}

impl TryFrom<AxisRepr> for Axis {
    type Error = String;

    fn try_from(repr: AxisRepr) -> Result<Self, Self::Error> {
        match repr {
            AxisRepr::Number(0) => Ok(Self::Rows),
            AxisRepr::Number(1) => Ok(Self::Columns),
            AxisRepr::Name(name) => match name.as_str() {
                "rows" | "index" => Ok(Self::Rows),
                "columns" => Ok(Self::Columns),
                other => Err(format!("unknown axis {other:?}")),
            },
            AxisRepr::Number(other) => Err(format!("axis must be 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
