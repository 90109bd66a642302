#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod nanops;

pub use nanops::{
    cummin, first, idxmin, nanall, nanany, nancount, nanmax, nanmdd, nanmean, nanmin, nanstd,
    nansum, nanvar,
};

pub type Timestamp = DateTime<Utc>;

/// Value family of a cell, used for error reporting and comparator dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Missing,
    Bool,
    Number,
    Text,
    Date,
}

/// A single table slot.
///
/// `Missing` is the explicit "not available" marker. A `Number` holding a
/// non-finite float is classified as NA as well, but arithmetic never produces
/// a NaN float: it produces `Missing` instead (see [`Cell::number`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(Timestamp),
}

impl Cell {
    /// Wrap a float, collapsing NaN into `Missing`.
    #[must_use]
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Self::Missing
        } else {
            Self::Number(value)
        }
    }

    #[must_use]
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Missing => CellKind::Missing,
            Self::Bool(_) => CellKind::Bool,
            Self::Number(_) => CellKind::Number,
            Self::Text(_) => CellKind::Text,
            Self::Date(_) => CellKind::Date,
        }
    }

    /// Present but non-numeric: everything except finite numbers and booleans.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        !self.is_numeric()
    }

    /// Structurally absent: the `Missing` marker or a non-finite number.
    #[must_use]
    pub fn is_na(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(v) => !v.is_finite(),
            Self::Bool(_) | Self::Text(_) | Self::Date(_) => false,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Number(v) => v.is_finite(),
            Self::Bool(_) => true,
            Self::Missing | Self::Text(_) | Self::Date(_) => false,
        }
    }

    /// Numeric value of a numeric cell; booleans count as 0/1.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(*v),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Bool(v) => *v,
            Self::Number(v) => *v != 0.0 && !v.is_nan(),
            Self::Text(v) => !v.is_empty(),
            Self::Date(_) => true,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Timestamp> for Cell {
    fn from(value: Timestamp) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "NaN"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("comparison not supported between {left:?} and {right:?} values")]
    Incomparable { left: CellKind, right: CellKind },
}

/// Where NA cells land in a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaPosition {
    First,
    #[default]
    Last,
}

/// Default ordering between two cells.
///
/// Numeric cells (booleans included) compare numerically, text compares
/// lexicographically and dates chronologically. NA cells sort according to
/// `na`. Mixing numeric and text values, or any other cross-family pair,
/// is a `TypeError`.
pub fn default_sort(left: &Cell, right: &Cell, na: NaPosition) -> Result<Ordering, TypeError> {
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal));
    }
    match (left, right) {
        (Cell::Text(a), Cell::Text(b)) => return Ok(a.cmp(b)),
        (Cell::Date(a), Cell::Date(b)) => return Ok(a.cmp(b)),
        _ => {}
    }

    let incomparable = || TypeError::Incomparable {
        left: left.kind(),
        right: right.kind(),
    };
    if (left.is_numeric() && matches!(right, Cell::Text(_)))
        || (matches!(left, Cell::Text(_)) && right.is_numeric())
    {
        return Err(incomparable());
    }

    let na_order = match na {
        NaPosition::Last => Ordering::Greater,
        NaPosition::First => Ordering::Less,
    };
    match (left.is_na(), right.is_na()) {
        (true, true) => Ok(Ordering::Equal),
        (true, false) => Ok(na_order),
        (false, true) => Ok(na_order.reverse()),
        (false, false) => Err(incomparable()),
    }
}
