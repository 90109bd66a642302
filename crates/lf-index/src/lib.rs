#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

use indexmap::IndexSet;
use lf_types::{Cell, CellKind, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Label {
    Int(i64),
    Text(String),
    Date(Timestamp),
}

impl Label {
    /// Ordering between labels of the same family; `None` across families.
    #[must_use]
    pub fn family_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Label {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Timestamp> for Label {
    fn from(value: Timestamp) -> Self {
        Self::Date(value)
    }
}

impl From<Label> for Cell {
    fn from(label: Label) -> Self {
        match label {
            Label::Int(v) => Cell::Number(v as f64),
            Label::Text(v) => Cell::Text(v),
            Label::Date(v) => Cell::Date(v),
        }
    }
}

impl TryFrom<&Cell> for Label {
    type Error = IndexError;

    fn try_from(cell: &Cell) -> Result<Self, Self::Error> {
        match cell {
            // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
            Cell::Number(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Ok(Self::Int(*v as i64))
            }
            Cell::Text(v) => Ok(Self::Text(v.clone())),
            Cell::Date(v) => Ok(Self::Date(*v)),
            other => Err(IndexError::NotALabel { kind: other.kind() }),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("label {label} not found")]
    Key { label: Label },
    #[error("position {position} out of range for length {len}")]
    Range { position: i64, len: usize },
    #[error("relabeling produced duplicate label {label}")]
    DuplicateLabel { label: Label },
    #[error("length mismatch: expected {expected}, received {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("{kind:?} value cannot be used as a label")]
    NotALabel { kind: CellKind },
    #[error("alignment vectors must have equal lengths")]
    InvalidAlignmentVectors,
}

/// Resolve a possibly negative position against `len`.
pub fn normalize_position(position: i64, len: usize) -> Result<usize, IndexError> {
    let out_of_range = || IndexError::Range { position, len };
    let len_i128 = i128::try_from(len).map_err(|_| out_of_range())?;
    let position_i128 = i128::from(position);
    let normalized = if position_i128 < 0 {
        len_i128 + position_i128
    } else {
        position_i128
    };
    if normalized < 0 || normalized >= len_i128 {
        return Err(out_of_range());
    }
    usize::try_from(normalized).map_err(|_| out_of_range())
}

/// Resolve a slice bound: negatives count from the end, magnitude may equal
/// `len` but not exceed it.
fn normalize_bound(position: i64, len: usize) -> Result<usize, IndexError> {
    let magnitude = usize::try_from(position.unsigned_abs()).unwrap_or(usize::MAX);
    if magnitude > len {
        return Err(IndexError::Range { position, len });
    }
    Ok(if position < 0 { len - magnitude } else { magnitude })
}

/// Capability shared by every structure addressed through a label index.
pub trait Labeled {
    fn label_index(&self) -> &Index;

    fn has_label(&self, label: &Label) -> bool {
        self.label_index().has(label)
    }
}

/// Ordered collection of unique labels with an optional name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    labels: IndexSet<Label>,
    name: Option<Label>,
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.labels.iter().eq(other.labels.iter())
    }
}

impl Labeled for Index {
    fn label_index(&self) -> &Index {
        self
    }
}

/// Capability of anything holding an ordered run of items addressable by
/// position: labels of an `Index`, cells of a vector, rows of a table.
pub trait Sequence {
    type Item;

    fn item_count(&self) -> usize;

    fn item_at(&self, position: usize) -> Option<&Self::Item>;

    fn items(&self) -> impl Iterator<Item = &Self::Item> {
        (0..self.item_count()).filter_map(move |pos| self.item_at(pos))
    }
}

impl Sequence for Index {
    type Item = Label;

    fn item_count(&self) -> usize {
        self.labels.len()
    }

    fn item_at(&self, position: usize) -> Option<&Label> {
        self.labels.get_index(position)
    }
}

impl FromIterator<Label> for Index {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl Index {
    /// Build an index, keeping the first occurrence of repeated labels.
    #[must_use]
    pub fn new(labels: impl IntoIterator<Item = Label>) -> Self {
        Self {
            labels: labels.into_iter().collect(),
            name: None,
        }
    }

    /// Default positional labels `0..len`.
    #[must_use]
    pub fn range(len: usize) -> Self {
        Self::new((0..len).map(Label::from))
    }

    #[must_use]
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self::new(values.into_iter().map(Label::from))
    }

    #[must_use]
    pub fn from_text(values: &[&str]) -> Self {
        Self::new(values.iter().map(|v| Label::from(*v)))
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<Label>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&Label> {
        self.name.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Label> + '_ {
        self.labels.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Label> {
        self.labels.iter().cloned().collect()
    }

    #[must_use]
    pub fn has(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    #[must_use]
    pub fn position(&self, label: &Label) -> Option<usize> {
        self.labels.get_index_of(label)
    }

    pub fn loc(&self, label: &Label) -> Result<usize, IndexError> {
        self.position(label).ok_or_else(|| IndexError::Key {
            label: label.clone(),
        })
    }

    #[must_use]
    pub fn label_at(&self, position: usize) -> Option<&Label> {
        self.labels.get_index(position)
    }

    pub fn at(&self, position: i64) -> Result<&Label, IndexError> {
        let pos = normalize_position(position, self.len())?;
        self.labels
            .get_index(pos)
            .ok_or(IndexError::Range {
                position,
                len: self.len(),
            })
    }

    /// Resolve positions (negatives from the end), dropping repeats so the
    /// result can back a unique index.
    pub fn resolve_positions(&self, positions: &[i64]) -> Result<Vec<usize>, IndexError> {
        let mut seen = IndexSet::with_capacity(positions.len());
        for &position in positions {
            seen.insert(normalize_position(position, self.len())?);
        }
        Ok(seen.into_iter().collect())
    }

    pub fn iloc(&self, positions: &[i64]) -> Result<Self, IndexError> {
        let resolved = self.resolve_positions(positions)?;
        Ok(self.take(&resolved))
    }

    /// Labels at the given in-range positions, keeping this index's name.
    #[must_use]
    pub fn take(&self, positions: &[usize]) -> Self {
        Self {
            labels: positions
                .iter()
                .filter_map(|&pos| self.labels.get_index(pos).cloned())
                .collect(),
            name: self.name.clone(),
        }
    }

    /// Positional range for `islice`; `None` bounds are open.
    pub fn islice_bounds(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
    ) -> Result<Range<usize>, IndexError> {
        let len = self.len();
        let start = start.map_or(Ok(0), |s| normalize_bound(s, len))?;
        let stop = stop.map_or(Ok(len), |s| normalize_bound(s, len))?;
        Ok(start..stop.max(start))
    }

    pub fn islice(&self, start: Option<i64>, stop: Option<i64>) -> Result<Self, IndexError> {
        let bounds = self.islice_bounds(start, stop)?;
        Ok(self.take(&bounds.collect::<Vec<_>>()))
    }

    /// Positional range for a label-bounded slice, inclusive of both bounds.
    ///
    /// A bound that is not stored resolves through `asof`: the start moves to
    /// the label after its floor, the stop to its floor.
    #[must_use]
    pub fn slice_bounds(&self, start: Option<&Label>, stop: Option<&Label>) -> Range<usize> {
        let begin = match start {
            None => 0,
            Some(label) => match self.position(label) {
                Some(pos) => pos,
                None => self.asof_position(label).map_or(0, |pos| pos + 1),
            },
        };
        let end = match stop {
            None => self.len(),
            Some(label) => match self.position(label) {
                Some(pos) => pos + 1,
                None => self.asof_position(label).map_or(0, |pos| pos + 1),
            },
        };
        begin..end.max(begin)
    }

    #[must_use]
    pub fn slice(&self, start: Option<&Label>, stop: Option<&Label>) -> Self {
        let bounds = self.slice_bounds(start, stop);
        self.take(&bounds.collect::<Vec<_>>())
    }

    /// Position of the greatest stored label that is `<= label` within the
    /// same label family.
    #[must_use]
    pub fn asof_position(&self, label: &Label) -> Option<usize> {
        let mut best: Option<(usize, &Label)> = None;
        for (pos, candidate) in self.labels.iter().enumerate() {
            if !matches!(
                candidate.family_cmp(label),
                Some(Ordering::Less | Ordering::Equal)
            ) {
                continue;
            }
            let better = best.is_none_or(|(_, current)| {
                matches!(candidate.family_cmp(current), Some(Ordering::Greater))
            });
            if better {
                best = Some((pos, candidate));
            }
        }
        best.map(|(pos, _)| pos)
    }

    pub fn asof(&self, label: &Label) -> Result<&Label, IndexError> {
        self.asof_position(label)
            .and_then(|pos| self.labels.get_index(pos))
            .ok_or_else(|| IndexError::Key {
                label: label.clone(),
            })
    }

    /// Labels of the first index in order, then the unseen labels of each
    /// following index. The first index's name is kept.
    #[must_use]
    pub fn union(indexes: &[&Self]) -> Self {
        let Some((head, tail)) = indexes.split_first() else {
            return Self::default();
        };
        let mut out = (*head).clone();
        for index in tail {
            out.labels.extend(index.labels.iter().cloned());
        }
        out
    }

    #[must_use]
    pub fn union_with(&self, other: &Self) -> Self {
        Self::union(&[self, other])
    }

    /// Relabel every position, rejecting results that collide.
    pub fn map<F>(&self, mut func: F) -> Result<Self, IndexError>
    where
        F: FnMut(&Label) -> Label,
    {
        let mut labels = IndexSet::with_capacity(self.len());
        for label in &self.labels {
            let mapped = func(label);
            if labels.contains(&mapped) {
                return Err(IndexError::DuplicateLabel { label: mapped });
            }
            labels.insert(mapped);
        }
        Ok(Self {
            labels,
            name: self.name.clone(),
        })
    }

    pub fn mask(&self, keep: &[bool]) -> Result<Self, IndexError> {
        if keep.len() != self.len() {
            return Err(IndexError::SizeMismatch {
                expected: self.len(),
                actual: keep.len(),
            });
        }
        let positions: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(pos, &k)| k.then_some(pos))
            .collect();
        Ok(self.take(&positions))
    }

    #[must_use]
    pub fn get_indexer(&self, target: &Self) -> Vec<Option<usize>> {
        target.labels.iter().map(|label| self.position(label)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPlan {
    pub union_index: Index,
    pub left_positions: Vec<Option<usize>>,
    pub right_positions: Vec<Option<usize>>,
}

/// Outer alignment: the union of both label sets (left order first), with the
/// position each union label has on either side.
#[must_use]
pub fn align_union(left: &Index, right: &Index) -> AlignmentPlan {
    let union_index = left.union_with(right);
    let left_positions = left.get_indexer(&union_index);
    let right_positions = right.get_indexer(&union_index);
    AlignmentPlan {
        union_index,
        left_positions,
        right_positions,
    }
}

pub fn validate_alignment_plan(plan: &AlignmentPlan) -> Result<(), IndexError> {
    if plan.left_positions.len() != plan.right_positions.len()
        || plan.left_positions.len() != plan.union_index.len()
    {
        return Err(IndexError::InvalidAlignmentVectors);
    }
    Ok(())
}
