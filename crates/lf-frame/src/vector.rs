use std::cmp::Ordering;

use lf_index::{Index, Label, Labeled, Sequence};
use lf_types::{Cell, NaPosition, default_sort};
use serde::{Deserialize, Serialize};

use crate::construct::TableOptions;
use crate::{FrameError, Table};

/// One-dimensional labeled sequence of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VectorRepr")]
pub struct Vector {
    name: Option<Label>,
    index: Index,
    values: Vec<Cell>,
}

#[derive(Deserialize)]
struct VectorRepr {
    name: Option<Label>,
    index: Index,
    values: Vec<Cell>,
}

impl TryFrom<VectorRepr> for Vector {
    type Error = FrameError;

    fn try_from(repr: VectorRepr) -> Result<Self, Self::Error> {
        Self::new(
            repr.values,
            VectorOptions {
                index: Some(repr.index),
                name: repr.name,
            },
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VectorOptions {
    pub index: Option<Index>,
    pub name: Option<Label>,
}

impl Labeled for Vector {
    fn label_index(&self) -> &Index {
        &self.index
    }
}

impl Sequence for Vector {
    type Item = Cell;

    fn item_count(&self) -> usize {
        self.values.len()
    }

    fn item_at(&self, position: usize) -> Option<&Cell> {
        self.values.get(position)
    }
}

impl Vector {
    /// Build a vector; without an explicit index the labels are `0..len`.
    pub fn new(values: Vec<Cell>, options: VectorOptions) -> Result<Self, FrameError> {
        let index = options.index.unwrap_or_else(|| Index::range(values.len()));
        if index.len() != values.len() {
            return Err(FrameError::SizeMismatch {
                expected: index.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            name: options.name,
            index,
            values,
        })
    }

    pub fn from_values(values: impl IntoIterator<Item = impl Into<Cell>>) -> Self {
        let values: Vec<Cell> = values.into_iter().map(Into::into).collect();
        Self {
            name: None,
            index: Index::range(values.len()),
            values,
        }
    }

    /// Caller guarantees `index.len() == values.len()`.
    pub(crate) fn assemble(name: Option<Label>, index: Index, values: Vec<Cell>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Self {
            name,
            index,
            values,
        }
    }

    pub(crate) fn into_parts(self) -> (Option<Label>, Index, Vec<Cell>) {
        (self.name, self.index, self.values)
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
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn has(&self, label: &Label) -> bool {
        self.index.has(label)
    }

    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&Cell> {
        self.index.position(label).map(|pos| &self.values[pos])
    }

    pub fn loc(&self, label: &Label) -> Result<&Cell, FrameError> {
        let pos = self.index.loc(label)?;
        Ok(&self.values[pos])
    }

    pub fn iloc(&self, position: i64) -> Result<&Cell, FrameError> {
        let pos = lf_index::normalize_position(position, self.len())?;
        Ok(&self.values[pos])
    }

    /// Sort values with [`default_sort`], carrying labels along.
    pub fn sort_values(&self, na: NaPosition) -> Result<Self, FrameError> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        let mut failure = None;
        order.sort_by(|&a, &b| {
            default_sort(&self.values[a], &self.values[b], na).unwrap_or_else(|err| {
                failure.get_or_insert(err);
                Ordering::Equal
            })
        });
        if let Some(err) = failure {
            return Err(err.into());
        }
        Ok(Self {
            name: self.name.clone(),
            index: self.index.take(&order),
            values: order.iter().map(|&pos| self.values[pos].clone()).collect(),
        })
    }

    /// Single-column table labelled by this vector's name (or `0`).
    pub fn to_table(&self) -> Result<Table, FrameError> {
        Table::new(self.clone().into(), TableOptions::default())
    }
}
