use std::collections::HashMap;
use std::fmt;

use lf_index::{Index, IndexError, Label, Labeled, Sequence, normalize_position};
use lf_types::Cell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Axis, FrameError, Vector};

/// Row-major grid of cells addressed by a row index and a column index.
///
/// `values.len() == index.len()` and every row holds `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRepr")]
pub struct Table {
    values: Vec<Vec<Cell>>,
    index: Index,
    columns: Index,
}

#[derive(Deserialize)]
struct TableRepr {
    values: Vec<Vec<Cell>>,
    index: Index,
    columns: Index,
}

impl TryFrom<TableRepr> for Table {
    type Error = FrameError;

    fn try_from(repr: TableRepr) -> Result<Self, Self::Error> {
        Self::from_parts(repr.values, repr.index, repr.columns)
    }
}

impl Labeled for Table {
    fn label_index(&self) -> &Index {
        &self.index
    }
}

/// A table is a sequence of its rows.
impl Sequence for Table {
    type Item = Vec<Cell>;

    fn item_count(&self) -> usize {
        self.values.len()
    }

    fn item_at(&self, position: usize) -> Option<&Vec<Cell>> {
        self.values.get(position)
    }
}

/// Label selector along one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelKey {
    One(Label),
    Many(Vec<Label>),
    All,
}

impl From<Label> for LabelKey {
    fn from(label: Label) -> Self {
        Self::One(label)
    }
}

impl From<&str> for LabelKey {
    fn from(label: &str) -> Self {
        Self::One(label.into())
    }
}

impl From<i64> for LabelKey {
    fn from(label: i64) -> Self {
        Self::One(label.into())
    }
}

impl From<Vec<Label>> for LabelKey {
    fn from(labels: Vec<Label>) -> Self {
        Self::Many(labels)
    }
}

/// Positional selector along one axis; negatives count from the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionKey {
    One(i64),
    Many(Vec<i64>),
    All,
}

impl From<i64> for PositionKey {
    fn from(position: i64) -> Self {
        Self::One(position)
    }
}

impl From<Vec<i64>> for PositionKey {
    fn from(positions: Vec<i64>) -> Self {
        Self::Many(positions)
    }
}

/// Result of `loc`/`iloc`, shaped by how many keys were scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Cell(Cell),
    Vector(Vector),
    Table(Table),
}

impl Selection {
    #[must_use]
    pub fn into_cell(self) -> Option<Cell> {
        match self {
            Self::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_vector(self) -> Option<Vector> {
        match self {
            Self::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_table(self) -> Option<Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }
}

/// How `rename` derives the new labels of an axis.
pub enum RenameBy {
    /// Replacement labels, one per position.
    Positional(Vec<Label>),
    Derived(Box<dyn Fn(&Label) -> Label>),
    /// Labels absent from the map are kept.
    Lookup(HashMap<Label, Label>),
}

impl RenameBy {
    pub fn derived(func: impl Fn(&Label) -> Label + 'static) -> Self {
        Self::Derived(Box::new(func))
    }
}

impl fmt::Debug for RenameBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(labels) => f.debug_tuple("Positional").field(labels).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
            Self::Lookup(map) => f.debug_tuple("Lookup").field(map).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// Take the row (or column) of the greatest existing label below the new one.
    #[serde(alias = "ffill")]
    Forward,
    Value(Cell),
}

impl Default for Fill {
    fn default() -> Self {
        Self::Value(Cell::Missing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReindexOptions {
    pub axis: Axis,
    pub fill: Fill,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropHow {
    #[default]
    Any,
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DropOptions {
    pub how: DropHow,
    pub axis: Axis,
}

fn check_len(expected: usize, actual: usize) -> Result<(), FrameError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FrameError::SizeMismatch { expected, actual })
    }
}

/// Positions of the selected labels plus whether the key was scalar.
fn resolve_labels(index: &Index, key: &LabelKey) -> Result<(Vec<usize>, bool), FrameError> {
    match key {
        LabelKey::One(label) => Ok((vec![index.loc(label)?], true)),
        LabelKey::Many(labels) => {
            let mut positions = Vec::with_capacity(labels.len());
            for label in labels {
                let pos = index.loc(label)?;
                if !positions.contains(&pos) {
                    positions.push(pos);
                }
            }
            Ok((positions, false))
        }
        LabelKey::All => Ok(((0..index.len()).collect(), false)),
    }
}

fn resolve_positions(index: &Index, key: &PositionKey) -> Result<(Vec<usize>, bool), FrameError> {
    match key {
        PositionKey::One(position) => {
            Ok((vec![normalize_position(*position, index.len())?], true))
        }
        PositionKey::Many(positions) => Ok((index.resolve_positions(positions)?, false)),
        PositionKey::All => Ok(((0..index.len()).collect(), false)),
    }
}

impl Table {
    /// Validated constructor from the canonical triple.
    pub fn from_parts(
        values: Vec<Vec<Cell>>,
        index: Index,
        columns: Index,
    ) -> Result<Self, FrameError> {
        check_len(index.len(), values.len())?;
        for row in &values {
            check_len(columns.len(), row.len())?;
        }
        Ok(Self {
            values,
            index,
            columns,
        })
    }

    /// Caller guarantees the shape invariant.
    pub(crate) fn assemble(values: Vec<Vec<Cell>>, index: Index, columns: Index) -> Self {
        debug_assert_eq!(values.len(), index.len());
        debug_assert!(values.iter().all(|row| row.len() == columns.len()));
        Self {
            values,
            index,
            columns,
        }
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn columns(&self) -> &Index {
        &self.columns
    }

    /// Owned copy of the grid.
    #[must_use]
    pub fn values(&self) -> Vec<Vec<Cell>> {
        self.values.clone()
    }

    #[must_use]
    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.values
    }

    pub fn set_index(&mut self, index: Index) -> Result<(), FrameError> {
        check_len(self.index.len(), index.len())?;
        self.index = index;
        Ok(())
    }

    pub fn set_columns(&mut self, columns: Index) -> Result<(), FrameError> {
        check_len(self.columns.len(), columns.len())?;
        self.columns = columns;
        Ok(())
    }

    /// Sub-table at in-range row and column positions.
    pub(crate) fn take(&self, rows: &[usize], cols: &[usize]) -> Self {
        let values = rows
            .iter()
            .map(|&r| cols.iter().map(|&c| self.values[r][c].clone()).collect())
            .collect();
        Self::assemble(values, self.index.take(rows), self.columns.take(cols))
    }

    fn take_axis(&self, positions: &[usize], axis: Axis) -> Self {
        let all_rows: Vec<usize> = (0..self.index.len()).collect();
        let all_cols: Vec<usize> = (0..self.columns.len()).collect();
        match axis {
            Axis::Rows => self.take(positions, &all_cols),
            Axis::Columns => self.take(&all_rows, positions),
        }
    }

    fn axis_index(&self, axis: Axis) -> &Index {
        match axis {
            Axis::Rows => &self.index,
            Axis::Columns => &self.columns,
        }
    }

    /// Row at an in-range position, named by its label, indexed by the columns.
    pub(crate) fn row_at(&self, pos: usize) -> Vector {
        Vector::assemble(
            self.index.label_at(pos).cloned(),
            self.columns.clone(),
            self.values[pos].clone(),
        )
    }

    pub(crate) fn column_at(&self, pos: usize) -> Vector {
        Vector::assemble(
            self.columns.label_at(pos).cloned(),
            self.index.clone(),
            self.values.iter().map(|row| row[pos].clone()).collect(),
        )
    }

    fn select(&self, rows: (Vec<usize>, bool), cols: (Vec<usize>, bool)) -> Selection {
        let ((rows, row_scalar), (cols, col_scalar)) = (rows, cols);
        match (row_scalar, col_scalar) {
            (true, true) => Selection::Cell(self.values[rows[0]][cols[0]].clone()),
            (true, false) => Selection::Vector(Vector::assemble(
                self.index.label_at(rows[0]).cloned(),
                self.columns.take(&cols),
                cols.iter().map(|&c| self.values[rows[0]][c].clone()).collect(),
            )),
            (false, true) => Selection::Vector(Vector::assemble(
                self.columns.label_at(cols[0]).cloned(),
                self.index.take(&rows),
                rows.iter().map(|&r| self.values[r][cols[0]].clone()).collect(),
            )),
            (false, false) => Selection::Table(self.take(&rows, &cols)),
        }
    }

    /// Label-based selection. Two scalar keys yield a cell, one yields a
    /// vector, none a table.
    pub fn loc(
        &self,
        rows: impl Into<LabelKey>,
        cols: impl Into<LabelKey>,
    ) -> Result<Selection, FrameError> {
        let rows = resolve_labels(&self.index, &rows.into())?;
        let cols = resolve_labels(&self.columns, &cols.into())?;
        Ok(self.select(rows, cols))
    }

    /// Position-based selection, shaped like [`Table::loc`].
    pub fn iloc(
        &self,
        rows: impl Into<PositionKey>,
        cols: impl Into<PositionKey>,
    ) -> Result<Selection, FrameError> {
        let rows = resolve_positions(&self.index, &rows.into())?;
        let cols = resolve_positions(&self.columns, &cols.into())?;
        Ok(self.select(rows, cols))
    }

    pub fn at(&self, row: &Label, col: &Label) -> Result<&Cell, FrameError> {
        let r = self.index.loc(row)?;
        let c = self.columns.loc(col)?;
        Ok(&self.values[r][c])
    }

    pub fn iat(&self, row: i64, col: i64) -> Result<&Cell, FrameError> {
        let r = normalize_position(row, self.index.len())?;
        let c = normalize_position(col, self.columns.len())?;
        Ok(&self.values[r][c])
    }

    pub fn row(&self, label: &Label) -> Result<Vector, FrameError> {
        Ok(self.row_at(self.index.loc(label)?))
    }

    pub fn column(&self, label: &Label) -> Result<Vector, FrameError> {
        Ok(self.column_at(self.columns.loc(label)?))
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let (n_rows, n_cols) = self.shape();
        let values = (0..n_cols)
            .map(|c| (0..n_rows).map(|r| self.values[r][c].clone()).collect())
            .collect();
        Self::assemble(values, self.columns.clone(), self.index.clone())
    }

    /// Relabel one axis. `Rows` renames the row index, `Columns` the columns.
    pub fn rename(&self, by: RenameBy, axis: Axis) -> Result<Self, FrameError> {
        let current = self.axis_index(axis);
        let relabeled = match by {
            RenameBy::Positional(labels) => {
                check_len(current.len(), labels.len())?;
                let mut next = Index::new(labels);
                if let Some(name) = current.name() {
                    next = next.with_name(name.clone());
                }
                next
            }
            RenameBy::Derived(func) => current.map(func)?,
            RenameBy::Lookup(map) => {
                current.map(|label| map.get(label).cloned().unwrap_or_else(|| label.clone()))?
            }
        };
        let mut out = self.clone();
        match axis {
            Axis::Rows => out.set_index(relabeled)?,
            Axis::Columns => out.set_columns(relabeled)?,
        }
        Ok(out)
    }

    /// Conform one axis to `target`. Labels already present keep their data;
    /// new labels are filled according to `options.fill`.
    #[must_use]
    pub fn reindex(&self, target: Index, options: ReindexOptions) -> Self {
        if options.axis == Axis::Columns {
            let rows = ReindexOptions {
                axis: Axis::Rows,
                fill: options.fill,
            };
            return self.transpose().reindex(target, rows).transpose();
        }
        let width = self.columns.len();
        let mut filled = 0_usize;
        let values = target
            .iter()
            .map(|label| {
                if let Some(pos) = self.index.position(label) {
                    return self.values[pos].clone();
                }
                filled += 1;
                match &options.fill {
                    Fill::Value(cell) => vec![cell.clone(); width],
                    Fill::Forward => self
                        .index
                        .asof_position(label)
                        .map_or_else(|| vec![Cell::Missing; width], |pos| self.values[pos].clone()),
                }
            })
            .collect();
        debug!(rows = target.len(), filled, "reindexed rows");
        Self::assemble(values, target, self.columns.clone())
    }

    /// Label-bounded slice, inclusive on both ends.
    #[must_use]
    pub fn slice(&self, start: Option<&Label>, stop: Option<&Label>, axis: Axis) -> Self {
        let bounds = self.axis_index(axis).slice_bounds(start, stop);
        self.take_axis(&bounds.collect::<Vec<_>>(), axis)
    }

    /// Positional half-open slice.
    pub fn islice(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        axis: Axis,
    ) -> Result<Self, FrameError> {
        let bounds = self.axis_index(axis).islice_bounds(start, stop)?;
        Ok(self.take_axis(&bounds.collect::<Vec<_>>(), axis))
    }

    /// Row (or column) at the greatest label not after `label`.
    pub fn asof(&self, label: &Label, axis: Axis) -> Result<Vector, FrameError> {
        let index = self.axis_index(axis);
        let pos = index.asof_position(label).ok_or_else(|| IndexError::Key {
            label: label.clone(),
        })?;
        Ok(match axis {
            Axis::Rows => self.row_at(pos),
            Axis::Columns => self.column_at(pos),
        })
    }

    #[must_use]
    pub fn map<F>(&self, func: F) -> Self
    where
        F: Fn(&Cell) -> Cell,
    {
        let values = self
            .values
            .iter()
            .map(|row| row.iter().map(&func).collect())
            .collect();
        Self::assemble(values, self.index.clone(), self.columns.clone())
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        self.map(|cell| cell.as_f64().map_or(Cell::Missing, |v| Cell::number(v.abs())))
    }

    #[must_use]
    pub fn neg(&self) -> Self {
        self.map(|cell| cell.as_f64().map_or(Cell::Missing, |v| Cell::number(-v)))
    }

    #[must_use]
    pub fn not(&self) -> Self {
        self.map(|cell| Cell::Bool(!cell.is_truthy()))
    }

    #[must_use]
    pub fn is_nan(&self) -> Self {
        self.map(|cell| Cell::Bool(cell.is_nan()))
    }

    #[must_use]
    pub fn is_na(&self) -> Self {
        self.map(|cell| Cell::Bool(cell.is_na()))
    }

    fn drop_where<P>(&self, options: DropOptions, missing: P) -> Self
    where
        P: Fn(&Cell) -> bool,
    {
        if options.axis == Axis::Columns {
            let rows = DropOptions {
                axis: Axis::Rows,
                ..options
            };
            return self.transpose().drop_where(rows, missing).transpose();
        }
        if self.columns.is_empty() {
            return self.clone();
        }
        let keep: Vec<usize> = self
            .values
            .iter()
            .enumerate()
            .filter(|(_, row)| match options.how {
                DropHow::Any => !row.iter().any(&missing),
                DropHow::All => !row.iter().all(&missing),
            })
            .map(|(pos, _)| pos)
            .collect();
        debug!(
            kept = keep.len(),
            dropped = self.index.len() - keep.len(),
            "dropped rows"
        );
        self.take_axis(&keep, Axis::Rows)
    }

    /// Drop rows (`Rows`) or columns (`Columns`) holding NA cells.
    #[must_use]
    pub fn dropna(&self, options: DropOptions) -> Self {
        self.drop_where(options, Cell::is_na)
    }

    /// Like [`Table::dropna`] but treats every non-numeric cell as missing.
    #[must_use]
    pub fn dropnan(&self, options: DropOptions) -> Self {
        self.drop_where(options, Cell::is_nan)
    }

    /// One vector per row, in index order.
    #[must_use]
    pub fn iterrows(&self) -> Rows<'_> {
        Rows {
            table: self,
            next: 0,
        }
    }
}

/// Iterator returned by [`Table::iterrows`].
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    table: &'a Table,
    next: usize,
}

impl Iterator for Rows<'_> {
    type Item = Vector;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.table.index.len() {
            return None;
        }
        let row = self.table.row_at(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.index.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}
