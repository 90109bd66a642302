//! Alignment and combine engine.
//!
//! [`Table::combine`] is the only binary primitive. Label-carrying operands
//! (tables, vectors) are outer-joined on their labels; bare sequences are
//! matched by position and must have the right length.

use std::cmp::Ordering;

use lf_index::{AlignmentPlan, Index, align_union, validate_alignment_plan};
use lf_types::Cell;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{Axis, FrameError, Table, Vector};

/// Element-wise operators. Arithmetic yields `Missing` when either input is
/// non-numeric; comparisons and logical operators look at raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Pow,
    Modulo,
    Equals,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
}

fn arithmetic(left: &Cell, right: &Cell, func: impl Fn(f64, f64) -> f64) -> Cell {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Cell::number(func(a, b)),
        _ => Cell::Missing,
    }
}

/// Division-like operators: a zero divisor yields `Missing`.
fn checked(left: &Cell, right: &Cell, func: impl Fn(f64, f64) -> f64) -> Cell {
    if right.as_f64() == Some(0.0) {
        return Cell::Missing;
    }
    arithmetic(left, right, func)
}

fn raw_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) => Some(*v),
        Cell::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        Cell::Missing | Cell::Text(_) | Cell::Date(_) => None,
    }
}

/// Raw ordering used by comparison operators. `None` means unordered.
fn raw_cmp(left: &Cell, right: &Cell) -> Option<Ordering> {
    match (left, right) {
        (Cell::Missing, _) | (_, Cell::Missing) => None,
        (Cell::Text(a), Cell::Text(b)) => Some(a.cmp(b)),
        (Cell::Date(a), Cell::Date(b)) => Some(a.cmp(b)),
        _ => raw_number(left)?.partial_cmp(&raw_number(right)?),
    }
}

impl BinaryOp {
    #[must_use]
    pub fn apply(self, left: &Cell, right: &Cell) -> Cell {
        let ordering = || raw_cmp(left, right);
        match self {
            Self::Add => arithmetic(left, right, |a, b| a + b),
            Self::Subtract => arithmetic(left, right, |a, b| a - b),
            Self::Multiply => arithmetic(left, right, |a, b| a * b),
            Self::Divide => checked(left, right, |a, b| a / b),
            Self::Pow => arithmetic(left, right, f64::powf),
            Self::Modulo => checked(left, right, |a, b| a % b),
            Self::Equals => Cell::Bool(ordering() == Some(Ordering::Equal)),
            Self::Ne => Cell::Bool(ordering() != Some(Ordering::Equal)),
            Self::Gt => Cell::Bool(ordering() == Some(Ordering::Greater)),
            Self::Gte => Cell::Bool(matches!(
                ordering(),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            Self::Lt => Cell::Bool(ordering() == Some(Ordering::Less)),
            Self::Lte => Cell::Bool(matches!(
                ordering(),
                Some(Ordering::Less | Ordering::Equal)
            )),
            Self::And => Cell::Bool(left.is_truthy() && right.is_truthy()),
            Self::Or => Cell::Bool(left.is_truthy() || right.is_truthy()),
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Pow => "**",
            Self::Modulo => "%",
            Self::Equals => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::And => "&",
            Self::Or => "|",
        }
    }
}

/// Right-hand side of a binary operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    Scalar(Cell),
    Table(&'a Table),
    Vector(&'a Vector),
    /// One cell per row, or per column with `axis = Columns`.
    Array(&'a [Cell]),
    /// Grid with exactly the same shape as the left table.
    Matrix(&'a [Vec<Cell>]),
}

impl From<Cell> for Operand<'_> {
    fn from(cell: Cell) -> Self {
        Self::Scalar(cell)
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Self::Scalar(Cell::number(value))
    }
}

impl From<i64> for Operand<'_> {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for Operand<'_> {
    fn from(value: bool) -> Self {
        Self::Scalar(Cell::Bool(value))
    }
}

impl<'a> From<&'a Table> for Operand<'a> {
    fn from(table: &'a Table) -> Self {
        Self::Table(table)
    }
}

impl<'a> From<&'a Vector> for Operand<'a> {
    fn from(vector: &'a Vector) -> Self {
        Self::Vector(vector)
    }
}

impl<'a> From<&'a [Cell]> for Operand<'a> {
    fn from(cells: &'a [Cell]) -> Self {
        Self::Array(cells)
    }
}

impl<'a> From<&'a Vec<Cell>> for Operand<'a> {
    fn from(cells: &'a Vec<Cell>) -> Self {
        Self::Array(cells)
    }
}

impl<'a> From<&'a [Vec<Cell>]> for Operand<'a> {
    fn from(rows: &'a [Vec<Cell>]) -> Self {
        Self::Matrix(rows)
    }
}

impl<'a> From<&'a Vec<Vec<Cell>>> for Operand<'a> {
    fn from(rows: &'a Vec<Vec<Cell>>) -> Self {
        Self::Matrix(rows)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CombineOptions {
    /// Broadcast direction for arrays and vectors.
    pub axis: Axis,
    /// Match label-carrying operands by position instead of by label.
    pub ignore_axis: bool,
}

impl CombineOptions {
    #[must_use]
    pub fn along(axis: Axis) -> Self {
        Self {
            axis,
            ignore_axis: false,
        }
    }

    #[must_use]
    pub fn positional(mut self) -> Self {
        self.ignore_axis = true;
        self
    }
}

fn expect_len(expected: usize, actual: usize) -> Result<(), FrameError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FrameError::SizeMismatch { expected, actual })
    }
}

fn outer_plan(left: &Index, right: &Index) -> Result<AlignmentPlan, FrameError> {
    let plan = align_union(left, right);
    validate_alignment_plan(&plan)?;
    Ok(plan)
}

impl Table {
    /// Combine every cell with the matching cell of `other` through `op`.
    ///
    /// The result is always a new table; shape errors are reported before any
    /// cell is computed.
    pub fn combine<'a, F>(
        &self,
        other: impl Into<Operand<'a>>,
        op: F,
        options: CombineOptions,
    ) -> Result<Self, FrameError>
    where
        F: Fn(&Cell, &Cell) -> Cell,
    {
        match other.into() {
            Operand::Scalar(scalar) => Ok(self.map(|cell| op(cell, &scalar))),
            Operand::Table(table) if options.ignore_axis => {
                self.combine_positional(table.cells(), &op)
            }
            Operand::Table(table) => self.combine_aligned(table, &op),
            Operand::Matrix(rows) => self.combine_positional(rows, &op),
            Operand::Array(cells) => self.combine_broadcast(cells, options.axis, &op),
            Operand::Vector(vector) if options.ignore_axis => {
                self.combine_broadcast(vector.values(), options.axis, &op)
            }
            Operand::Vector(vector) => match options.axis {
                Axis::Rows => self.combine_vector_rows(vector, &op),
                Axis::Columns => Ok(self
                    .transpose()
                    .combine_vector_rows(vector, &op)?
                    .transpose()),
            },
        }
    }

    fn combine_positional<F>(&self, rows: &[Vec<Cell>], op: &F) -> Result<Self, FrameError>
    where
        F: Fn(&Cell, &Cell) -> Cell,
    {
        let (n_rows, n_cols) = self.shape();
        expect_len(n_rows, rows.len())?;
        for row in rows {
            expect_len(n_cols, row.len())?;
        }
        trace!(rows = n_rows, cols = n_cols, "positional combine");
        let values = self
            .cells()
            .iter()
            .zip(rows)
            .map(|(left, right)| left.iter().zip(right).map(|(l, r)| op(l, r)).collect())
            .collect();
        Ok(Self::assemble(
            values,
            self.index().clone(),
            self.columns().clone(),
        ))
    }

    fn combine_broadcast<F>(&self, cells: &[Cell], axis: Axis, op: &F) -> Result<Self, FrameError>
    where
        F: Fn(&Cell, &Cell) -> Cell,
    {
        let (n_rows, n_cols) = self.shape();
        let expected = match axis {
            Axis::Rows => n_rows,
            Axis::Columns => n_cols,
        };
        expect_len(expected, cells.len())?;
        let values = self
            .cells()
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, cell)| match axis {
                        Axis::Rows => op(cell, &cells[r]),
                        Axis::Columns => op(cell, &cells[c]),
                    })
                    .collect()
            })
            .collect();
        Ok(Self::assemble(
            values,
            self.index().clone(),
            self.columns().clone(),
        ))
    }

    /// Outer join on the rows: a row present on both sides is combined with
    /// the vector's cell for that label, every other row is all `Missing`.
    fn combine_vector_rows<F>(&self, vector: &Vector, op: &F) -> Result<Self, FrameError>
    where
        F: Fn(&Cell, &Cell) -> Cell,
    {
        let plan = outer_plan(self.index(), vector.index())?;
        let width = self.columns().len();
        let values = plan
            .left_positions
            .iter()
            .zip(&plan.right_positions)
            .map(|pair| match pair {
                (Some(l), Some(r)) => {
                    let rhs = &vector.values()[*r];
                    self.cells()[*l].iter().map(|cell| op(cell, rhs)).collect()
                }
                _ => vec![Cell::Missing; width],
            })
            .collect();
        debug!(
            rows = plan.union_index.len(),
            cols = width,
            "aligned table with vector"
        );
        Ok(Self::assemble(
            values,
            plan.union_index,
            self.columns().clone(),
        ))
    }

    /// Outer join over both axes. A cell is computed only when both sides
    /// carry its row and column label.
    fn combine_aligned<F>(&self, other: &Self, op: &F) -> Result<Self, FrameError>
    where
        F: Fn(&Cell, &Cell) -> Cell,
    {
        let rows = outer_plan(self.index(), other.index())?;
        let cols = outer_plan(self.columns(), other.columns())?;
        let values = rows
            .left_positions
            .iter()
            .zip(&rows.right_positions)
            .map(|(lr, rr)| {
                cols.left_positions
                    .iter()
                    .zip(&cols.right_positions)
                    .map(|(lc, rc)| match (lr, rr, lc, rc) {
                        (Some(lr), Some(rr), Some(lc), Some(rc)) => {
                            op(&self.cells()[*lr][*lc], &other.cells()[*rr][*rc])
                        }
                        _ => Cell::Missing,
                    })
                    .collect()
            })
            .collect();
        debug!(
            rows = rows.union_index.len(),
            cols = cols.union_index.len(),
            "aligned tables by outer join"
        );
        Ok(Self::assemble(values, rows.union_index, cols.union_index))
    }

    /// [`Table::combine`] with one of the built-in operators.
    pub fn binary<'a>(
        &self,
        other: impl Into<Operand<'a>>,
        op: BinaryOp,
        options: CombineOptions,
    ) -> Result<Self, FrameError> {
        trace!(op = op.symbol(), "binary operation");
        self.combine(other, |l, r| op.apply(l, r), options)
    }
}

macro_rules! binary_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        impl Table {
            $(
                pub fn $name<'a>(
                    &self,
                    other: impl Into<Operand<'a>>,
                    options: CombineOptions,
                ) -> Result<Self, FrameError> {
                    self.binary(other, BinaryOp::$op, options)
                }
            )*
        }
    };
}

binary_methods! {
    add => Add,
    subtract => Subtract,
    multiply => Multiply,
    divide => Divide,
    pow => Pow,
    modulo => Modulo,
    equals => Equals,
    ne => Ne,
    gt => Gt,
    gte => Gte,
    lt => Lt,
    lte => Lte,
    and => And,
    or => Or,
}
