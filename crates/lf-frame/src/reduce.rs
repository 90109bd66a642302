//! Axis-reduction engine.
//!
//! Reductions are defined once, over the rows of a table (`axis = Columns`).
//! The other axis is reached by transposing first, so every statistic behaves
//! identically in both directions.

use lf_types::{Cell, nanops};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Axis, Table, Vector};

/// What a reducer sees of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowView<'a> {
    Raw(&'a [Cell]),
    /// The row as a vector named by its label and indexed by the columns.
    Labeled(Vector),
}

impl RowView<'_> {
    #[must_use]
    pub fn values(&self) -> &[Cell] {
        match self {
            Self::Raw(values) => values,
            Self::Labeled(vector) => vector.values(),
        }
    }

    #[must_use]
    pub fn vector(&self) -> Option<&Vector> {
        match self {
            Self::Raw(_) => None,
            Self::Labeled(vector) => Some(vector),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReduceOptions {
    pub axis: Axis,
    /// Hand the reducer bare cell slices instead of labelled row vectors.
    pub raw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatOptions {
    pub axis: Axis,
    /// Skip non-numeric cells. Unset means the statistic's own default, see
    /// [`Statistic::default_skipnan`].
    pub skipnan: Option<bool>,
    /// Delta degrees of freedom for `var` and `std`.
    pub ddof: usize,
}

impl Default for StatOptions {
    fn default() -> Self {
        Self {
            axis: Axis::Rows,
            skipnan: None,
            ddof: 1,
        }
    }
}

impl StatOptions {
    #[must_use]
    pub fn along(axis: Axis) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Sum,
    Count,
    Var,
    Std,
    All,
    Any,
    Mdd,
    First,
    Idxmin,
}

impl Statistic {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Var => "var",
            Self::Std => "std",
            Self::All => "all",
            Self::Any => "any",
            Self::Mdd => "mdd",
            Self::First => "first",
            Self::Idxmin => "idxmin",
        }
    }

    /// `first` looks at cells of any type unless told otherwise; every other
    /// statistic skips non-numeric cells.
    #[must_use]
    pub fn default_skipnan(self) -> bool {
        !matches!(self, Self::First)
    }

    fn needs_labels(self) -> bool {
        matches!(self, Self::Idxmin)
    }

    /// Evaluate over one row. `Idxmin` answers with the label of the smallest
    /// cell, so it needs a labelled view.
    #[must_use]
    pub fn evaluate(self, row: &RowView<'_>, options: &StatOptions) -> Cell {
        let values = row.values();
        let skipnan = options.skipnan.unwrap_or(self.default_skipnan());
        match self {
            Self::Min => nanops::nanmin(values, skipnan),
            Self::Max => nanops::nanmax(values, skipnan),
            Self::Mean => nanops::nanmean(values, skipnan),
            Self::Sum => nanops::nansum(values, skipnan),
            Self::Count => nanops::nancount(values, skipnan),
            Self::Var => nanops::nanvar(values, skipnan, options.ddof),
            Self::Std => nanops::nanstd(values, skipnan, options.ddof),
            Self::All => nanops::nanall(values, skipnan),
            Self::Any => nanops::nanany(values, skipnan),
            Self::Mdd => nanops::nanmdd(values, skipnan),
            Self::First => nanops::first(values, skipnan),
            Self::Idxmin => nanops::idxmin(values)
                .and_then(|pos| row.vector()?.index().label_at(pos))
                .map_or(Cell::Missing, |label| Cell::from(label.clone())),
        }
    }
}

impl Table {
    /// Apply `func` once per row (`axis = Columns`) or once per column
    /// (`axis = Rows`, through [`Table::transpose`]).
    ///
    /// The result is indexed by the labels of the axis that was not reduced.
    pub fn reduce<F>(&self, func: F, options: ReduceOptions) -> Vector
    where
        F: Fn(RowView<'_>) -> Cell,
    {
        if options.axis == Axis::Rows {
            let across = ReduceOptions {
                axis: Axis::Columns,
                ..options
            };
            return self.transpose().reduce(func, across);
        }
        let values = if options.raw {
            self.cells()
                .iter()
                .map(|row| func(RowView::Raw(row)))
                .collect()
        } else {
            self.iterrows()
                .map(|row| func(RowView::Labeled(row)))
                .collect()
        };
        Vector::assemble(None, self.index().clone(), values)
    }

    pub fn statistic(&self, stat: Statistic, options: StatOptions) -> Vector {
        let reduce = ReduceOptions {
            axis: options.axis,
            raw: !stat.needs_labels(),
        };
        let out = self.reduce(|row| stat.evaluate(&row, &options), reduce);
        debug!(
            stat = stat.name(),
            axis = options.axis.number(),
            len = out.len(),
            "reduced table"
        );
        out.with_name(stat.name())
    }

    pub fn min(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Min, options)
    }

    pub fn max(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Max, options)
    }

    pub fn mean(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Mean, options)
    }

    pub fn sum(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Sum, options)
    }

    /// Numeric cells per row/column, or all cells when `skipnan` is off.
    pub fn count(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Count, options)
    }

    pub fn var(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Var, options)
    }

    pub fn std(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Std, options)
    }

    pub fn all(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::All, options)
    }

    pub fn any(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Any, options)
    }

    /// Maximum drawdown.
    pub fn mdd(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Mdd, options)
    }

    pub fn first(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::First, options)
    }

    /// Label of the smallest numeric cell; `Missing` when there is none.
    pub fn idxmin(&self, options: StatOptions) -> Vector {
        self.statistic(Statistic::Idxmin, options)
    }

    /// Running minimum down each column (`Rows`) or across each row
    /// (`Columns`).
    #[must_use]
    pub fn cummin(&self, axis: Axis) -> Self {
        if axis == Axis::Rows {
            return self.transpose().cummin(Axis::Columns).transpose();
        }
        let values = self.cells().iter().map(|row| nanops::cummin(row)).collect();
        Self::assemble(values, self.index().clone(), self.columns().clone())
    }
}

#[cfg(test)]
mod tests {
    use lf_index::{Index, Label};
    use lf_types::Cell;

    use super::{ReduceOptions, RowView, StatOptions, Statistic};
    use crate::{Axis, Table};

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn square() -> Table {
        Table::from_parts(
            vec![vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]],
            Index::from_text(&["r0", "r1"]),
            Index::from_text(&["c0", "c1"]),
        )
        .expect("rectangular")
    }

    #[test]
    fn sum_along_both_axes() {
        let t = square();
        let across = t.sum(StatOptions::along(Axis::Columns));
        assert_eq!(across.values(), &[n(3.0), n(7.0)]);
        assert_eq!(across.index(), t.index());
        assert_eq!(across.name(), Some(&Label::from("sum")));

        let down = t.sum(StatOptions::default());
        assert_eq!(down.values(), &[n(4.0), n(6.0)]);
        assert_eq!(down.index(), t.columns());
    }

    #[test]
    fn every_statistic_is_symmetric_under_transpose() {
        let t = Table::from_parts(
            vec![
                vec![n(1.0), Cell::Missing, n(5.0)],
                vec![n(-2.0), n(8.0), Cell::from("x")],
            ],
            Index::range(2),
            Index::from_text(&["a", "b", "c"]),
        )
        .expect("table");
        for stat in [
            Statistic::Min,
            Statistic::Max,
            Statistic::Mean,
            Statistic::Sum,
            Statistic::Count,
            Statistic::Var,
            Statistic::Std,
            Statistic::All,
            Statistic::Any,
            Statistic::Mdd,
            Statistic::First,
            Statistic::Idxmin,
        ] {
            let down = t.statistic(stat, StatOptions::default());
            let across = t
                .transpose()
                .statistic(stat, StatOptions::along(Axis::Columns));
            assert_eq!(down, across, "{stat:?}");
        }
    }

    #[test]
    fn skipnan_off_poisons_numeric_statistics() {
        let t = Table::from_parts(
            vec![vec![n(1.0), Cell::Missing]],
            Index::range(1),
            Index::range(2),
        )
        .expect("table");
        let strict = StatOptions {
            axis: Axis::Columns,
            skipnan: Some(false),
            ddof: 1,
        };
        assert_eq!(t.mean(strict).values(), &[Cell::Missing]);
        assert_eq!(t.count(strict).values(), &[n(2.0)]);
        assert_eq!(
            t.mean(StatOptions::along(Axis::Columns)).values(),
            &[n(1.0)]
        );
    }

    #[test]
    fn var_and_std_honor_ddof() {
        let t = Table::from_parts(
            vec![vec![n(2.0)], vec![n(4.0)]],
            Index::range(2),
            Index::range(1),
        )
        .expect("table");
        assert_eq!(t.var(StatOptions::default()).values(), &[n(2.0)]);
        let population = StatOptions {
            ddof: 0,
            ..StatOptions::default()
        };
        assert_eq!(t.var(population).values(), &[n(1.0)]);
        assert_eq!(t.std(population).values(), &[n(1.0)]);
    }

    #[test]
    fn idxmin_reports_labels() {
        let t = square();
        let down = t.idxmin(StatOptions::default());
        assert_eq!(down.values(), &[Cell::from("r0"), Cell::from("r0")]);
        let across = t.idxmin(StatOptions::along(Axis::Columns));
        assert_eq!(across.values(), &[Cell::from("c0"), Cell::from("c0")]);

        let text = Table::from_parts(vec![vec![Cell::from("a")]], Index::range(1), Index::range(1))
            .expect("table");
        assert_eq!(
            text.idxmin(StatOptions::default()).values(),
            &[Cell::Missing]
        );
    }

    #[test]
    fn first_mdd_all_any() {
        let t = Table::from_parts(
            vec![
                vec![Cell::Missing],
                vec![n(100.0)],
                vec![n(80.0)],
                vec![n(0.0)],
            ],
            Index::range(4),
            Index::from_text(&["v"]),
        )
        .expect("table");
        assert_eq!(t.first(StatOptions::default()).values(), &[n(100.0)]);
        let skipping = StatOptions {
            skipnan: Some(true),
            ..StatOptions::default()
        };
        assert_eq!(t.first(skipping).values(), &[n(100.0)]);
        assert_eq!(t.mdd(StatOptions::default()).values(), &[n(1.0)]);
        assert_eq!(t.all(StatOptions::default()).values(), &[Cell::Bool(false)]);
        assert_eq!(t.any(StatOptions::default()).values(), &[Cell::Bool(true)]);
        assert_eq!(t.min(StatOptions::default()).values(), &[n(0.0)]);
        assert_eq!(t.max(StatOptions::default()).values(), &[n(100.0)]);
    }

    #[test]
    fn first_defaults_to_any_present_cell() {
        let mixed = Table::from_parts(
            vec![vec![Cell::Missing], vec![Cell::from("test")], vec![n(1.0)]],
            Index::range(3),
            Index::from_text(&["v"]),
        )
        .expect("table");
        assert_eq!(
            mixed.first(StatOptions::default()).values(),
            &[Cell::from("test")]
        );
        let skipping = StatOptions {
            skipnan: Some(true),
            ..StatOptions::default()
        };
        assert_eq!(mixed.first(skipping).values(), &[n(1.0)]);

        let names = Table::from_parts(
            vec![vec![Cell::from("David"), Cell::from("Bob")]],
            Index::range(1),
            Index::range(2),
        )
        .expect("table");
        assert_eq!(
            names.first(StatOptions::along(Axis::Columns)).values(),
            &[Cell::from("David")]
        );
        let skipping_across = StatOptions {
            axis: Axis::Columns,
            ..skipping
        };
        assert_eq!(names.first(skipping_across).values(), &[Cell::Missing]);
    }

    #[test]
    fn custom_reducer_sees_raw_or_labeled_rows() {
        let t = square();
        let widths = t.reduce(
            |row| Cell::Number(row.values().len() as f64),
            ReduceOptions {
                axis: Axis::Columns,
                raw: true,
            },
        );
        assert_eq!(widths.values(), &[n(2.0), n(2.0)]);
        assert_eq!(widths.name(), None);

        let names = t.reduce(
            |row| match row {
                RowView::Labeled(vector) => vector
                    .name()
                    .cloned()
                    .map_or(Cell::Missing, Cell::from),
                RowView::Raw(_) => Cell::Missing,
            },
            ReduceOptions::default(),
        );
        assert_eq!(names.values(), &[Cell::from("c0"), Cell::from("c1")]);
        assert_eq!(names.index(), t.columns());
    }

    #[test]
    fn cummin_runs_along_axis() {
        let t = Table::from_parts(
            vec![vec![n(3.0), n(1.0)], vec![n(2.0), n(5.0)]],
            Index::range(2),
            Index::range(2),
        )
        .expect("table");
        let down = t.cummin(Axis::Rows);
        assert_eq!(down.cells(), &[vec![n(3.0), n(1.0)], vec![n(2.0), n(1.0)]]);
        let across = t.cummin(Axis::Columns);
        assert_eq!(across.cells(), &[vec![n(3.0), n(1.0)], vec![n(2.0), n(2.0)]]);
    }

    #[test]
    fn stat_options_default_and_deserialize() {
        let defaults = StatOptions::default();
        assert_eq!(defaults.skipnan, None);
        assert_eq!(defaults.ddof, 1);
        let parsed: StatOptions =
            serde_json::from_str(r#"{"axis": 1, "ddof": 0}"#).expect("options");
        assert_eq!(parsed.axis, Axis::Columns);
        assert_eq!(parsed.skipnan, None);
        assert_eq!(parsed.ddof, 0);
        let explicit: StatOptions =
            serde_json::from_str(r#"{"skipnan": false}"#).expect("options");
        assert_eq!(explicit.skipnan, Some(false));
    }
}
