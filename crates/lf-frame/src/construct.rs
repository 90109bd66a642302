//! Construction dispatcher.
//!
//! Every accepted input shape is named by a [`TableInput`] variant and routed
//! to one factory; the factories all produce the canonical
//! `{values, index, columns}` triple.

use lf_index::{Index, Label};
use lf_types::Cell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{FrameError, Table, Vector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TableInput {
    Table(Table),
    Vector(Vector),
    Index(Index),
    /// Rows of cells; every row must have the same length.
    Matrix(Vec<Vec<Cell>>),
    Vectors(Vec<Vector>),
    List(Vec<Cell>),
    Empty,
    Scalar(Cell),
}

impl TableInput {
    fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Vector(_) => "vector",
            Self::Index(_) => "index",
            Self::Matrix(_) => "matrix",
            Self::Vectors(_) => "vectors",
            Self::List(_) => "list",
            Self::Empty => "empty",
            Self::Scalar(_) => "scalar",
        }
    }
}

impl From<Table> for TableInput {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<Vector> for TableInput {
    fn from(vector: Vector) -> Self {
        Self::Vector(vector)
    }
}

impl From<Index> for TableInput {
    fn from(index: Index) -> Self {
        Self::Index(index)
    }
}

impl From<Vec<Vec<Cell>>> for TableInput {
    fn from(rows: Vec<Vec<Cell>>) -> Self {
        Self::Matrix(rows)
    }
}

impl From<Vec<Vector>> for TableInput {
    fn from(vectors: Vec<Vector>) -> Self {
        Self::Vectors(vectors)
    }
}

impl From<Vec<Cell>> for TableInput {
    fn from(cells: Vec<Cell>) -> Self {
        Self::List(cells)
    }
}

impl From<Cell> for TableInput {
    fn from(cell: Cell) -> Self {
        Self::Scalar(cell)
    }
}

/// Explicit axis labels. For `Empty` and `Scalar` inputs they define the
/// shape; for every other input they replace the derived labels.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub index: Option<Index>,
    pub columns: Option<Index>,
}

impl TableOptions {
    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Index) -> Self {
        self.columns = Some(columns);
        self
    }
}

fn default_column(name: Option<Label>) -> Index {
    Index::new([name.unwrap_or(Label::Int(0))])
}

impl Table {
    pub fn new(input: TableInput, options: TableOptions) -> Result<Self, FrameError> {
        let kind = input.kind();
        let mut table = match input {
            TableInput::Table(table) => Self::from_table(table),
            TableInput::Vector(vector) => Self::from_vector(vector),
            TableInput::Index(index) => Self::from_index(index),
            TableInput::Matrix(rows) => Self::from_matrix(rows)?,
            TableInput::Vectors(vectors) => Self::from_vectors(vectors)?,
            TableInput::List(cells) => Self::from_list(cells),
            TableInput::Empty => return Ok(Self::empty(options.index, options.columns)),
            TableInput::Scalar(cell) => return Self::from_scalar(cell, options),
        };
        if let Some(index) = options.index {
            table.set_index(index)?;
        }
        if let Some(columns) = options.columns {
            table.set_columns(columns)?;
        }
        let (rows, cols) = table.shape();
        debug!(input = kind, rows, cols, "constructed table");
        Ok(table)
    }

    #[must_use]
    pub fn from_table(table: Table) -> Self {
        table
    }

    /// Single column labelled by the vector's name (or `0`).
    #[must_use]
    pub fn from_vector(vector: Vector) -> Self {
        let (name, index, values) = vector.into_parts();
        let values = values.into_iter().map(|cell| vec![cell]).collect();
        Self::assemble(values, index, default_column(name))
    }

    /// Single column holding the labels themselves, rows labelled by the index.
    #[must_use]
    pub fn from_index(index: Index) -> Self {
        let values = index.iter().map(|label| vec![Cell::from(label.clone())]).collect();
        let columns = default_column(index.name().cloned());
        Self::assemble(values, index, columns)
    }

    pub fn from_matrix(rows: Vec<Vec<Cell>>) -> Result<Self, FrameError> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some((pos, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(FrameError::Construction(format!(
                "matrix row {pos} has {} cells, expected {width}",
                row.len()
            )));
        }
        let index = Index::range(rows.len());
        Ok(Self::assemble(rows, index, Index::range(width)))
    }

    /// One row per vector, labelled by its name or its position. Columns are
    /// the union of the vectors' labels; absent labels read as `Missing`.
    pub fn from_vectors(vectors: Vec<Vector>) -> Result<Self, FrameError> {
        let row_labels: Vec<Label> = vectors
            .iter()
            .enumerate()
            .map(|(pos, vector)| vector.name().cloned().unwrap_or_else(|| Label::from(pos)))
            .collect();
        let index = Index::new(row_labels.iter().cloned());
        if index.len() != row_labels.len() {
            let duplicate = row_labels
                .iter()
                .enumerate()
                .find(|&(pos, label)| row_labels[..pos].contains(label))
                .map(|(_, label)| label.to_string())
                .unwrap_or_default();
            return Err(FrameError::Construction(format!(
                "row label {duplicate} appears more than once"
            )));
        }
        let indexes: Vec<&Index> = vectors.iter().map(Vector::index).collect();
        let columns = Index::union(&indexes);
        let values = vectors
            .iter()
            .map(|vector| {
                columns
                    .iter()
                    .map(|label| vector.get(label).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Self::assemble(values, index, columns))
    }

    #[must_use]
    pub fn from_list(cells: Vec<Cell>) -> Self {
        if cells.is_empty() {
            return Self::empty(None, None);
        }
        let index = Index::range(cells.len());
        let values = cells.into_iter().map(|cell| vec![cell]).collect();
        Self::assemble(values, index, Index::range(1))
    }

    /// All-`Missing` table of the given shape; an absent axis has length zero.
    #[must_use]
    pub fn empty(index: Option<Index>, columns: Option<Index>) -> Self {
        let index = index.unwrap_or_default();
        let columns = columns.unwrap_or_default();
        let values = vec![vec![Cell::Missing; columns.len()]; index.len()];
        Self::assemble(values, index, columns)
    }

    /// Broadcast one cell over an explicit shape. NA scalars fill with `Missing`.
    pub fn from_scalar(cell: Cell, options: TableOptions) -> Result<Self, FrameError> {
        let (Some(index), Some(columns)) = (options.index, options.columns) else {
            return Err(FrameError::Construction(
                "scalar input requires both index and columns".to_owned(),
            ));
        };
        let fill = if cell.is_na() { Cell::Missing } else { cell };
        let values = vec![vec![fill; columns.len()]; index.len()];
        Ok(Self::assemble(values, index, columns))
    }
}

#[cfg(test)]
mod tests {
    use lf_index::{Index, Label};
    use lf_types::Cell;

    use super::{TableInput, TableOptions};
    use crate::{ErrorKind, Table, Vector, VectorOptions};

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    #[test]
    fn matrix_gets_positional_labels() {
        let t = Table::new(
            vec![vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]].into(),
            TableOptions::default(),
        )
        .expect("rectangular");
        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.index(), &Index::range(2));
        assert_eq!(t.columns(), &Index::range(2));
    }

    #[test]
    fn ragged_matrix_is_construction_error() {
        let err = Table::new(
            vec![vec![n(1.0), n(2.0)], vec![n(3.0)]].into(),
            TableOptions::default(),
        )
        .expect_err("ragged");
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert_eq!(
            Table::from_matrix(Vec::new()).expect("empty").shape(),
            (0, 0)
        );
    }

    #[test]
    fn vector_becomes_named_column() {
        let v = Vector::new(
            vec![n(1.0), n(2.0)],
            VectorOptions {
                index: Some(Index::from_text(&["a", "b"])),
                name: Some("price".into()),
            },
        )
        .expect("vector");
        let t = Table::new(v.into(), TableOptions::default()).expect("table");
        assert_eq!(t.index(), &Index::from_text(&["a", "b"]));
        assert_eq!(t.columns(), &Index::from_text(&["price"]));

        let unnamed = Table::from_vector(Vector::from_values([1.0]));
        assert_eq!(unnamed.columns(), &Index::range(1));
    }

    #[test]
    fn index_input_stores_labels_as_cells() {
        let index = Index::from_i64(vec![10, 20]).with_name("key");
        let t = Table::new(index.clone().into(), TableOptions::default()).expect("table");
        assert_eq!(t.index(), &index);
        assert_eq!(t.columns(), &Index::from_text(&["key"]));
        assert_eq!(t.cells()[1], vec![n(20.0)]);
    }

    #[test]
    fn vectors_union_their_labels() {
        let a = Vector::new(
            vec![n(1.0), n(2.0)],
            VectorOptions {
                index: Some(Index::from_text(&["p", "q"])),
                name: Some("first".into()),
            },
        )
        .expect("vector");
        let b = Vector::new(
            vec![n(3.0)],
            VectorOptions {
                index: Some(Index::from_text(&["r"])),
                name: None,
            },
        )
        .expect("vector");
        let t = Table::new(vec![a, b].into(), TableOptions::default()).expect("table");
        assert_eq!(
            t.index(),
            &Index::new(vec![Label::from("first"), Label::Int(1)])
        );
        assert_eq!(t.columns(), &Index::from_text(&["p", "q", "r"]));
        assert_eq!(t.cells()[0], vec![n(1.0), n(2.0), Cell::Missing]);
        assert_eq!(t.cells()[1], vec![Cell::Missing, Cell::Missing, n(3.0)]);
    }

    #[test]
    fn colliding_vector_names_fail() {
        let a = Vector::from_values([1.0]).with_name("dup");
        let b = Vector::from_values([2.0]).with_name("dup");
        let err = Table::from_vectors(vec![a, b]).expect_err("collision");
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(err.to_string().contains("dup"));
    }

    #[test]
    fn list_is_single_column() {
        let t = Table::new(vec![n(1.0), n(2.0), n(3.0)].into(), TableOptions::default())
            .expect("table");
        assert_eq!(t.shape(), (3, 1));
        assert_eq!(Table::from_list(Vec::new()).shape(), (0, 0));
    }

    #[test]
    fn empty_input_takes_shape_from_options() {
        let both = Table::new(
            TableInput::Empty,
            TableOptions::default()
                .with_index(Index::range(2))
                .with_columns(Index::from_text(&["a", "b", "c"])),
        )
        .expect("table");
        assert_eq!(both.shape(), (2, 3));
        assert!(both.cells().iter().flatten().all(Cell::is_na));

        let rows_only = Table::new(
            TableInput::Empty,
            TableOptions::default().with_index(Index::range(4)),
        )
        .expect("table");
        assert_eq!(rows_only.shape(), (4, 0));

        let cols_only = Table::new(
            TableInput::Empty,
            TableOptions::default().with_columns(Index::range(2)),
        )
        .expect("table");
        assert_eq!(cols_only.shape(), (0, 2));
        assert_eq!(
            Table::new(TableInput::Empty, TableOptions::default())
                .expect("table")
                .shape(),
            (0, 0)
        );
    }

    #[test]
    fn scalar_broadcasts_and_requires_both_axes() {
        let options = TableOptions::default()
            .with_index(Index::range(2))
            .with_columns(Index::range(2));
        let t = Table::new(Cell::from("x").into(), options.clone()).expect("table");
        assert!(t.cells().iter().flatten().all(|c| c == &Cell::from("x")));

        let na = Table::new(Cell::Number(f64::INFINITY).into(), options).expect("table");
        assert!(na.cells().iter().flatten().all(|c| c == &Cell::Missing));

        let err = Table::new(
            Cell::Number(1.0).into(),
            TableOptions::default().with_index(Index::range(1)),
        )
        .expect_err("missing columns");
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn overrides_replace_labels_and_check_length() {
        let rows = vec![vec![n(1.0)], vec![n(2.0)]];
        let t = Table::new(
            rows.clone().into(),
            TableOptions::default().with_index(Index::from_text(&["a", "b"])),
        )
        .expect("table");
        assert_eq!(t.index(), &Index::from_text(&["a", "b"]));

        let err = Table::new(
            rows.into(),
            TableOptions::default().with_columns(Index::range(3)),
        )
        .expect_err("wrong width");
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }

    #[test]
    fn options_deserialize_from_json() {
        let options: TableOptions = serde_json::from_str(
            r#"{"index": {"labels": [{"kind": "text", "value": "a"}], "name": null}}"#,
        )
        .expect("options");
        assert_eq!(options.index, Some(Index::from_text(&["a"])));
        assert_eq!(options.columns, None);
    }
}
