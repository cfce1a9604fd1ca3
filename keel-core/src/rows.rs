use crate::{DataError, Decode, JoinedDist, Registry, Result, Value, decode_joined};
use std::{collections::VecDeque, sync::Arc};

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

/// Complete result of a query as returned by a connection.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub labels: RowNames,
    pub rows: Vec<Row>,
}

/// Buffered result rows, decoded on demand.
#[derive(Debug)]
pub struct Rows {
    labels: RowNames,
    rows: VecDeque<Row>,
    registry: Arc<Registry>,
}

impl Rows {
    pub fn new(set: RowSet, registry: Arc<Registry>) -> Self {
        Self {
            labels: set.labels,
            rows: set.rows.into(),
            registry,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.labels
    }

    /// Rows not consumed yet.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn next_row(&mut self) -> Option<RowLabeled> {
        self.rows
            .pop_front()
            .map(|values| RowLabeled::new(self.labels.clone(), values))
    }

    /// Decode the next row, `None` when exhausted.
    pub fn scan<T: Decode>(&mut self) -> Result<Option<T>> {
        self.next_row()
            .map(|row| T::decode(row, &self.registry))
            .transpose()
    }

    /// Decode the next row into the parts of `dist`, false when exhausted.
    pub fn scan_joined<D: JoinedDist + ?Sized>(&mut self, dist: &mut D) -> Result<bool> {
        let Some(row) = self.next_row() else {
            return Ok(false);
        };
        decode_joined(dist, row, &self.registry)?;
        Ok(true)
    }

    /// The first row, `NoRows` when the result is empty.
    pub fn fetch_one<T: Decode>(mut self) -> Result<T> {
        self.scan()?.ok_or_else(|| DataError::NoRows.into())
    }

    /// Append every row to `out`. A value `Vec` must have been allocated with some capacity.
    pub fn fetch_many<T: Decode>(mut self, out: &mut Vec<T>) -> Result<()> {
        if !T::INDIRECT && out.capacity() == 0 {
            return Err(DataError::EmptySlice.into());
        }
        out.reserve(self.len());
        while let Some(value) = self.scan()? {
            out.push(value);
        }
        Ok(())
    }

    pub fn fetch_one_joined<D: JoinedDist + ?Sized>(mut self, dist: &mut D) -> Result<()> {
        if self.scan_joined(dist)? {
            Ok(())
        } else {
            Err(DataError::NoRows.into())
        }
    }

    /// Append one default `D` per row, each filled through its parts.
    pub fn fetch_many_joined<D: JoinedDist + Default>(mut self, out: &mut Vec<D>) -> Result<()> {
        if !D::INDIRECT && out.capacity() == 0 {
            return Err(DataError::EmptySlice.into());
        }
        out.reserve(self.len());
        while let Some(row) = self.next_row() {
            let mut value = D::default();
            decode_joined(&mut value, row, &self.registry)?;
            out.push(value);
        }
        Ok(())
    }
}
