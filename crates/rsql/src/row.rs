//! [`RowHandle`]: a fetched row that remembers which view produced it,
//! so `.update()`/`.delete()` (§1.2, supplemented from the original's
//! `Row.update`/`Row.delete`) can re-enter through the owning base table
//! without the caller having to track that themselves.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::{Error, Result, Row, Value};

use crate::view::{self, View, ViewRef};

/// A row fetched from a view, carrying a back-reference sufficient to
/// `update`/`delete` it when `mirrors_id` survived the chain down from
/// the owning `BaseTable` (§1.2).
#[derive(Clone)]
pub struct RowHandle {
    row: Row,
    origin: Weak<RefCell<View>>,
}

impl RowHandle {
    pub(crate) fn new(row: Row, origin: &ViewRef) -> Self {
        Self { row, origin: Rc::downgrade(origin) }
    }

    pub fn columns(&self) -> Vec<String> {
        self.origin.upgrade().map(|v| v.borrow().columns.clone()).unwrap_or_default()
    }

    pub fn values(&self) -> &[Value] {
        self.row.values()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.row.get(index)
    }

    pub fn get_named(&self, column: &str) -> Option<&Value> {
        let view = self.origin.upgrade()?;
        let idx = view.borrow().columns.iter().position(|c| c == column)?;
        self.row.get(idx)
    }

    pub fn into_row(self) -> Row {
        self.row
    }

    /// Re-enters through the owning base table to apply `UPDATE ... SET
    /// <cols> WHERE id = <mirrored id>`. Fails with `UsageError` if this
    /// row's view chain didn't preserve `mirrors_id`.
    pub fn update(&self, values: &[(&str, Value)]) -> Result<()> {
        let mirrors_id = self.row.mirrors_id().ok_or_else(|| {
            Error::usage("cannot update a row whose view chain does not preserve mirrors_id")
        })?;
        let view = self.origin.upgrade().ok_or_else(|| {
            Error::usage("cannot update a row whose owning view has been dropped")
        })?;
        view::update_mirrored_row(&view, mirrors_id, values)
    }

    /// Re-enters through the owning base table to delete the mirrored
    /// row. Same preconditions as [`RowHandle::update`].
    pub fn delete(&self) -> Result<()> {
        let mirrors_id = self.row.mirrors_id().ok_or_else(|| {
            Error::usage("cannot delete a row whose view chain does not preserve mirrors_id")
        })?;
        let view = self.origin.upgrade().ok_or_else(|| {
            Error::usage("cannot delete a row whose owning view has been dropped")
        })?;
        view::delete_mirrored_row(&view, mirrors_id)
    }
}
