//! rsql-core — core types and schema definitions for the rsql reactive
//! SQL engine.
//!
//! This crate provides the foundational types shared by `rsql-ivm`,
//! `rsql-reactive`, `rsql-gateway` and the top-level `rsql` crate:
//!
//! - `DataType`: logical column types (Integer, Real, Text, Blob, Boolean)
//! - `Value`: runtime values that can occupy a database cell
//! - `Row`: a row of values, optionally mirroring a base-table row id
//! - `schema`: declared-schema definitions (`Column`, `Table`)
//! - `Error`: the four error kinds rsql operations report
//!
//! # Example
//!
//! ```rust
//! use rsql_core::{DataType, Value, Row};
//! use rsql_core::schema::{TableBuilder, Column};
//!
//! let table = TableBuilder::new("users")
//!     .unwrap()
//!     .add_column("id", DataType::Integer)
//!     .unwrap()
//!     .add_column("name", DataType::Text)
//!     .unwrap()
//!     .add_primary_key("id")
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let row = Row::new(1, vec![
//!     Value::Integer(1),
//!     Value::Text("Alice".into()),
//! ]);
//!
//! assert_eq!(row.mirrors_id(), Some(1));
//! assert_eq!(row.get(1), Some(&Value::Text("Alice".into())));
//! assert_eq!(table.name(), "users");
//! ```

#![no_std]

extern crate alloc;

mod error;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::{next_row_id, reserve_row_ids, set_next_row_id_if_greater, Row, RowId};
pub use types::DataType;
pub use value::Value;
