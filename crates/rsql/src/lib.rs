//! rsql — a reactive SQL engine: incremental views over an embedded
//! SQLite store.
//!
//! `rsql-core`, `rsql-ivm`, `rsql-reactive` and `rsql-gateway` supply the
//! value model, the per-operator delta maths, the listener plumbing and
//! the SQL connection respectively. This crate wires them together into
//! the operator DAG a caller actually builds: [`Database::table`] opens
//! a [`view::ViewRef`] leaf, and every method on [`View`] composes a new
//! node on top of it — `.where_()`, `.select()`, `.distinct()`,
//! `.union()`/`.union_all()`, `.join()`, `.group_by()`, `.sort()` — each
//! returning another `ViewRef` a caller can further compose or subscribe
//! to.
//!
//! # Example
//!
//! ```no_run
//! use rsql::{Database, scalar::ColumnValue};
//! use rsql_core::{DataType, Value};
//! use rsql_core::schema::TableBuilder;
//!
//! let db = Database::open_in_memory().unwrap();
//! let users = TableBuilder::new("users").unwrap()
//!     .add_column("id", DataType::Integer).unwrap()
//!     .add_column("active", DataType::Boolean).unwrap()
//!     .add_primary_key("id").unwrap()
//!     .build().unwrap();
//! let t = db.table(users).unwrap();
//!
//! let count: ColumnValue = rsql::view::count(&t).unwrap();
//! count.onchange(|v| { let _ = v; });
//! ```

pub mod database;
pub mod query;
pub mod row;
pub mod scalar;
pub mod view;

pub use database::Database;
pub use row::RowHandle;
pub use view::{View, ViewRef};

pub use rsql_core::{schema, DataType, Error, Result, Row, Value};
pub use rsql_gateway::{CaptureStrategy, GatewayConfig, JournalMode};
