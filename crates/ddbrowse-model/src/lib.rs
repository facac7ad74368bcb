//! DynamoDB model types for the ddbrowse query engine.
//!
//! This crate holds the data the query expression engine reads and writes:
//! attribute values, items and result sets, table key metadata, and the
//! execution plans produced by the planner. It carries no engine logic beyond
//! the value helpers (exact numeric comparison, truthiness, string forms) that
//! both the interpreter and the planner rely on.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod item;
pub mod plan;
pub mod table;

pub use attribute_value::AttributeValue;
pub use item::{Item, ResultSet};
pub use plan::QueryExecutionPlan;
pub use table::{KeyAttribute, TableGsi, TableInfo};
