//! Query expression engine for the DynamoDB browser.
//!
//! A query expression is a small filter language over DynamoDB items:
//!
//! ```text
//! pk = "user#1" and sk ^= "order#" using index("by-date")
//! ```
//!
//! [`QueryExpr`] parses the text once and then serves three jobs:
//!
//! - **Planning**: lower the expression to a keyed Query (on the table or a
//!   secondary index) or a Scan with a filter, see [`QueryExpr::plan`].
//! - **Evaluation**: compute the expression against an in-memory item, see
//!   [`QueryExpr::eval_item`].
//! - **Modification**: treat the expression as an attribute path and write or
//!   delete through it, see [`QueryExpr::set_eval_item`].
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod expression;
pub mod plan;
pub mod query_expr;
pub mod script;

pub use config::QueryExprConfig;
pub use error::{QueryExprError, Result};
pub use expression::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use query_expr::QueryExpr;
pub use script::{ItemProxy, ScriptValue};
