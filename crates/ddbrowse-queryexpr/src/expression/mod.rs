//! Query expression parsing and evaluation.
//!
//! The pipeline is:
//!
//! 1. **Lexing**: Tokenize the expression text, tracking byte offsets for errors.
//! 2. **Parsing**: Build an AST by recursive descent, keeping parentheses so the
//!    tree prints back as canonical text.
//! 3. **Evaluation**: Walk the AST against an item to read, write or delete
//!    attributes.

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod parser;
pub mod value;

pub use ast::{CompareOp, Expr, InCandidates, Literal, Placeholder, PlaceholderKind, QueryAst, QueryOption};
pub use builtins::{Builtin, FixedTimeSource, SystemTimeSource, TimeSource};
pub use evaluator::EvalContext;
pub use parser::parse_query;
pub use value::{ExprValue, ItemPath, PathSegment};
