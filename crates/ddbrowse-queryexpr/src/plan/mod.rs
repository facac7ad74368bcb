//! Query planning: lowering expressions to IR and choosing Query or Scan.

pub mod builder;
pub mod ir;
pub mod planner;

pub use builder::ExpressionBuilder;
pub use ir::{ComparisonOp, IrCompiler, IrNode, IrOperand, NamePath, Predicate};
pub use planner::plan_query;
