//! Chooses between a keyed Query and a Scan.
//!
//! A predicate can drive a Query when it pins the partition key with equality,
//! optionally joined by a single `and` with one condition on the sort key. The
//! table's own keys are tried first, then every global secondary index.

use std::collections::HashSet;

use ddbrowse_model::{KeyAttribute, QueryExecutionPlan, TableInfo};
use tracing::debug;

use super::builder::ExpressionBuilder;
use super::ir::{ComparisonOp, IrCompiler, IrNode, IrOperand, Predicate};
use crate::error::{QueryExprError, Result};
use crate::expression::ast::{QueryAst, QueryOption};
use crate::expression::evaluator::EvalContext;

/// Tracks which key attributes a candidate key condition has used.
#[derive(Debug, Clone)]
struct QueryCalcInfo<'a> {
    keys: &'a KeyAttribute,
    seen: HashSet<String>,
}

impl<'a> QueryCalcInfo<'a> {
    fn new(keys: &'a KeyAttribute) -> Self {
        Self {
            keys,
            seen: HashSet::new(),
        }
    }

    fn is_partition_key(&self, name: &str) -> bool {
        self.keys.partition_key == name
    }

    fn is_sort_key(&self, name: &str) -> bool {
        self.keys.sort_key.as_deref() == Some(name)
    }

    fn partition_seen(&self) -> bool {
        self.seen.contains(&self.keys.partition_key)
    }

    /// Marks a key as used. Each key can be used once.
    fn add_key(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_owned())
    }
}

/// The predicates that make up a key condition.
#[derive(Debug, Clone, Copy)]
struct KeyCondition<'p> {
    partition: &'p Predicate,
    sort: Option<&'p Predicate>,
}

fn key_condition<'p>(predicate: &'p Predicate, keys: &KeyAttribute) -> Option<KeyCondition<'p>> {
    let info = QueryCalcInfo::new(keys);
    match predicate {
        Predicate::And(operands) if operands.len() == 2 => {
            let orders = [(&operands[0], &operands[1]), (&operands[1], &operands[0])];
            orders.into_iter().find_map(|(first, second)| {
                let mut trial = info.clone();
                let partition = key_atom(first, &mut trial)?;
                let sort = key_atom(second, &mut trial)?;
                Some(KeyCondition {
                    partition,
                    sort: Some(sort),
                })
            })
        }
        _ => {
            let mut trial = info;
            key_atom(predicate, &mut trial).map(|partition| KeyCondition {
                partition,
                sort: None,
            })
        }
    }
}

/// Tests a single condition against the key schema, marking the key it uses.
fn key_atom<'p>(predicate: &'p Predicate, info: &mut QueryCalcInfo<'_>) -> Option<&'p Predicate> {
    match predicate {
        Predicate::Compare {
            left: IrOperand::Name(name),
            op,
            right: IrOperand::Value(_),
        } => {
            let key = name.key_name()?;
            let usable = if info.is_partition_key(key) {
                *op == ComparisonOp::Eq
            } else if info.is_sort_key(key) {
                info.partition_seen() && *op != ComparisonOp::Ne
            } else {
                false
            };
            (usable && info.add_key(key)).then_some(predicate)
        }
        Predicate::BeginsWith { name, .. }
        | Predicate::Between {
            name,
            low: IrOperand::Value(_),
            high: IrOperand::Value(_),
        } => {
            let key = name.key_name()?;
            let usable = info.is_sort_key(key) && info.partition_seen();
            (usable && info.add_key(key)).then_some(predicate)
        }
        _ => None,
    }
}

fn query_plan(key: KeyCondition<'_>, index_name: Option<String>) -> QueryExecutionPlan {
    let mut builder = ExpressionBuilder::new();
    let key_condition = builder.key_condition(key.partition, key.sort);
    let (name_bindings, value_bindings) = builder.into_bindings();
    QueryExecutionPlan {
        can_query: true,
        index_name,
        key_condition: Some(key_condition),
        filter_condition: None,
        name_bindings,
        value_bindings,
    }
}

fn scan_plan(predicate: &Predicate) -> QueryExecutionPlan {
    let mut builder = ExpressionBuilder::new();
    let filter = builder.filter(predicate);
    let (name_bindings, value_bindings) = builder.into_bindings();
    QueryExecutionPlan {
        can_query: false,
        index_name: None,
        key_condition: None,
        filter_condition: Some(filter),
        name_bindings,
        value_bindings,
    }
}

/// Produces an execution plan for a parsed query against `table`.
///
/// # Errors
///
/// Returns `NodeCannotBeConvertedToQuery` if the expression is not a
/// condition, `MultiplePlansWithIndex` if several secondary indexes could
/// serve it, `NoPlausiblePlanWithIndex` if a requested index cannot, and any
/// error raised while lowering the expression.
pub fn plan_query(
    ast: &QueryAst,
    ctx: EvalContext<'_>,
    table: &TableInfo,
) -> Result<QueryExecutionPlan> {
    let IrNode::Predicate(predicate) = IrCompiler::new(ctx, table).compile(&ast.expr)? else {
        return Err(QueryExprError::NodeCannotBeConvertedToQuery {
            expr: ast.expr.to_string(),
        });
    };

    if ast.options.contains(&QueryOption::Scan) {
        debug!(table = %table.name, "scan requested");
        return Ok(scan_plan(&predicate));
    }

    let requested_index = ast.options.iter().rev().find_map(|option| match option {
        QueryOption::Index(name) => Some(name.as_str()),
        QueryOption::Scan => None,
    });
    if let Some(index) = requested_index {
        let no_plan = || QueryExprError::NoPlausiblePlanWithIndex {
            index: index.to_owned(),
        };
        let gsi = table.gsi(index).ok_or_else(no_plan)?;
        let key = key_condition(&predicate, &gsi.keys).ok_or_else(no_plan)?;
        debug!(table = %table.name, index, "querying requested index");
        return Ok(query_plan(key, Some(gsi.name.clone())));
    }

    if let Some(key) = key_condition(&predicate, &table.keys) {
        debug!(table = %table.name, "querying table");
        return Ok(query_plan(key, None));
    }

    let mut candidates: Vec<_> = table
        .gsis
        .iter()
        .filter_map(|gsi| key_condition(&predicate, &gsi.keys).map(|key| (gsi, key)))
        .collect();
    match candidates.len() {
        0 => {
            debug!(table = %table.name, "no usable keys, scanning");
            Ok(scan_plan(&predicate))
        }
        1 => {
            let (gsi, key) = candidates.remove(0);
            debug!(table = %table.name, index = %gsi.name, "querying index");
            Ok(query_plan(key, Some(gsi.name.clone())))
        }
        _ => Err(QueryExprError::MultiplePlansWithIndex {
            indices: candidates.iter().map(|(gsi, _)| gsi.name.clone()).collect(),
        }),
    }
}
