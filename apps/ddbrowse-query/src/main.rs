//! ddbrowse-query - try query expressions from the command line.
//!
//! Parses an expression, prints its canonical form and the Query or Scan plan
//! it lowers to, and optionally evaluates it against an item.
//!
//! # Usage
//!
//! ```text
//! ddbrowse-query --pk pk --sk sk 'pk = "user#1" and sk ^= "order#"'
//! ddbrowse-query --table table.json --item item.json 'address.city'
//! ddbrowse-query --item item.json --set '{"N": "3"}' 'counts[0]'
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `--log-level`) |
//! | `QUERYEXPR_PRIVATE_BUILTINS` | `true` | Enable the `_x_*` builtins |
//! | `QUERYEXPR_MAX_RANGE_VALUES` | `10000` | Largest list `range()` may produce |

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use ddbrowse_model::{AttributeValue, Item, KeyAttribute, TableInfo};
use ddbrowse_queryexpr::{QueryExpr, QueryExprConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Parse, plan and evaluate a ddbrowse query expression.
#[derive(Debug, Parser)]
#[command(name = "ddbrowse-query", version, about)]
struct Args {
    /// The query expression.
    expr: String,

    /// Table description as a JSON file. Overrides `--pk` and `--sk`.
    #[arg(long)]
    table: Option<PathBuf>,

    /// Partition key of the table.
    #[arg(long, default_value = "pk")]
    pk: String,

    /// Sort key of the table.
    #[arg(long)]
    sk: Option<String>,

    /// Item to evaluate the expression against, as a DynamoDB JSON file.
    #[arg(long)]
    item: Option<PathBuf>,

    /// Name placeholder binding, `key=attribute`. Repeatable.
    #[arg(long = "name", value_name = "KEY=NAME")]
    names: Vec<String>,

    /// Value placeholder binding, `key=<DynamoDB JSON>`. Repeatable.
    #[arg(long = "value", value_name = "KEY=JSON")]
    values: Vec<String>,

    /// Write a DynamoDB JSON value through the expression path into the item.
    #[arg(long, requires = "item", conflicts_with = "delete")]
    set: Option<String>,

    /// Delete the attribute the expression path points at from the item.
    #[arg(long, requires = "item")]
    delete: bool,

    /// Log level filter.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `--log-level`.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Argument handling
// ---------------------------------------------------------------------------

/// Split a `key=value` argument.
fn split_binding(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("invalid binding '{arg}': expected KEY=VALUE"),
    }
}

fn parse_value(json: &str) -> Result<AttributeValue> {
    serde_json::from_str(json).with_context(|| format!("invalid DynamoDB JSON value: {json}"))
}

fn load_table(args: &Args) -> Result<TableInfo> {
    if let Some(path) = &args.table {
        let file = File::open(path)
            .with_context(|| format!("cannot open table file {}", path.display()))?;
        return serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid table description in {}", path.display()));
    }

    let mut keys = KeyAttribute::new(&args.pk);
    if let Some(sk) = &args.sk {
        keys = keys.with_sort_key(sk);
    }
    Ok(TableInfo::new("cli", keys))
}

fn load_item(path: &Path) -> Result<Item> {
    let file =
        File::open(path).with_context(|| format!("cannot open item file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid DynamoDB JSON item in {}", path.display()))
}

fn build_expr(args: &Args) -> Result<QueryExpr> {
    let names = args
        .names
        .iter()
        .map(|arg| split_binding(arg).map(|(k, v)| (k.to_owned(), v.to_owned())))
        .collect::<Result<HashMap<_, _>>>()?;
    let values = args
        .values
        .iter()
        .map(|arg| {
            let (k, v) = split_binding(arg)?;
            Ok((k.to_owned(), parse_value(v)?))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    let expr = QueryExpr::parse(&args.expr)?
        .with_config(QueryExprConfig::from_env())
        .with_name_params(names)
        .with_value_params(values);
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    let expr = build_expr(args)?;
    writeln!(out, "expr: {expr}")?;

    let table = load_table(args)?;
    let plan = expr.plan(&table)?;
    info!(table = %table.name, can_query = plan.can_query, "planned expression");
    writeln!(out, "plan: {}", serde_json::to_string_pretty(&plan)?)?;

    let Some(path) = &args.item else {
        return Ok(());
    };
    let mut item = load_item(path)?;
    debug!(attributes = item.len(), "loaded item");

    match expr.eval_item(&item)? {
        Some(value) => writeln!(out, "result: {}", serde_json::to_string(&value)?)?,
        None => writeln!(out, "result: missing")?,
    }

    if let Some(json) = &args.set {
        expr.set_eval_item(&mut item, parse_value(json)?)?;
        writeln!(out, "item: {}", serde_json::to_string(&item)?)?;
    } else if args.delete {
        expr.delete_attribute(&mut item)?;
        writeln!(out, "item: {}", serde_json::to_string(&item)?)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&args, &mut out)
}
