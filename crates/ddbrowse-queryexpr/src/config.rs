//! Engine configuration.
//!
//! Provides [`QueryExprConfig`], loaded from environment variables or built in
//! code with the typed builder.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Query expression engine configuration.
///
/// # Examples
///
/// ```
/// use ddbrowse_queryexpr::config::QueryExprConfig;
///
/// let config = QueryExprConfig::default();
/// assert!(config.private_builtins);
/// assert_eq!(config.max_range_values, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct QueryExprConfig {
    /// Whether the `_x_*` scripting builtins can be called.
    #[builder(default = true)]
    pub private_builtins: bool,

    /// Largest list `range()` may produce.
    #[builder(default = 10_000)]
    pub max_range_values: usize,
}

impl Default for QueryExprConfig {
    fn default() -> Self {
        Self {
            private_builtins: true,
            max_range_values: 10_000,
        }
    }
}

impl QueryExprConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `QUERYEXPR_PRIVATE_BUILTINS` | `true` |
    /// | `QUERYEXPR_MAX_RANGE_VALUES` | `10000` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("QUERYEXPR_PRIVATE_BUILTINS") {
            config.private_builtins = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("QUERYEXPR_MAX_RANGE_VALUES") {
            if let Ok(n) = v.parse::<usize>() {
                config.max_range_values = n;
            }
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
