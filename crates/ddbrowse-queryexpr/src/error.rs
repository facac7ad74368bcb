//! Error type shared by the parser, the interpreter and the planner.

/// Result alias for query expression operations.
pub type Result<T, E = QueryExprError> = std::result::Result<T, E>;

/// Errors produced while parsing, evaluating or planning a query expression.
#[derive(Debug, thiserror::Error)]
pub enum QueryExprError {
    /// An unexpected token was encountered.
    #[error("cannot parse expression at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
        /// Byte offset of the offending token.
        position: usize,
    },
    /// The input contains text that is not a token.
    #[error("cannot parse expression at position {position}: {message}")]
    InvalidToken {
        /// Explanation.
        message: String,
        /// Byte offset of the offending text.
        position: usize,
    },
    /// Traversal into an attribute that does not exist.
    #[error("{name}: name not found")]
    NameNotFound {
        /// The missing path.
        name: String,
    },
    /// Traversal by key into a value that is not a map.
    #[error("{}: name is not a map", .path.join("."))]
    ValueNotAMap {
        /// The path parts walked so far.
        path: Vec<String>,
    },
    /// Traversal by index into a value that is not a list.
    #[error("{}: name is not a list", .path.join("."))]
    ValueNotAList {
        /// The path parts walked so far.
        path: Vec<String>,
    },
    /// A list write past the end of the list.
    #[error("{}: index {index} out of range", .path.join("."))]
    IndexOutOfRange {
        /// The path of the list.
        path: Vec<String>,
        /// The requested index.
        index: i64,
    },
    /// Two values of different kinds were compared.
    #[error("values '{left}' and '{right}' are not comparable")]
    ValuesNotComparable {
        /// The left value.
        left: String,
        /// The right value.
        right: String,
    },
    /// The right side of a single-operand `in` is not a collection.
    #[error("values '{value}' cannot be used as the right side of 'in'")]
    ValuesNotInnable {
        /// The offending value.
        value: String,
    },
    /// A value with no string form was used where one is required.
    #[error("value '{value}' cannot be converted to a string")]
    ValueNotConvertableToString {
        /// The offending value.
        value: String,
    },
    /// An operand that must be an attribute name is something else.
    #[error("operand '{operand}' is not a name")]
    OperandNotAName {
        /// The operand as written.
        operand: String,
    },
    /// An operand that must be a name, a value or `size()` is something else.
    #[error("operand '{operand}' is not an operand")]
    OperandNotAnOperand {
        /// The operand as written.
        operand: String,
    },
    /// An operand that must be a literal or a value placeholder is something else.
    #[error("value '{operand}' must be a literal")]
    ValueMustBeLiteral {
        /// The operand as written.
        operand: String,
    },
    /// An operand that must be a string is something else.
    #[error("value '{operand}' must be a string")]
    ValueMustBeString {
        /// The operand as written.
        operand: String,
    },
    /// The expression does not produce a condition.
    #[error("expression '{expr}' cannot be converted into a query")]
    NodeCannotBeConvertedToQuery {
        /// The expression as written.
        expr: String,
    },
    /// The type name of an `is` check is not a known type.
    #[error("invalid type for 'is': {type_name}")]
    InvalidTypeForIs {
        /// The type name as given.
        type_name: String,
    },
    /// `between` was used on values that cannot be ordered.
    #[error("invalid type for 'between': {type_name}")]
    InvalidTypeForBetween {
        /// The type descriptor of the value.
        type_name: String,
    },
    /// A builtin was called with the wrong number of arguments.
    #[error("function '{name}' expected {expected} args but received {actual}")]
    InvalidArgumentNumber {
        /// The function name.
        name: String,
        /// The expected argument count.
        expected: usize,
        /// The given argument count.
        actual: usize,
    },
    /// A builtin argument has the wrong type.
    #[error("function '{name}' expected arg {arg_index} to be of type {expected}")]
    InvalidArgumentType {
        /// The function name.
        name: String,
        /// Zero-based argument position.
        arg_index: usize,
        /// The accepted types.
        expected: String,
    },
    /// The function does not exist.
    #[error("unrecognised function '{name}'")]
    UnrecognisedFunction {
        /// The function name.
        name: String,
    },
    /// `range()` would produce more values than allowed.
    #[error("range of {len} values exceeds the limit of {max}")]
    RangeTooLarge {
        /// The requested number of values.
        len: u128,
        /// The configured limit.
        max: usize,
    },
    /// A write was attempted on something that is not an attribute path.
    #[error("path cannot be set")]
    PathNotSettable,
    /// A placeholder has no binding.
    #[error("undefined placeholder '{placeholder}'")]
    MissingPlaceholder {
        /// The placeholder including its `$` or `:` prefix.
        placeholder: String,
    },
    /// A subscript did not evaluate to a string or an integer.
    #[error("value '{value}' cannot be used as a subref")]
    ValueNotUsableAsASubref {
        /// The subscript value.
        value: String,
    },
    /// More than one secondary index can serve the query.
    #[error("multiple plans with index found: {}. Specify index or scan with 'using' clause", .indices.join(", "))]
    MultiplePlansWithIndex {
        /// The candidate index names.
        indices: Vec<String>,
    },
    /// The requested secondary index cannot serve the query.
    #[error("no plan with index '{index}' found")]
    NoPlausiblePlanWithIndex {
        /// The requested index name.
        index: String,
    },
    /// A result set has no item at the given index.
    #[error("no item at index {index}")]
    NoSuchItem {
        /// The requested index.
        index: usize,
    },
    /// A stored expression could not be encoded or decoded.
    #[error("cannot serialize query expression: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryExprError {
    /// Returns `true` for errors raised while parsing expression text.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::UnexpectedToken { .. } | Self::InvalidToken { .. })
    }
}
