//! Lexer and recursive-descent parser for query expressions.
//!
//! Keywords are lower case. Each level of the comparison family binds one
//! operator at most, so `a < b < c` is rejected rather than chained.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::ast::{
    CompareOp, Expr, InCandidates, Literal, Placeholder, PlaceholderKind, QueryAst, QueryOption,
};
use crate::error::{QueryExprError, Result};

// ---------------------------------------------------------------------------
// Token type
// ---------------------------------------------------------------------------

/// Lexer token for query expressions.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// An attribute or function name.
    Ident(String),
    /// A string literal, unescaped.
    Str(String),
    /// A number literal, as written.
    Number(String),
    /// `$name`
    ValuePlaceholder(String),
    /// `:name`
    NamePlaceholder(String),
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `^=`
    BeginsWith,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    // Keywords
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `in`
    In,
    /// `is`
    Is,
    /// `between`
    Between,
    /// `true`
    True,
    /// `false`
    False,
    /// `using`
    Using,
    /// End of input.
    Eof,
}

impl Token {
    /// The source text of a keyword token.
    fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::In => "in",
            Self::Is => "is",
            Self::Between => "between",
            Self::True => "true",
            Self::False => "false",
            Self::Using => "using",
            _ => return None,
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kw) = self.keyword() {
            return write!(f, "'{kw}'");
        }
        match self {
            Self::Ident(s) => write!(f, "identifier '{s}'"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Number(n) => write!(f, "number {n}"),
            Self::ValuePlaceholder(s) => write!(f, "'${s}'"),
            Self::NamePlaceholder(s) => write!(f, "':{s}'"),
            Self::Eq => write!(f, "'='"),
            Self::Ne => write!(f, "'!='"),
            Self::BeginsWith => write!(f, "'^='"),
            Self::Lt => write!(f, "'<'"),
            Self::Le => write!(f, "'<='"),
            Self::Gt => write!(f, "'>'"),
            Self::Ge => write!(f, "'>='"),
            Self::Dot => write!(f, "'.'"),
            Self::Comma => write!(f, "','"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            _ => write!(f, "end of expression"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// Tokenizer for query expression strings.
struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            len: input.len(),
        }
    }

    /// Tokenize the entire input into tokens paired with their byte offsets.
    fn tokenize(&mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let pos = self.position();
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push((tok, pos));
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.len, |&(i, _)| i)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn second_char(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.chars.next();
        }
    }

    fn invalid(&mut self, message: impl Into<String>) -> QueryExprError {
        QueryExprError::InvalidToken {
            message: message.into(),
            position: self.position(),
        }
    }

    fn single(&mut self, tok: Token) -> Token {
        self.chars.next();
        tok
    }

    fn next_token(&mut self) -> Result<Token> {
        let Some(ch) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        match ch {
            '"' => self.read_string(),
            '$' => self.read_placeholder().map(Token::ValuePlaceholder),
            ':' => self.read_placeholder().map(Token::NamePlaceholder),
            '=' => Ok(self.single(Token::Eq)),
            '!' | '^' => {
                let tok = if ch == '!' { Token::Ne } else { Token::BeginsWith };
                if self.second_char() != Some('=') {
                    return Err(self.invalid(format!("expected '=' after '{ch}'")));
                }
                self.chars.next();
                Ok(self.single(tok))
            }
            '<' | '>' => {
                self.chars.next();
                let with_eq = self.peek_char() == Some('=');
                if with_eq {
                    self.chars.next();
                }
                Ok(match (ch, with_eq) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    (_, false) => Token::Gt,
                    (_, true) => Token::Ge,
                })
            }
            '.' if self.second_char().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.read_number())
            }
            '.' => Ok(self.single(Token::Dot)),
            ',' => Ok(self.single(Token::Comma)),
            '(' => Ok(self.single(Token::LParen)),
            ')' => Ok(self.single(Token::RParen)),
            '[' => Ok(self.single(Token::LBracket)),
            ']' => Ok(self.single(Token::RBracket)),
            '-' | '+'
                if self
                    .second_char()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.') =>
            {
                Ok(self.read_number())
            }
            c if c.is_ascii_digit() => Ok(self.read_number()),
            c if is_ident_start(c) => Ok(self.read_identifier_or_keyword()),
            _ => Err(self.invalid(format!("unexpected character '{ch}'"))),
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        self.chars.next(); // consume '"'
        let mut s = String::new();
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(self.invalid("unterminated string literal"));
            };
            match c {
                '"' => return Ok(Token::Str(s)),
                '\\' => {
                    let escaped = match self.chars.next().map(|(_, c)| c) {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(other) => {
                            return Err(self.invalid(format!("invalid escape '\\{other}'")));
                        }
                        None => return Err(self.invalid("unterminated string literal")),
                    };
                    s.push(escaped);
                }
                c => s.push(c),
            }
        }
    }

    fn read_placeholder(&mut self) -> Result<String> {
        self.chars.next(); // consume '$' or ':'
        let name = self.read_while(is_ident_continue);
        if name.is_empty() {
            return Err(self.invalid("expected placeholder name"));
        }
        Ok(name)
    }

    fn read_number(&mut self) -> Token {
        let mut s = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek_char() {
            s.push(sign);
            self.chars.next();
        }
        s.push_str(&self.read_while(|c| c.is_ascii_digit()));
        if self.peek_char() == Some('.') && self.second_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.chars.next();
            s.push('.');
            s.push_str(&self.read_while(|c| c.is_ascii_digit()));
        }
        Token::Number(s)
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            s.push(c);
            self.chars.next();
        }
        s
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let ident = self.read_while(is_ident_continue);
        match ident.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "is" => Token::Is,
            "between" => Token::Between,
            "true" => Token::True,
            "false" => Token::False,
            "using" => Token::Using,
            _ => Token::Ident(ident),
        }
    }
}

/// Returns `true` if `c` can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns `true` if `c` can continue an identifier or a placeholder name.
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Recursive-descent parser for query expressions.
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens
            .get(self.pos + n)
            .map_or(&Token::Eof, |(tok, _)| tok)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |(_, pos)| *pos)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn unexpected(&self, expected: &str) -> QueryExprError {
        QueryExprError::UnexpectedToken {
            expected: expected.to_owned(),
            found: self.peek().to_string(),
            position: self.position(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.peek() == expected {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn at_end(&self) -> bool {
        *self.peek() == Token::Eof
    }

    // -- query := disj ('using' option (',' option)*)? ----------------------

    fn parse_query(&mut self) -> Result<QueryAst> {
        let expr = self.parse_disjunction()?;
        let mut options = Vec::new();
        if *self.peek() == Token::Using {
            self.advance();
            options.push(self.parse_option()?);
            while *self.peek() == Token::Comma {
                self.advance();
                options.push(self.parse_option()?);
            }
        }
        Ok(QueryAst { expr, options })
    }

    fn parse_option(&mut self) -> Result<QueryOption> {
        match self.peek() {
            Token::Ident(name) if name == "scan" => {
                self.advance();
                Ok(QueryOption::Scan)
            }
            Token::Ident(name) if name == "index" => {
                self.advance();
                self.expect(&Token::LParen)?;
                let Token::Str(index) = self.peek().clone() else {
                    return Err(self.unexpected("index name"));
                };
                self.advance();
                self.expect(&Token::RParen)?;
                Ok(QueryOption::Index(index))
            }
            _ => Err(self.unexpected("'scan' or 'index'")),
        }
    }

    // -- boolean operators --------------------------------------------------

    fn parse_disjunction(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_conjunction()?];
        while *self.peek() == Token::Or {
            self.advance();
            operands.push(self.parse_conjunction()?);
        }
        Ok(collapse(operands, Expr::Or))
    }

    fn parse_conjunction(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_not()?];
        while *self.peek() == Token::And {
            self.advance();
            operands.push(self.parse_not()?);
        }
        Ok(collapse(operands, Expr::And))
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if *self.peek() == Token::Not {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_in()
    }

    // -- comparison family --------------------------------------------------

    fn parse_in(&mut self) -> Result<Expr> {
        let operand = self.parse_comparison()?;
        let negated = match (self.peek(), self.peek_nth(1)) {
            (Token::Not, Token::In) => {
                self.pos += 2;
                true
            }
            (Token::In, _) => {
                self.pos += 1;
                false
            }
            _ => return Ok(operand),
        };

        let candidates = if *self.peek() == Token::LParen {
            self.advance();
            let mut list = vec![self.parse_disjunction()?];
            while *self.peek() == Token::Comma {
                self.advance();
                list.push(self.parse_disjunction()?);
            }
            self.expect(&Token::RParen)?;
            InCandidates::List(list)
        } else {
            InCandidates::Single(Box::new(self.parse_comparison()?))
        };

        Ok(Expr::In {
            operand: Box::new(operand),
            negated,
            candidates,
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_equality()?;
        let op = match self.peek() {
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_equality()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let left = self.parse_is()?;
        let op = match self.peek() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::BeginsWith => CompareOp::BeginsWith,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_is()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_is(&mut self) -> Result<Expr> {
        let operand = self.parse_between()?;
        if *self.peek() != Token::Is {
            return Ok(operand);
        }
        self.advance();
        let negated = *self.peek() == Token::Not;
        if negated {
            self.advance();
        }
        let type_name = self.parse_between()?;
        Ok(Expr::Is {
            operand: Box::new(operand),
            negated,
            type_name: Box::new(type_name),
        })
    }

    fn parse_between(&mut self) -> Result<Expr> {
        let operand = self.parse_subref()?;
        if *self.peek() != Token::Between {
            return Ok(operand);
        }
        self.advance();
        let low = self.parse_subref()?;
        self.expect(&Token::And)?;
        let high = self.parse_subref()?;
        Ok(Expr::Between {
            operand: Box::new(operand),
            low: Box::new(low),
            high: Box::new(high),
        })
    }

    // -- paths, calls and atoms ---------------------------------------------

    fn parse_subref(&mut self) -> Result<Expr> {
        let mut expr = self.parse_call()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let field = match self.advance() {
                        Token::Ident(name) => name,
                        tok => match tok.keyword() {
                            Some(kw) => kw.to_owned(),
                            None => {
                                self.pos -= 1;
                                return Err(self.unexpected("field name"));
                            }
                        },
                    };
                    expr = Expr::Dot {
                        base: Box::new(expr),
                        field,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_disjunction()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call(&mut self) -> Result<Expr> {
        let function = self.parse_atom()?;
        if *self.peek() != Token::LParen {
            return Ok(function);
        }
        self.advance();
        let mut args = Vec::new();
        if *self.peek() != Token::RParen {
            args.push(self.parse_disjunction()?);
            while *self.peek() == Token::Comma {
                self.advance();
                args.push(self.parse_disjunction()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(Expr::Call {
            function: Box::new(function),
            args,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let expr = match self.peek().clone() {
            Token::Ident(name) => Expr::Name(name),
            Token::Str(s) => Expr::Literal(Literal::String(s)),
            Token::Number(n) => Expr::Literal(Literal::Number(n)),
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::ValuePlaceholder(name) => Expr::Placeholder(Placeholder {
                kind: PlaceholderKind::Value,
                name,
            }),
            Token::NamePlaceholder(name) => Expr::Placeholder(Placeholder {
                kind: PlaceholderKind::Name,
                name,
            }),
            Token::LParen => {
                self.advance();
                let inner = self.parse_disjunction()?;
                self.expect(&Token::RParen)?;
                return Ok(Expr::Paren(Box::new(inner)));
            }
            _ => return Err(self.unexpected("operand")),
        };
        self.advance();
        Ok(expr)
    }
}

fn collapse(mut operands: Vec<Expr>, combine: fn(Vec<Expr>) -> Expr) -> Expr {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        combine(operands)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse query expression text, including an optional trailing `using` clause.
///
/// # Errors
///
/// Returns `UnexpectedToken` or `InvalidToken`, carrying the byte offset of the
/// problem, if the input is not a valid expression.
pub fn parse_query(input: &str) -> Result<QueryAst> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let ast = parser.parse_query()?;
    if !parser.at_end() {
        return Err(parser.unexpected("end of expression"));
    }
    tracing::trace!(input, canonical = %ast, "parsed query expression");
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        parse_query(input).unwrap().expr
    }

    fn canonical(input: &str) -> String {
        parse_query(input).unwrap().to_string()
    }

    #[test]
    fn test_should_parse_equality() {
        let expr = parse(r#"pk = "abc""#);
        match &expr {
            Expr::Compare { left, op, right } => {
                assert_eq!(**left, Expr::Name("pk".to_owned()));
                assert_eq!(*op, CompareOp::Eq);
                assert_eq!(**right, Expr::Literal(Literal::String("abc".to_owned())));
            }
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn test_should_bind_and_tighter_than_or() {
        let expr = parse("a = 1 or b = 2 and c = 3");
        match &expr {
            Expr::Or(operands) => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(&operands[1], Expr::And(v) if v.len() == 2));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_should_flatten_repeated_conjunctions() {
        assert!(matches!(parse("a and b and c"), Expr::And(v) if v.len() == 3));
    }

    #[test]
    fn test_should_keep_between_bounds_out_of_conjunction() {
        let expr = parse(r#"pk = "x" and sk between 1 and 9"#);
        match &expr {
            Expr::And(operands) => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[1], Expr::Between { .. }));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_should_parse_in_forms() {
        assert!(matches!(
            parse("pk in (1, 2)"),
            Expr::In { negated: false, candidates: InCandidates::List(ref v), .. } if v.len() == 2
        ));
        assert!(matches!(
            parse("pk not in (1)"),
            Expr::In { negated: true, candidates: InCandidates::List(_), .. }
        ));
        assert!(matches!(
            parse("three in range(1, 5)"),
            Expr::In { candidates: InCandidates::Single(ref s), .. } if matches!(**s, Expr::Call { .. })
        ));
    }

    #[test]
    fn test_should_parse_paths_and_calls() {
        let expr = parse("size(a.b[2].c)");
        let Expr::Call { function, args } = &expr else {
            panic!("expected Call, got {expr:?}");
        };
        assert_eq!(**function, Expr::Name("size".to_owned()));
        assert!(matches!(&args[0], Expr::Dot { field, .. } if field == "c"));
    }

    #[test]
    fn test_should_parse_negative_and_decimal_numbers() {
        assert_eq!(canonical("a=-131"), "a = -131");
        assert_eq!(canonical("a>=1.50"), "a >= 1.50");
        assert_eq!(canonical("a < .5"), "a < .5");
    }

    #[test]
    fn test_should_parse_placeholders() {
        let expr = parse(":name = $value");
        let Expr::Compare { left, right, .. } = &expr else {
            panic!("expected Compare, got {expr:?}");
        };
        assert!(matches!(&**left, Expr::Placeholder(p) if p.kind == PlaceholderKind::Name));
        assert!(matches!(&**right, Expr::Placeholder(p) if p.kind == PlaceholderKind::Value));
    }

    #[test]
    fn test_should_parse_using_clause() {
        let ast = parse_query(r#"apples = "this" using index("with-apples")"#).unwrap();
        assert_eq!(ast.options, vec![QueryOption::Index("with-apples".to_owned())]);
        let ast = parse_query(r#"pk = "x" using scan"#).unwrap();
        assert_eq!(ast.options, vec![QueryOption::Scan]);
    }

    #[test]
    fn test_should_produce_canonical_text() {
        let cases = [
            (r#"pk="a"and(sk>=1)"#, r#"pk = "a" and (sk >= 1)"#),
            ("a in (1,2)", "a in (1, 2)"),
            ("x between 1 and 5", "x between 1 and 5"),
            (r#"a is not "S""#, r#"a is not "S""#),
            ("size(pk)", "size(pk)"),
            ("not a or b", "not a or b"),
            (r#"a^="p""#, r#"a ^= "p""#),
            ("this[2]", "this[2]"),
            ("range(1,5)", "range(1, 5)"),
            (r#"s = "q\"uote\\""#, r#"s = "q\"uote\\""#),
            (
                r#"apples="this" using index("with-apples")"#,
                r#"apples = "this" using index("with-apples")"#,
            ),
            (
                r#"pk="x" using scan,index("a")"#,
                r#"pk = "x" using scan, index("a")"#,
            ),
            (r#"s="a\/b\tc""#, r#"s = "a/b\tc""#),
            ("((a))=((1))", "((a)) = ((1))"),
        ];
        for (input, expected) in cases {
            assert_eq!(canonical(input), expected, "canonical form of {input}");
        }
    }

    #[test]
    fn test_should_reparse_canonical_text_to_same_tree() {
        let inputs = [
            r#"pk="a" and sk^="b""#,
            r#"(a = 1 or b != "x") and not c in (1, 2, 3)"#,
            "charlie.tree[0].leaf is not \"any\"",
            "x not in range(1, 10) or y between $lo and $hi",
            "(three = 3) is \"BOOL\"",
            "_x_concat(\"a\\nb\", :n, 1.5)",
            r#"s = "tab\t quote\" slash\/ back\\ nl\n cr\r""#,
            r#"pk = "x" using scan, index("with-apples"), index("with-color")"#,
            r#"((a=1)or(b="y"))and((c))"#,
            "not(not(a))and(x)in(1,2)",
            r#"(charlie[("door")])^=("r")"#,
        ];
        for input in inputs {
            let first = parse_query(input).unwrap();
            let text = first.to_string();
            let second = parse_query(&text).unwrap();
            assert_eq!(first, second, "round trip of {input}");
            assert_eq!(second.to_string(), text, "canonical text of {input} is stable");
        }
    }

    #[test]
    fn test_should_reject_split_operator() {
        let err = parse_query(r#"bla ^ = "something""#).unwrap_err();
        assert!(matches!(err, QueryExprError::InvalidToken { position: 4, .. }));
    }

    #[test]
    fn test_should_reject_chained_comparisons() {
        let err = parse_query("a < b < c").unwrap_err();
        assert!(matches!(err, QueryExprError::UnexpectedToken { position: 6, .. }));
    }

    #[test]
    fn test_should_reject_incomplete_expressions() {
        for input in ["", "a =", "a in ()", "(a", "a between 1", r#""open"#, "a using"] {
            let err = parse_query(input).unwrap_err();
            assert!(err.is_parse_error(), "{input} gave {err:?}");
        }
    }
}
