// Formula parser - converts formula strings into AST
// Supports: numbers, strings, cell refs (A1), ranges (A1:A5), functions (SUM),
// arithmetic (+, -, *, /), unary minus, and comparison operators (<, >, =, <=, >=, <>)

use gridcalc_core::{CellCoord, CellRange};
use thiserror::Error;

/// Formula expression AST.
///
/// Owned by the cell that parsed it and rebuilt wholesale on every
/// formula edit; there is no incremental re-parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    CellRef(CellCoord),
    Range(CellRange),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// A reference whose target row/column was structurally deleted.
    /// Produced only by reference rewriting, never by the parser.
    RefDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Comparison
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

/// Parse failure with the byte offset (within the full formula text,
/// including the leading `=`) where parsing stopped making sense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {pos}: {message}")]
pub struct ParseError {
    pub pos: usize,
    pub message: String,
}

impl ParseError {
    fn new(pos: usize, message: impl Into<String>) -> Self {
        Self { pos, message: message.into() }
    }
}

/// Parse a formula string (leading `=` required) into an AST.
///
/// Pure and total: any input yields either an AST or a `ParseError`.
/// Parsing never reads cell values and never evaluates anything.
pub fn parse(formula: &str) -> Result<Expr, ParseError> {
    let Some(body) = formula.strip_prefix('=') else {
        return Err(ParseError::new(0, "formula must start with ="));
    };
    let tokens = tokenize(body, 1)?;
    if tokens.is_empty() {
        return Err(ParseError::new(formula.len(), "empty formula"));
    }
    let (expr, pos) = parse_comparison(&tokens, 0, formula.len())?;
    if pos < tokens.len() {
        return Err(ParseError::new(tokens[pos].pos, "unexpected trailing input"));
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

#[derive(Debug, Clone)]
enum TokenKind {
    Number(f64),
    Str(String),
    CellRef(CellCoord),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Colon,
    Comma,
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
}

fn tokenize(input: &str, base: usize) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(idx, c)) = chars.peek() {
        let pos = base + idx;
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token { kind: TokenKind::Plus, pos });
                chars.next();
            }
            '-' => {
                tokens.push(Token { kind: TokenKind::Minus, pos });
                chars.next();
            }
            '*' => {
                tokens.push(Token { kind: TokenKind::Star, pos });
                chars.next();
            }
            '/' => {
                tokens.push(Token { kind: TokenKind::Slash, pos });
                chars.next();
            }
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, pos });
                chars.next();
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, pos });
                chars.next();
            }
            ':' => {
                tokens.push(Token { kind: TokenKind::Colon, pos });
                chars.next();
            }
            ',' => {
                tokens.push(Token { kind: TokenKind::Comma, pos });
                chars.next();
            }
            '=' => {
                tokens.push(Token { kind: TokenKind::Eq, pos });
                chars.next();
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        tokens.push(Token { kind: TokenKind::LtEq, pos });
                        chars.next();
                    }
                    Some(&(_, '>')) => {
                        tokens.push(Token { kind: TokenKind::NotEq, pos });
                        chars.next();
                    }
                    _ => tokens.push(Token { kind: TokenKind::Lt, pos }),
                }
            }
            '>' => {
                chars.next();
                if let Some(&(_, '=')) = chars.peek() {
                    tokens.push(Token { kind: TokenKind::GtEq, pos });
                    chars.next();
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, pos });
                }
            }
            '"' => {
                chars.next(); // consume opening quote
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => {
                            // Doubled quote is an escaped quote
                            if let Some(&(_, '"')) = chars.peek() {
                                chars.next();
                                s.push('"');
                            } else {
                                break;
                            }
                        }
                        Some((_, ch)) => s.push(ch),
                        None => {
                            return Err(ParseError::new(pos, "unterminated string literal"));
                        }
                    }
                }
                tokens.push(Token { kind: TokenKind::Str(s), pos });
            }
            'A'..='Z' | 'a'..='z' => {
                // Whole-token identifier scan. Cell references are
                // recognized against the complete token, never by
                // substring matching, so A1 can't shadow A10.
                let mut ident = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(coord) = try_cell_ref(&ident) {
                    tokens.push(Token { kind: TokenKind::CellRef(coord), pos });
                } else {
                    tokens.push(Token { kind: TokenKind::Ident(ident), pos });
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| ParseError::new(pos, format!("invalid number: {}", num_str)))?;
                tokens.push(Token { kind: TokenKind::Number(num), pos });
            }
            _ => {
                return Err(ParseError::new(pos, format!("unexpected character: {}", c)));
            }
        }
    }

    Ok(tokens)
}

/// Recognize a whole token as a cell reference: uppercase column letters
/// followed by a 1-based row number, nothing else. Case-sensitive by
/// contract; `a1` is an identifier, not a reference.
fn try_cell_ref(s: &str) -> Option<CellCoord> {
    let split = s.find(|c: char| !c.is_ascii_uppercase())?;
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    CellCoord::parse(s)
}

// Lowest precedence: comparison operators (reserved by the grammar,
// none of the built-ins require them)
fn parse_comparison(tokens: &[Token], pos: usize, end: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_add_sub(tokens, pos, end)?;

    while pos < tokens.len() {
        let op = match &tokens[pos].kind {
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Eq => BinOp::Eq,
            TokenKind::LtEq => BinOp::LtEq,
            TokenKind::GtEq => BinOp::GtEq,
            TokenKind::NotEq => BinOp::NotEq,
            _ => break,
        };
        let (right, new_pos) = parse_add_sub(tokens, pos + 1, end)?;
        left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_add_sub(tokens: &[Token], pos: usize, end: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos, end)?;

    while pos < tokens.len() {
        let op = match &tokens[pos].kind {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1, end)?;
        left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize, end: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_unary(tokens, pos, end)?;

    while pos < tokens.len() {
        let op = match &tokens[pos].kind {
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1, end)?;
        left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize, end: usize) -> Result<(Expr, usize), ParseError> {
    if pos < tokens.len() {
        if let TokenKind::Minus = &tokens[pos].kind {
            let (operand, new_pos) = parse_unary(tokens, pos + 1, end)?;
            return Ok((
                Expr::Unary { op: UnOp::Neg, operand: Box::new(operand) },
                new_pos,
            ));
        }
    }
    parse_primary(tokens, pos, end)
}

fn parse_primary(tokens: &[Token], pos: usize, end: usize) -> Result<(Expr, usize), ParseError> {
    let Some(token) = tokens.get(pos) else {
        return Err(ParseError::new(end, "unexpected end of expression"));
    };

    match &token.kind {
        TokenKind::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        TokenKind::Str(s) => Ok((Expr::Text(s.clone()), pos + 1)),
        TokenKind::CellRef(start) => {
            // Range reference: REF:REF
            if pos + 2 < tokens.len() {
                if let TokenKind::Colon = &tokens[pos + 1].kind {
                    if let TokenKind::CellRef(stop) = &tokens[pos + 2].kind {
                        return Ok((Expr::Range(CellRange::new(*start, *stop)), pos + 3));
                    }
                }
            }
            if pos + 1 < tokens.len() {
                if let TokenKind::Colon = &tokens[pos + 1].kind {
                    return Err(ParseError::new(
                        tokens[pos + 1].pos,
                        "expected cell reference after :",
                    ));
                }
            }
            Ok((Expr::CellRef(*start), pos + 1))
        }
        TokenKind::Ident(name) => {
            if name == "TRUE" {
                return Ok((Expr::Boolean(true), pos + 1));
            }
            if name == "FALSE" {
                return Ok((Expr::Boolean(false), pos + 1));
            }
            // Function call
            if let Some(next) = tokens.get(pos + 1) {
                if let TokenKind::LParen = next.kind {
                    let (args, new_pos) = parse_function_args(tokens, pos + 2, end)?;
                    return Ok((Expr::Function { name: name.clone(), args }, new_pos));
                }
            }
            Err(ParseError::new(token.pos, format!("unknown identifier: {}", name)))
        }
        TokenKind::LParen => {
            let (expr, pos) = parse_comparison(tokens, pos + 1, end)?;
            match tokens.get(pos) {
                Some(t) if matches!(t.kind, TokenKind::RParen) => Ok((expr, pos + 1)),
                Some(t) => Err(ParseError::new(t.pos, "expected closing parenthesis")),
                None => Err(ParseError::new(end, "missing closing parenthesis")),
            }
        }
        _ => Err(ParseError::new(token.pos, "unexpected token")),
    }
}

fn parse_function_args(
    tokens: &[Token],
    pos: usize,
    end: usize,
) -> Result<(Vec<Expr>, usize), ParseError> {
    let mut args = Vec::new();
    let mut pos = pos;

    // Empty argument list: NAME()
    if let Some(t) = tokens.get(pos) {
        if let TokenKind::RParen = t.kind {
            return Ok((args, pos + 1));
        }
    }

    loop {
        let (arg, new_pos) = parse_comparison(tokens, pos, end)?;
        args.push(arg);
        pos = new_pos;

        match tokens.get(pos) {
            Some(t) => match t.kind {
                TokenKind::RParen => return Ok((args, pos + 1)),
                TokenKind::Comma => pos += 1,
                _ => {
                    return Err(ParseError::new(
                        t.pos,
                        "expected comma or closing parenthesis",
                    ))
                }
            },
            None => {
                return Err(ParseError::new(end, "missing closing parenthesis in function call"));
            }
        }
    }
}

// =============================================================================
// Formula Printing - Convert Expr back to string
// =============================================================================

/// Format an expression as formula text (with leading `=`).
///
/// Used to regenerate stored source after structural reference rewrites,
/// so it inserts parentheses wherever re-parsing would otherwise bind
/// differently than the AST it was given.
pub fn format_expr(expr: &Expr) -> String {
    format!("={}", format_inner(expr))
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op_precedence(*op),
        Expr::Unary { .. } => 4,
        _ => 5,
    }
}

fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Lt | BinOp::Gt | BinOp::Eq | BinOp::LtEq | BinOp::GtEq | BinOp::NotEq => 1,
        BinOp::Add | BinOp::Sub => 2,
        BinOp::Mul | BinOp::Div => 3,
    }
}

fn format_inner(expr: &Expr) -> String {
    match expr {
        Expr::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Expr::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        Expr::Boolean(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Expr::CellRef(coord) => coord.label(),
        Expr::Range(range) => format!("{}:{}", range.start.label(), range.end.label()),
        Expr::Function { name, args } => {
            let args_str: Vec<String> = args.iter().map(format_inner).collect();
            format!("{}({})", name, args_str.join(","))
        }
        Expr::Binary { op, left, right } => {
            let prec = op_precedence(*op);
            let left_str = if precedence(left) < prec {
                format!("({})", format_inner(left))
            } else {
                format_inner(left)
            };
            // Right side needs parens at equal precedence too: a-(b-c)
            let right_str = if precedence(right) <= prec {
                format!("({})", format_inner(right))
            } else {
                format_inner(right)
            };
            let op_str = match op {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
                BinOp::Lt => "<",
                BinOp::Gt => ">",
                BinOp::Eq => "=",
                BinOp::LtEq => "<=",
                BinOp::GtEq => ">=",
                BinOp::NotEq => "<>",
            };
            format!("{}{}{}", left_str, op_str, right_str)
        }
        Expr::Unary { op: UnOp::Neg, operand } => {
            if precedence(operand) < 4 {
                format!("-({})", format_inner(operand))
            } else {
                format!("-{}", format_inner(operand))
            }
        }
        Expr::RefDeleted => "#REF!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col)
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse("=42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse("=1.5").unwrap(), Expr::Number(1.5));
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse("=B3").unwrap(), Expr::CellRef(coord(2, 1)));
        assert_eq!(parse("=AA10").unwrap(), Expr::CellRef(coord(9, 26)));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            parse("=A1:C5").unwrap(),
            Expr::Range(CellRange::new(coord(0, 0), coord(4, 2)))
        );
    }

    #[test]
    fn test_range_normalized() {
        // Corners given backwards still normalize start <= end per axis
        assert_eq!(
            parse("=C5:A1").unwrap(),
            Expr::Range(CellRange::new(coord(0, 0), coord(4, 2)))
        );
    }

    #[test]
    fn test_parse_function_with_range() {
        match parse("=SUM(A1:A10)").unwrap() {
            Expr::Function { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 1);
                assert!(matches!(args[0], Expr::Range(_)));
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_with_scalar_args() {
        match parse("=SUM(A1,B2,3)").unwrap() {
            Expr::Function { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // 1+2*3 parses as 1+(2*3)
        match parse("=1+2*3").unwrap() {
            Expr::Binary { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected Add at top, got {:?}", other),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        // (1+2)*3 parses as (1+2)*3
        match parse("=(1+2)*3").unwrap() {
            Expr::Binary { op: BinOp::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected Mul at top, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus() {
        match parse("=-A1").unwrap() {
            Expr::Unary { op: UnOp::Neg, operand } => {
                assert_eq!(*operand, Expr::CellRef(coord(0, 0)));
            }
            other => panic!("expected Unary, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_mul() {
        // -2*3 is (-2)*3
        match parse("=-2*3").unwrap() {
            Expr::Binary { op: BinOp::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Unary { .. }));
            }
            other => panic!("expected Mul at top, got {:?}", other),
        }
    }

    #[test]
    fn test_prefix_collision_a1_vs_a10() {
        // A1 inside A10 must not be matched as a separate token
        match parse("=A10+A1").unwrap() {
            Expr::Binary { op: BinOp::Add, left, right } => {
                assert_eq!(*left, Expr::CellRef(coord(9, 0)));
                assert_eq!(*right, Expr::CellRef(coord(0, 0)));
            }
            other => panic!("expected Add, got {:?}", other),
        }
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(parse("=\"hello\"").unwrap(), Expr::Text("hello".to_string()));
    }

    #[test]
    fn test_string_literal_doubled_quote() {
        assert_eq!(parse("=\"a\"\"b\"").unwrap(), Expr::Text("a\"b".to_string()));
    }

    #[test]
    fn test_boolean_literals() {
        assert_eq!(parse("=TRUE").unwrap(), Expr::Boolean(true));
        assert_eq!(parse("=FALSE").unwrap(), Expr::Boolean(false));
    }

    #[test]
    fn test_case_sensitive_references() {
        // Lowercase is not a cell reference and not a known identifier
        assert!(parse("=a1").is_err());
    }

    #[test]
    fn test_missing_equals() {
        let err = parse("1+2").unwrap_err();
        assert_eq!(err.pos, 0);
    }

    #[test]
    fn test_error_carries_position() {
        let err = parse("=1+").unwrap_err();
        assert_eq!(err.pos, 3);

        let err = parse("=1 ~ 2").unwrap_err();
        assert_eq!(err.pos, 3);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(parse("=\"abc").is_err());
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(parse("=1 2").is_err());
        assert!(parse("=SUM(A1:A2))").is_err());
    }

    #[test]
    fn test_comparison_reserved_in_grammar() {
        match parse("=A1<=B1").unwrap() {
            Expr::Binary { op: BinOp::LtEq, .. } => {}
            other => panic!("expected LtEq, got {:?}", other),
        }
        match parse("=A1<>B1").unwrap() {
            Expr::Binary { op: BinOp::NotEq, .. } => {}
            other => panic!("expected NotEq, got {:?}", other),
        }
    }

    #[test]
    fn test_never_panics_on_junk() {
        for junk in ["=", "=:", "=,", "=()", "=SUM(", "=SUM(,)", "=A1:", "=A1:)", "=)(", "=.."] {
            assert!(parse(junk).is_err(), "expected error for {:?}", junk);
        }
    }

    // ── Round-trip: parse → format_expr → parse ─────────────────────

    #[test]
    fn test_roundtrip_simple() {
        for src in ["=A1+B2", "=SUM(A1:A10)", "=1+2*3", "=-A1", "=\"x\"", "=TRUE"] {
            let parsed = parse(src).unwrap();
            assert_eq!(parse(&format_expr(&parsed)).unwrap(), parsed, "source {}", src);
        }
    }

    #[test]
    fn test_roundtrip_preserves_grouping() {
        let parsed = parse("=(A1+B1)*2").unwrap();
        let formatted = format_expr(&parsed);
        assert_eq!(formatted, "=(A1+B1)*2");
        assert_eq!(parse(&formatted).unwrap(), parsed);
    }

    #[test]
    fn test_roundtrip_right_associative_grouping() {
        let parsed = parse("=A1-(B1-C1)").unwrap();
        assert_eq!(parse(&format_expr(&parsed)).unwrap(), parsed);
    }

    #[test]
    fn test_format_ref_deleted() {
        let expr = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(Expr::RefDeleted),
            right: Box::new(Expr::Number(1.0)),
        };
        assert_eq!(format_expr(&expr), "=#REF!+1");
    }
}
