//! Parser for the policy-script language.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{char, multispace1, satisfy},
    combinator::{all_consuming, cut, map, not, opt, recognize, value},
    error::{ContextError, ErrorKind, ParseError, VerboseError, VerboseErrorKind, context},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::ast::{BinOp, Expr, Part, Stmt};
use crate::{Error, Result};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const KEYWORDS: &[&str] = &["return", "if", "else", "def", "null", "true", "false"];

/// How deep blocks, parentheses, operators and interpolations may nest.
/// Chains of `+`, `&&`, `||` and postfix accesses count toward the same
/// height so that evaluation stays within bounds too.
const MAX_DEPTH: usize = 64;

const TOO_DEEP: &str = "expression nested too deeply";

/// Parse a whole script into its statements.
pub(crate) fn parse_script(source: &str) -> Result<Vec<Stmt>> {
    match all_consuming(terminated(many0(|i| statement(i, 0)), sp))(source) {
        Ok((_, program)) => Ok(program),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(source, &e)),
        Err(nom::Err::Incomplete(_)) => Err(Error::Syntax {
            line: 1,
            column: 1,
            message: "incomplete input".to_string(),
        }),
    }
}

fn syntax_error(source: &str, e: &VerboseError<&str>) -> Error {
    let offset = e
        .errors
        .first()
        .map(|(rest, _)| source.len() - rest.len())
        .unwrap_or(0);
    let consumed = &source[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rfind('\n')
        .map_or(consumed.chars().count(), |nl| consumed[nl + 1..].chars().count())
        + 1;

    let message = e
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(TOO_DEEP) => Some(TOO_DEEP.to_string()),
            VerboseErrorKind::Context(ctx) => Some(format!("expected {ctx}")),
            VerboseErrorKind::Char(c) => Some(format!("expected '{c}'")),
            VerboseErrorKind::Nom(_) => None,
        })
        .unwrap_or_else(|| "unexpected input".to_string());

    Error::Syntax {
        line,
        column,
        message,
    }
}

fn failure<'a, T>(input: &'a str, ctx: &'static str) -> Res<'a, T> {
    Err(nom::Err::Failure(VerboseError::add_context(
        input,
        ctx,
        VerboseError::from_error_kind(input, ErrorKind::Verify),
    )))
}

fn too_deep<T>(input: &str) -> Res<'_, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(TOO_DEEP))],
    }))
}

fn check_depth(input: &str, depth: usize) -> Res<'_, ()> {
    if depth > MAX_DEPTH {
        return too_deep(input);
    }
    Ok((input, ()))
}

// ============================================================================
// Lexical helpers
// ============================================================================

/// Whitespace and comments.
fn sp(input: &str) -> Res<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), take_while(|c| c != '\n'))),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

fn tok<'a>(symbol: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    preceded(sp, tag(symbol))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Identifier start inside `$name` interpolation, where `$` itself is the sigil.
fn is_path_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    preceded(sp, terminated(tag(kw), not(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> Res<'_, String> {
    let (rest, name) = preceded(
        sp,
        recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
    )(input)?;
    if KEYWORDS.contains(&name) {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Tag,
        )));
    }
    Ok((rest, name.to_string()))
}

/// `name(.name)*` following a bare `$` in a double-quoted string.
fn dotted_path(input: &str) -> Res<'_, Expr> {
    fn segment(input: &str) -> Res<'_, &str> {
        recognize(pair(
            satisfy(is_path_start),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        ))(input)
    }

    let (mut rest, name) = segment(input)?;
    let mut expr = Expr::Ident(name.to_string());
    let mut height = 1;
    while let Ok((after, property)) = preceded(char('.'), segment)(rest) {
        height += 1;
        if height > MAX_DEPTH {
            return too_deep(rest);
        }
        expr = Expr::Property(Box::new(expr), property.to_string());
        rest = after;
    }
    Ok((rest, expr))
}

/// Single- or double-quoted string. Double-quoted strings interpolate
/// `${expr}` and `$name.property`; any other `$` is literal.
fn string_literal(input: &str, depth: usize) -> Res<'_, Expr> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => {
            return Err(nom::Err::Error(VerboseError::from_error_kind(
                input,
                ErrorKind::Char,
            )));
        }
    };

    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut rest = &input[1..];
    loop {
        let mut chars = rest.chars();
        let Some(c) = chars.next() else {
            return failure(rest, "closing quote");
        };
        match c {
            c if c == quote => {
                rest = &rest[1..];
                break;
            }
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return failure(rest, "escape sequence");
                };
                lit.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                rest = &rest[1 + escaped.len_utf8()..];
            }
            '$' if quote == '"' && rest[1..].starts_with('{') => {
                if !lit.is_empty() {
                    parts.push(Part::Lit(std::mem::take(&mut lit)));
                }
                let (after, inner) =
                    cut(terminated(|i| expr(i, depth + 1), tok("}")))(&rest[2..])?;
                parts.push(Part::Expr(inner));
                rest = after;
            }
            '$' if quote == '"' && rest[1..].starts_with(is_path_start) => {
                if !lit.is_empty() {
                    parts.push(Part::Lit(std::mem::take(&mut lit)));
                }
                let (after, path) = dotted_path(&rest[1..])?;
                parts.push(Part::Expr(path));
                rest = after;
            }
            c => {
                lit.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if parts.is_empty() {
        return Ok((rest, Expr::Str(lit)));
    }
    if !lit.is_empty() {
        parts.push(Part::Lit(lit));
    }
    Ok((rest, Expr::Template(parts)))
}

// ============================================================================
// Statements
// ============================================================================

fn statement(input: &str, depth: usize) -> Res<'_, Stmt> {
    let (input, stmt) = alt((
        |i| return_stmt(i, depth),
        |i| if_stmt(i, depth),
        |i| def_stmt(i, depth),
        map(|i| expr(i, depth), Stmt::Expr),
    ))(input)?;
    let (input, _) = opt(tok(";"))(input)?;
    Ok((input, stmt))
}

fn return_stmt(input: &str, depth: usize) -> Res<'_, Stmt> {
    map(preceded(keyword("return"), opt(|i| expr(i, depth))), Stmt::Return)(input)
}

fn def_stmt(input: &str, depth: usize) -> Res<'_, Stmt> {
    let (input, _) = keyword("def")(input)?;
    let (input, (name, value)) = cut(pair(
        context("variable name", identifier),
        preceded(
            terminated(tok("="), not(char('='))),
            context("expression", |i| expr(i, depth)),
        ),
    ))(input)?;
    Ok((input, Stmt::Def { name, value }))
}

fn if_stmt(input: &str, depth: usize) -> Res<'_, Stmt> {
    let (input, _) = keyword("if")(input)?;
    let (input, ()) = check_depth(input, depth + 1)?;
    let (input, cond) = cut(delimited(
        context("'('", tok("(")),
        context("condition", |i| expr(i, depth + 1)),
        context("')'", tok(")")),
    ))(input)?;
    let (input, then) = cut(|i| body(i, depth + 1))(input)?;
    let (input, otherwise) = opt(preceded(
        keyword("else"),
        cut(alt((
            map(|i| if_stmt(i, depth + 1), |s| vec![s]),
            |i| body(i, depth + 1),
        ))),
    ))(input)?;
    Ok((
        input,
        Stmt::If {
            cond,
            then,
            otherwise,
        },
    ))
}

fn body(input: &str, depth: usize) -> Res<'_, Vec<Stmt>> {
    alt((
        delimited(
            tok("{"),
            many0(|i| statement(i, depth)),
            cut(context("'}'", tok("}"))),
        ),
        map(|i| statement(i, depth), |s| vec![s]),
    ))(input)
}

// ============================================================================
// Expressions
// ============================================================================

pub(crate) fn expr(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, ()) = check_depth(input, depth)?;
    ternary(input, depth)
}

fn ternary(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, cond) = or_expr(input, depth)?;
    let (input, tail) = opt(alt((
        map(preceded(tok("?:"), cut(|i| expr(i, depth + 1))), |fallback| {
            (None::<Expr>, fallback)
        }),
        map(
            preceded(
                tok("?"),
                cut(pair(
                    |i| expr(i, depth + 1),
                    preceded(context("':'", tok(":")), |i| expr(i, depth + 1)),
                )),
            ),
            |(then, otherwise)| (Some(then), otherwise),
        ),
    )))(input)?;

    let expr = match tail {
        None => cond,
        Some((None, fallback)) => Expr::Elvis(Box::new(cond), Box::new(fallback)),
        Some((Some(then), otherwise)) => {
            Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise))
        }
    };
    Ok((input, expr))
}

fn binary_chain<'a>(
    input: &'a str,
    depth: usize,
    symbol: &'static str,
    op: BinOp,
    operand: fn(&'a str, usize) -> Res<'a, Expr>,
) -> Res<'a, Expr> {
    let (input, first) = operand(input, depth)?;
    let (input, rest) = many0(preceded(
        tok(symbol),
        cut(context("operand", |i| operand(i, depth))),
    ))(input)?;

    let mut height = first.height();
    let mut expr = first;
    for rhs in rest {
        height = 1 + height.max(rhs.height());
        if height > MAX_DEPTH {
            return too_deep(input);
        }
        expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
    }
    Ok((input, expr))
}

fn or_expr(input: &str, depth: usize) -> Res<'_, Expr> {
    binary_chain(input, depth, "||", BinOp::Or, and_expr)
}

fn and_expr(input: &str, depth: usize) -> Res<'_, Expr> {
    binary_chain(input, depth, "&&", BinOp::And, equality)
}

fn equality(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, lhs) = additive(input, depth)?;
    let (input, rhs) = opt(pair(
        alt((value(BinOp::Eq, tok("==")), value(BinOp::Ne, tok("!=")))),
        cut(context("operand", |i| additive(i, depth))),
    ))(input)?;
    let expr = match rhs {
        Some((op, rhs)) => Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
        None => lhs,
    };
    Ok((input, expr))
}

fn additive(input: &str, depth: usize) -> Res<'_, Expr> {
    binary_chain(input, depth, "+", BinOp::Concat, unary)
}

fn unary(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, ()) = check_depth(input, depth)?;
    alt((
        map(
            preceded(
                terminated(tok("!"), not(char('='))),
                cut(|i| unary(i, depth + 1)),
            ),
            |inner| Expr::Not(Box::new(inner)),
        ),
        |i| postfix(i, depth),
    ))(input)
}

fn call_args(input: &str, depth: usize) -> Res<'_, Vec<Expr>> {
    delimited(
        tok("("),
        separated_list0(tok(","), |i| expr(i, depth + 1)),
        cut(context("')'", tok(")"))),
    )(input)
}

fn postfix(input: &str, depth: usize) -> Res<'_, Expr> {
    let (mut input, mut expr) = primary(input, depth)?;
    let mut height = expr.height();
    loop {
        if height > MAX_DEPTH {
            return too_deep(input);
        }

        match preceded(tok("."), cut(context("property name", identifier)))(input) {
            Ok((rest, name)) => {
                let (rest, args) = opt(|i| call_args(i, depth))(rest)?;
                expr = match args {
                    Some(args) => {
                        let widest = args.iter().map(Expr::height).max().unwrap_or(0);
                        height = 1 + height.max(widest);
                        Expr::Method {
                            target: Box::new(expr),
                            name,
                            args,
                        }
                    }
                    None => {
                        height += 1;
                        Expr::Property(Box::new(expr), name)
                    }
                };
                input = rest;
                continue;
            }
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }

        match preceded(
            tok("["),
            cut(terminated(|i| self::expr(i, depth + 1), context("']'", tok("]")))),
        )(input)
        {
            Ok((rest, index)) => {
                height = 1 + height.max(index.height());
                expr = Expr::Index(Box::new(expr), Box::new(index));
                input = rest;
                continue;
            }
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }

        return Ok((input, expr));
    }
}

fn primary(input: &str, depth: usize) -> Res<'_, Expr> {
    context(
        "expression",
        alt((
            value(Expr::Null, keyword("null")),
            value(Expr::Bool(true), keyword("true")),
            value(Expr::Bool(false), keyword("false")),
            preceded(sp, |i| string_literal(i, depth)),
            delimited(
                tok("("),
                cut(|i| expr(i, depth + 1)),
                cut(context("')'", tok(")"))),
            ),
            |i| call_or_ident(i, depth),
        )),
    )(input)
}

fn call_or_ident(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(|i| call_args(i, depth))(input)?;
    let expr = match args {
        Some(args) => Expr::Call { name, args },
        None => Expr::Ident(name),
    };
    Ok((input, expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    fn string(s: &str) -> Box<Expr> {
        Box::new(Expr::Str(s.to_string()))
    }

    #[test]
    fn test_parse_return_string() {
        let program = parse_script("return \"nodeA\";").unwrap();
        assert_eq!(program, vec![Stmt::Return(Some(Expr::Str("nodeA".into())))]);
    }

    #[test]
    fn test_parse_bare_return_and_optional_semicolons() {
        let program = parse_script("return").unwrap();
        assert_eq!(program, vec![Stmt::Return(None)]);

        let program = parse_script("def a = 'x'\nreturn a").unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_parse_if_else_chain() {
        let source = r#"
            if (axisParam == "axis1") {
                return "common1&&common2";
            } else if (axisParam == "axis2") return "test1";
            else {
                return null;
            }
        "#;
        let program = parse_script(source).unwrap();
        let [Stmt::If { cond, then, otherwise: Some(otherwise) }] = program.as_slice() else {
            panic!("expected a single if statement, got {program:?}");
        };
        assert_eq!(
            *cond,
            Expr::Binary(BinOp::Eq, ident("axisParam"), string("axis1"))
        );
        assert_eq!(then.len(), 1);
        assert!(matches!(otherwise.as_slice(), [Stmt::If { .. }]));
    }

    #[test]
    fn test_parse_postfix_chain() {
        let program = parse_script("currentJob.name.toUpperCase()").unwrap();
        assert_eq!(
            program,
            vec![Stmt::Expr(Expr::Method {
                target: Box::new(Expr::Property(ident("currentJob"), "name".into())),
                name: "toUpperCase".into(),
                args: vec![],
            })]
        );

        let program = parse_script("currentJob.combination['axis']").unwrap();
        assert!(matches!(program.as_slice(), [Stmt::Expr(Expr::Index(..))]));
    }

    #[test]
    fn test_parse_precedence() {
        let program = parse_script("a || b && c == 'x' + d").unwrap();
        let expected = Expr::Binary(
            BinOp::Or,
            ident("a"),
            Box::new(Expr::Binary(
                BinOp::And,
                ident("b"),
                Box::new(Expr::Binary(
                    BinOp::Eq,
                    ident("c"),
                    Box::new(Expr::Binary(BinOp::Concat, string("x"), ident("d"))),
                )),
            )),
        );
        assert_eq!(program, vec![Stmt::Expr(expected)]);
    }

    #[test]
    fn test_parse_ternary_and_elvis() {
        let program = parse_script("a ? 'x' : b ?: 'y'").unwrap();
        let expected = Expr::Ternary(
            ident("a"),
            string("x"),
            Box::new(Expr::Elvis(ident("b"), string("y"))),
        );
        assert_eq!(program, vec![Stmt::Expr(expected)]);
    }

    #[test]
    fn test_parse_interpolation() {
        let program = parse_script(r#""${PLATFORM}&&x64""#).unwrap();
        assert_eq!(
            program,
            vec![Stmt::Expr(Expr::Template(vec![
                Part::Expr(Expr::Ident("PLATFORM".into())),
                Part::Lit("&&x64".into()),
            ]))]
        );

        let program = parse_script(r#"'${literal}'"#).unwrap();
        assert_eq!(program, vec![Stmt::Expr(Expr::Str("${literal}".into()))]);
    }

    #[test]
    fn test_parse_dollar_path_interpolation() {
        let program = parse_script(r#""$NODE&&$currentJob.name.""#).unwrap();
        assert_eq!(
            program,
            vec![Stmt::Expr(Expr::Template(vec![
                Part::Expr(Expr::Ident("NODE".into())),
                Part::Lit("&&".into()),
                Part::Expr(Expr::Property(ident("currentJob"), "name".into())),
                Part::Lit(".".into()),
            ]))]
        );

        let program = parse_script(r#""cost: $5 or $""#).unwrap();
        assert_eq!(program, vec![Stmt::Expr(Expr::Str("cost: $5 or $".into()))]);

        let program = parse_script(r#"'$NODE'"#).unwrap();
        assert_eq!(program, vec![Stmt::Expr(Expr::Str("$NODE".into()))]);
    }

    fn too_deep_message(source: &str) -> String {
        match parse_script(source) {
            Err(Error::Syntax { message, .. }) => message,
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let open = format!("return {}", "(".repeat(100_000));
        assert_eq!(too_deep_message(&open), "expression nested too deeply");

        let closed = format!("return {}'a'{};", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(too_deep_message(&closed), "expression nested too deeply");

        let negated = format!("return {}true", "!".repeat(100_000));
        assert_eq!(too_deep_message(&negated), "expression nested too deeply");

        let interpolated = format!("return {}", "\"${".repeat(10_000));
        assert_eq!(too_deep_message(&interpolated), "expression nested too deeply");

        let blocks = "if (a) {".repeat(10_000);
        assert_eq!(too_deep_message(&blocks), "expression nested too deeply");
    }

    #[test]
    fn test_long_chains_rejected() {
        let concat = format!("return {}", vec!["a"; 100_000].join(" + "));
        assert_eq!(too_deep_message(&concat), "expression nested too deeply");

        let access = format!("return a{}", ".b".repeat(100_000));
        assert_eq!(too_deep_message(&access), "expression nested too deeply");

        let path = format!("return \"$a{}\"", ".b".repeat(100_000));
        assert_eq!(too_deep_message(&path), "expression nested too deeply");
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let source = format!("return {}'a'{};", "(".repeat(40), ")".repeat(40));
        assert_eq!(
            parse_script(&source).unwrap(),
            vec![Stmt::Return(Some(Expr::Str("a".into())))]
        );

        let concat = format!("return {}", vec!["a"; 40].join(" + "));
        assert!(parse_script(&concat).is_ok());
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "// pick a node\n/* block\ncomment */ return 'a' // trailing";
        let program = parse_script(source).unwrap();
        assert_eq!(program, vec![Stmt::Return(Some(Expr::Str("a".into())))]);
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        assert!(parse_script("def return = 'x'").is_err());
        let program = parse_script("returnValue").unwrap();
        assert_eq!(program, vec![Stmt::Expr(Expr::Ident("returnValue".into()))]);
    }

    #[test]
    fn test_syntax_error_location() {
        let err = parse_script("def a = 'x'\nreturn \"open").unwrap_err();
        let Error::Syntax { line, message, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(line, 2);
        assert_eq!(message, "expected closing quote");

        assert!(parse_script("if (a { return 'x' }").is_err());
        assert!(parse_script("return 'a' 'b' )").is_err());
    }
}
