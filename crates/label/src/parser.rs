//! Label expression parser.
//!
//! Precedence, lowest first: `<->`, `->` (right associative), `||`, `&&`,
//! `!`. Atoms are bare words or double-quoted strings.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{char, multispace0, none_of},
    combinator::{all_consuming, cut, map, opt, value},
    error::{ErrorKind, ParseError, VerboseError, VerboseErrorKind, context},
    multi::many0,
    sequence::{delimited, preceded},
};

use crate::expr::RESERVED;
use crate::{Error, Label, Result};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Deepest nesting of parentheses, `!` and `->` the parser descends into.
/// Operator chains are held to the same height.
const MAX_DEPTH: usize = 64;

const TOO_DEEP: &str = "expression nested too deeply";

/// Parse a label expression.
pub fn parse(input: &str) -> Result<Label> {
    if input.trim().is_empty() {
        return Err(Error::Syntax {
            expression: input.to_string(),
            position: 0,
            message: "empty expression".to_string(),
        });
    }

    match all_consuming(delimited(multispace0, |i| iff(i, 0), multispace0))(input) {
        Ok((_, label)) => Ok(label),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(Error::Syntax {
            expression: input.to_string(),
            position: input.len(),
            message: "incomplete input".to_string(),
        }),
    }
}

fn syntax_error(input: &str, e: VerboseError<&str>) -> Error {
    let position = e
        .errors
        .first()
        .map(|(rest, _)| input.len() - rest.len())
        .unwrap_or(0);
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
        expression: input.to_string(),
        position,
        message,
    }
}

fn too_deep<T>(input: &str) -> Res<'_, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(TOO_DEEP))],
    }))
}

fn op<'a>(symbol: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    delimited(multispace0, tag(symbol), multispace0)
}

/// Left-fold a chain of operands, refusing trees taller than [`MAX_DEPTH`].
fn fold_chain<'a>(
    input: &'a str,
    first: Label,
    rest: Vec<Label>,
    node: fn(Box<Label>, Box<Label>) -> Label,
) -> Res<'a, Label> {
    let mut height = first.height();
    let mut label = first;
    for rhs in rest {
        height = 1 + height.max(rhs.height());
        if height > MAX_DEPTH {
            return too_deep(input);
        }
        label = node(Box::new(label), Box::new(rhs));
    }
    Ok((input, label))
}

fn iff(input: &str, depth: usize) -> Res<'_, Label> {
    let (input, first) = implies(input, depth)?;
    let (input, rest) = many0(preceded(
        op("<->"),
        cut(context("operand", |i| implies(i, depth))),
    ))(input)?;
    fold_chain(input, first, rest, Label::Iff)
}

fn implies(input: &str, depth: usize) -> Res<'_, Label> {
    if depth > MAX_DEPTH {
        return too_deep(input);
    }
    let (input, lhs) = or(input, depth)?;
    let (input, rhs) = opt(preceded(
        op("->"),
        cut(context("operand", |i| implies(i, depth + 1))),
    ))(input)?;
    let label = match rhs {
        Some(rhs) => Label::Implies(Box::new(lhs), Box::new(rhs)),
        None => lhs,
    };
    Ok((input, label))
}

fn or(input: &str, depth: usize) -> Res<'_, Label> {
    let (input, first) = and(input, depth)?;
    let (input, rest) = many0(preceded(op("||"), cut(context("operand", |i| and(i, depth)))))(input)?;
    fold_chain(input, first, rest, Label::Or)
}

fn and(input: &str, depth: usize) -> Res<'_, Label> {
    let (input, first) = not(input, depth)?;
    let (input, rest) = many0(preceded(op("&&"), cut(context("operand", |i| not(i, depth)))))(input)?;
    fold_chain(input, first, rest, Label::And)
}

fn not(input: &str, depth: usize) -> Res<'_, Label> {
    if depth > MAX_DEPTH {
        return too_deep(input);
    }
    alt((
        map(
            preceded(
                delimited(multispace0, char('!'), multispace0),
                cut(context("operand", |i| not(i, depth + 1))),
            ),
            |inner| Label::Not(Box::new(inner)),
        ),
        |i| primary(i, depth),
    ))(input)
}

fn primary(input: &str, depth: usize) -> Res<'_, Label> {
    let (input, _) = multispace0(input)?;
    alt((
        delimited(
            char('('),
            cut(delimited(multispace0, |i| iff(i, depth + 1), multispace0)),
            cut(context("closing parenthesis", char(')'))),
        ),
        map(quoted_atom, Label::Atom),
        map(context("label atom", bare_atom), |name| {
            Label::Atom(name.to_string())
        }),
    ))(input)
}

fn quoted_atom(input: &str) -> Res<'_, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        cut(context("closing quote", char('"'))),
    )(input)
}

/// A run of characters up to whitespace, a reserved character, or `->`.
fn bare_atom(input: &str) -> Res<'_, &str> {
    let mut end = 0;
    for (i, c) in input.char_indices() {
        if c.is_whitespace() || RESERVED.contains(&c) {
            break;
        }
        if c == '-' && input[i + 1..].starts_with('>') {
            break;
        }
        end = i + c.len_utf8();
    }

    if end == 0 {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::TakeWhile1,
        )));
    }
    Ok((&input[end..], &input[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str) -> Box<Label> {
        Box::new(Label::atom(name))
    }

    #[test]
    fn test_parse_single_atom() {
        assert_eq!(parse("nodeA").unwrap(), Label::atom("nodeA"));
        assert_eq!(parse("  nodeA  ").unwrap(), Label::atom("nodeA"));
    }

    #[test]
    fn test_parse_conjunction_with_and_without_spaces() {
        let expected = Label::And(atom("common1"), atom("common2"));
        assert_eq!(parse("common1&&common2").unwrap(), expected);
        assert_eq!(parse("common1 && common2").unwrap(), expected);
    }

    #[test]
    fn test_precedence() {
        let parsed = parse("a || b && !c").unwrap();
        assert_eq!(
            parsed,
            Label::Or(atom("a"), Box::new(Label::And(atom("b"), Box::new(Label::Not(atom("c"))))))
        );

        let parsed = parse("a -> b -> c").unwrap();
        assert_eq!(
            parsed,
            Label::Implies(atom("a"), Box::new(Label::Implies(atom("b"), atom("c"))))
        );

        let parsed = parse("a <-> b || c").unwrap();
        assert_eq!(parsed, Label::Iff(atom("a"), Box::new(Label::Or(atom("b"), atom("c")))));
    }

    #[test]
    fn test_parentheses() {
        let parsed = parse("(a || b) && c").unwrap();
        assert_eq!(parsed, Label::And(Box::new(Label::Or(atom("a"), atom("b"))), atom("c")));
        assert_eq!(parsed.to_string(), "(a||b)&&c");
    }

    #[test]
    fn test_hyphenated_atoms_and_arrows() {
        assert_eq!(parse("linux-x64").unwrap(), Label::atom("linux-x64"));
        assert_eq!(parse("linux->x64").unwrap(), Label::Implies(atom("linux"), atom("x64")));
        assert_eq!(parse("a<->b").unwrap(), Label::Iff(atom("a"), atom("b")));
    }

    #[test]
    fn test_quoted_atoms() {
        assert_eq!(parse("\"linux x64\"").unwrap(), Label::atom("linux x64"));
        assert_eq!(parse(r#""say \"hi\"""#).unwrap(), Label::atom("say \"hi\""));
        assert_eq!(
            parse("\"a b\" && c").unwrap(),
            Label::And(atom("a b"), atom("c"))
        );
    }

    #[test]
    fn test_display_round_trip() {
        for source in ["a&&b||c", "!(a||b)", "a->b->c", "(a->b)->c", "\"x y\"&&z"] {
            let label = parse(source).unwrap();
            assert_eq!(parse(&label.to_string()).unwrap(), label, "{source}");
        }
    }

    #[test]
    fn test_blank_is_error() {
        assert!(matches!(parse(""), Err(Error::Syntax { .. })));
        assert!(matches!(parse("   "), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["a &&", "(a", "a b", "&& a", "!", "\"open", "a )"] {
            assert!(parse(source).is_err(), "{source} should not parse");
        }
    }

    #[test]
    fn test_deep_parentheses_rejected() {
        let source = "(".repeat(100_000);
        let Err(Error::Syntax { message, .. }) = parse(&source) else {
            panic!("expected syntax error");
        };
        assert_eq!(message, "expression nested too deeply");

        let closed = format!("{}a{}", "(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(parse(&closed), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_deep_negation_and_implication_rejected() {
        let negations = format!("{}a", "!".repeat(100_000));
        assert!(matches!(parse(&negations), Err(Error::Syntax { .. })));

        let arrows = vec!["a"; 10_000].join("->");
        assert!(matches!(parse(&arrows), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_long_chain_rejected() {
        let chain = vec!["a"; 100_000].join("&&");
        let Err(Error::Syntax { message, .. }) = parse(&chain) else {
            panic!("expected syntax error");
        };
        assert_eq!(message, "expression nested too deeply");
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let source = format!("{}a{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse(&source).unwrap(), Label::atom("a"));

        let chain = vec!["a"; 40].join("||");
        assert_eq!(parse(&chain).unwrap().height(), 40);
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let Err(Error::Syntax { position, expression, .. }) = parse("a b") else {
            panic!("expected syntax error");
        };
        assert_eq!(expression, "a b");
        assert_eq!(position, 2);
    }
}
