//! AsciiMath-style input: `sum_(i=1)^n i^2`, `sqrt(x)`, `a/b`, `x->0`.
//!
//! Parentheses directly after `^`, `_` or a function name only group;
//! anywhere else they produce a `paren` node.

use crate::ast::{MathNode, fold_left};
use crate::error::MathError;
use crate::latex::{bounds_then_body, number_node};
use crate::rules::{self, OpClass};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};

pub fn parse_ascii(source: &str) -> Result<MathNode, MathError> {
    if source.trim().is_empty() {
        return Ok(MathNode::Empty);
    }
    match terminated(relation, multispace0).parse(source) {
        Ok(("", node)) => Ok(node),
        Ok((rest, _)) => Err(MathError::syntax(
            source.len() - rest.len(),
            format!("unexpected input '{}'", rest.chars().take(12).collect::<String>()),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(MathError::syntax(
            source.len() - e.input.len(),
            "expected an operand",
        )),
        Err(nom::Err::Incomplete(_)) => Err(MathError::syntax(source.len(), "incomplete input")),
    }
}

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    preceded(multispace0, inner)
}

fn word<'a>(name: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(tag(name), not(satisfy(|c: char| c.is_ascii_alphabetic())))
}

fn relation(input: &str) -> IResult<&str, MathNode> {
    let (input, first) = additive(input)?;
    let (input, rest) = many0(pair(relation_op, additive)).parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn relation_op(input: &str) -> IResult<&str, &'static str> {
    ws(alt((
        value("iff", tag("<=>")),
        value("implies", tag("=>")),
        value("to", tag("->")),
        value("neq", tag("!=")),
        value("le", tag("<=")),
        value("ge", tag(">=")),
        value("approx", tag("~~")),
        value("equiv", tag("-=")),
        value("in", word("in")),
        value("eq", char('=')),
        value("lt", char('<')),
        value("gt", char('>')),
    )))
    .parse(input)
}

fn additive(input: &str) -> IResult<&str, MathNode> {
    let (input, first) = multiplicative(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value("pm", tag("+-")),
            value("add", char('+')),
            value("sub", terminated(char('-'), not(alt((char('>'), char('=')))))),
        ))),
        multiplicative,
    ))
    .parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn multiplicative_op(input: &str) -> IResult<&str, &'static str> {
    ws(alt((
        value("times", word("xx")),
        value("mul", char('*')),
        value("div", char('/')),
    )))
    .parse(input)
}

/// Words that continue an expression as operators, never as operands.
fn infix_word(input: &str) -> IResult<&str, &str> {
    ws(alt((word("in"), word("xx")))).parse(input)
}

fn multiplicative(input: &str) -> IResult<&str, MathNode> {
    let (mut input, mut node) = unary(input)?;
    loop {
        if let Ok((rest, (op, right))) = pair(multiplicative_op, unary).parse(input) {
            node = MathNode::binary(op, node, right);
            input = rest;
            continue;
        }
        if infix_word(input).is_ok() {
            break;
        }
        match postfix(input) {
            Ok((rest, right)) => {
                node = MathNode::binary("implicit_mul", node, right);
                input = rest;
            }
            Err(_) => break,
        }
    }
    Ok((input, node))
}

fn unary(input: &str) -> IResult<&str, MathNode> {
    let (input, sign) = opt(ws(char('-'))).parse(input)?;
    match sign {
        Some(_) => {
            let (input, node) = unary(input)?;
            Ok((input, node.negate()))
        }
        None => postfix(input),
    }
}

fn postfix(input: &str) -> IResult<&str, MathNode> {
    let (mut input, mut node) = ws(primary).parse(input)?;
    loop {
        if let Ok((rest, script)) = preceded(ws(char('^')), script).parse(input) {
            node = MathNode::binary("pow", node, script);
            input = rest;
        } else if let Ok((rest, script)) = preceded(ws(char('_')), script).parse(input) {
            node = MathNode::binary("subscript", node, script);
            input = rest;
        } else {
            break;
        }
    }
    Ok((input, node))
}

fn group(input: &str) -> IResult<&str, MathNode> {
    delimited(ws(char('(')), relation, ws(char(')'))).parse(input)
}

fn script(input: &str) -> IResult<&str, MathNode> {
    alt((
        group,
        map(preceded(ws(char('-')), ws(number)), MathNode::negate),
        ws(primary),
    ))
    .parse(input)
}

fn primary(input: &str) -> IResult<&str, MathNode> {
    alt((
        number,
        map(tag("..."), |_| MathNode::op("ldots", Vec::new())),
        map(delimited(char('"'), opt(is_not("\"")), char('"')), |text| {
            MathNode::Text(text.unwrap_or("").to_string())
        }),
        map(
            delimited(char('('), relation, ws(char(')'))),
            |inner| MathNode::op("paren", vec![inner]),
        ),
        map(
            delimited(char('['), relation, ws(char(']'))),
            |inner| MathNode::op("bracket", vec![inner]),
        ),
        map(
            delimited(char('|'), relation, ws(char('|'))),
            |inner| MathNode::op("abs", vec![inner]),
        ),
        keyword,
        map(satisfy(|c: char| c.is_ascii_alphabetic()), |c| {
            MathNode::Ident(c.to_string())
        }),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, MathNode> {
    map(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        number_node,
    )
    .parse(input)
}

/// Symbols, functions and layout words; unknown letter runs fall through
/// to single-letter identifiers.
fn keyword(input: &str) -> IResult<&str, MathNode> {
    let (rest, name) = take_while1(|c: char| c.is_ascii_alphabetic()).parse(input)?;
    let Some(rule) = rules::lookup_ascii(name) else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    };
    let tag = rule.tag;
    match rule.class {
        OpClass::Symbol => Ok((rest, MathNode::op(tag, Vec::new()))),
        OpClass::Function => {
            let (rest, arg) = alt((group, postfix)).parse(rest)?;
            Ok((rest, MathNode::op(tag, vec![arg])))
        }
        OpClass::BigOperator => big_operator(tag, rest),
        OpClass::Template if tag == "root" => {
            let (rest, (index, radicand)) = pair(group, group).parse(rest)?;
            Ok((rest, MathNode::op(tag, vec![index, radicand])))
        }
        OpClass::Template if tag == "binom" => {
            let (rest, (top, bottom)) = delimited(
                ws(char('(')),
                separated_pair(relation, ws(char(',')), relation),
                ws(char(')')),
            )
            .parse(rest)?;
            Ok((rest, MathNode::op(tag, vec![top, bottom])))
        }
        OpClass::Template => {
            let (rest, arg) = alt((group, postfix)).parse(rest)?;
            Ok((rest, MathNode::op(tag, vec![arg])))
        }
        _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Tag))),
    }
}

fn big_operator<'a>(tag: &str, input: &'a str) -> IResult<&'a str, MathNode> {
    let (input, lower) = opt(preceded(ws(char('_')), script)).parse(input)?;
    let (input, upper) = opt(preceded(ws(char('^')), script)).parse(input)?;
    let (input, body) = multiplicative(input)?;
    Ok((input, MathNode::op(tag, bounds_then_body(lower, upper, body))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> MathNode {
        MathNode::Ident(name.to_string())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            parse_ascii("(a + b) * c").unwrap(),
            MathNode::binary(
                "mul",
                MathNode::op("paren", vec![MathNode::binary("add", ident("a"), ident("b"))]),
                ident("c")
            )
        );
        assert_eq!(
            parse_ascii("a/b").unwrap(),
            MathNode::binary("div", ident("a"), ident("b"))
        );
    }

    #[test]
    fn test_script_groups_are_transparent() {
        assert_eq!(
            parse_ascii("a^(b+c)").unwrap(),
            MathNode::binary(
                "pow",
                ident("a"),
                MathNode::binary("add", ident("b"), ident("c"))
            )
        );
        assert_eq!(
            parse_ascii("x^-1").unwrap(),
            MathNode::binary("pow", ident("x"), MathNode::Int(-1))
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            parse_ascii("sin(x) + alpha").unwrap(),
            MathNode::binary(
                "add",
                MathNode::op("sin", vec![ident("x")]),
                MathNode::op("alpha", Vec::new())
            )
        );
        assert_eq!(
            parse_ascii("sqrt(2)").unwrap(),
            MathNode::op("sqrt", vec![MathNode::Int(2)])
        );
        assert_eq!(
            parse_ascii("x -> oo").unwrap(),
            MathNode::binary("to", ident("x"), MathNode::op("infty", Vec::new()))
        );
    }

    #[test]
    fn test_sum_bounds() {
        assert_eq!(
            parse_ascii("sum_(i=1)^n i").unwrap(),
            MathNode::op(
                "sum",
                vec![
                    MathNode::binary("eq", ident("i"), MathNode::Int(1)),
                    ident("n"),
                    ident("i"),
                ]
            )
        );
    }

    #[test]
    fn test_in_is_a_relation() {
        assert_eq!(
            parse_ascii("x in A").unwrap(),
            MathNode::binary("in", ident("x"), ident("A"))
        );
        assert_eq!(
            parse_ascii("xy").unwrap(),
            MathNode::binary("implicit_mul", ident("x"), ident("y"))
        );
    }
}
