//! LaTeX math input.
//!
//! Grammar, loosest binding first: relations, `+ - \pm`, `\cdot \times /`
//! and juxtaposition, unary sign, `^`/`_` scripts, primaries. Braces group
//! without leaving a node; `( )`, `[ ]` and `| |` become `paren`,
//! `bracket` and `abs` nodes.

use crate::ast::{MathNode, fold_left};
use crate::error::MathError;
use crate::rules::{self, OpClass};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, char, digit1, multispace1, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};

/// Commands that act as operators and can never start an operand.
const OPERATOR_COMMANDS: &[&str] = &[
    "cdot", "times", "div", "pm", "neq", "ne", "le", "leq", "ge", "geq", "approx", "equiv", "to",
    "rightarrow", "Rightarrow", "implies", "Leftrightarrow", "iff", "in", "right", "end",
];

pub fn parse_latex(source: &str) -> Result<MathNode, MathError> {
    let (lead, body) = strip_delimiters(source);
    if body.trim().is_empty() {
        return Ok(MathNode::Empty);
    }
    match terminated(relation, space).parse(body) {
        Ok(("", node)) => Ok(node),
        Ok((rest, _)) => Err(MathError::syntax(
            lead + body.len() - rest.len(),
            format!("unexpected input '{}'", preview(rest)),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(MathError::syntax(
            lead + body.len() - e.input.len(),
            format!("expected an operand before '{}'", preview(e.input)),
        )),
        Err(nom::Err::Incomplete(_)) => Err(MathError::syntax(source.len(), "incomplete input")),
    }
}

fn preview(rest: &str) -> &str {
    let end = rest
        .char_indices()
        .nth(12)
        .map(|(index, _)| index)
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Removes `$…$`, `$$…$$`, `\[…\]` or `\(…\)`; returns the leading offset.
fn strip_delimiters(source: &str) -> (usize, &str) {
    let trimmed = source.trim();
    let lead = source.len() - source.trim_start().len();
    for (open, close) in [("$$", "$$"), ("$", "$"), ("\\[", "\\]"), ("\\(", "\\)")] {
        if trimmed.len() >= open.len() + close.len()
            && trimmed.starts_with(open)
            && trimmed.ends_with(close)
        {
            let inner = &trimmed[open.len()..trimmed.len() - close.len()];
            return (lead + open.len(), inner);
        }
    }
    (lead, trimmed)
}

fn space(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            multispace1,
            tag("\\,"),
            tag("\\;"),
            tag("\\:"),
            tag("\\!"),
            tag("\\ "),
            cmd("\\qquad"),
            cmd("\\quad"),
        ))),
    )
    .parse(input)
}

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    preceded(space, inner)
}

/// A control word that is not the prefix of a longer one.
fn cmd<'a>(name: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(tag(name), not(satisfy(|c: char| c.is_ascii_alphabetic())))
}

fn fail<T>(input: &str) -> IResult<&str, T> {
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

pub(crate) fn relation(input: &str) -> IResult<&str, MathNode> {
    let (input, first) = additive(input)?;
    let (input, rest) = many0(pair(relation_op, additive)).parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn relation_op(input: &str) -> IResult<&str, &'static str> {
    ws(alt((
        value("neq", alt((cmd("\\neq"), cmd("\\ne"), tag("!=")))),
        value("le", alt((cmd("\\leq"), cmd("\\le"), tag("<=")))),
        value("ge", alt((cmd("\\geq"), cmd("\\ge"), tag(">=")))),
        value("approx", cmd("\\approx")),
        value("equiv", cmd("\\equiv")),
        value("to", alt((cmd("\\to"), cmd("\\rightarrow")))),
        value("implies", alt((cmd("\\Rightarrow"), cmd("\\implies")))),
        value("iff", alt((cmd("\\Leftrightarrow"), cmd("\\iff")))),
        value("in", cmd("\\in")),
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
            value("add", char('+')),
            value("sub", char('-')),
            value("pm", cmd("\\pm")),
        ))),
        multiplicative,
    ))
    .parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn multiplicative_op(input: &str) -> IResult<&str, &'static str> {
    ws(alt((
        value("mul", alt((cmd("\\cdot"), tag("*")))),
        value("times", cmd("\\times")),
        value("div", alt((tag("/"), cmd("\\div")))),
    )))
    .parse(input)
}

fn multiplicative(input: &str) -> IResult<&str, MathNode> {
    let (mut input, mut node) = unary(input)?;
    loop {
        if let Ok((rest, (op, right))) = pair(multiplicative_op, unary).parse(input) {
            node = MathNode::binary(op, node, right);
            input = rest;
            continue;
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
    let (input, sign) = opt(ws(alt((char('-'), char('+'))))).parse(input)?;
    match sign {
        Some('-') => {
            let (input, node) = unary(input)?;
            Ok((input, node.negate()))
        }
        Some(_) => unary(input),
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

/// A script or command argument: a braced group or one token.
fn script(input: &str) -> IResult<&str, MathNode> {
    ws(alt((brace_group, single_token))).parse(input)
}

fn single_token(input: &str) -> IResult<&str, MathNode> {
    alt((
        map(satisfy(|c: char| c.is_ascii_digit()), |c| {
            MathNode::Int(i64::from(c as u8 - b'0'))
        }),
        letter,
        command,
    ))
    .parse(input)
}

fn primary(input: &str) -> IResult<&str, MathNode> {
    alt((
        number,
        letter,
        brace_group,
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
        command,
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

pub(crate) fn number_node(text: &str) -> MathNode {
    if !text.contains('.') {
        if let Ok(value) = text.parse::<i64>() {
            return MathNode::Int(value);
        }
    }
    MathNode::Float(text.parse().unwrap_or(f64::NAN))
}

fn letter(input: &str) -> IResult<&str, MathNode> {
    map(satisfy(|c: char| c.is_ascii_alphabetic()), |c| {
        MathNode::Ident(c.to_string())
    })
    .parse(input)
}

fn brace_group(input: &str) -> IResult<&str, MathNode> {
    delimited(
        char('{'),
        map(opt(relation), |node| node.unwrap_or(MathNode::Empty)),
        ws(char('}')),
    )
    .parse(input)
}

fn braced_text(input: &str) -> IResult<&str, &str> {
    ws(delimited(
        char('{'),
        map(opt(is_not("}")), |text| text.unwrap_or("")),
        char('}'),
    ))
    .parse(input)
}

fn command(input: &str) -> IResult<&str, MathNode> {
    let (rest, name) = preceded(char('\\'), alpha1).parse(input)?;
    if OPERATOR_COMMANDS.contains(&name) {
        return fail(input);
    }
    match name {
        "frac" | "dfrac" | "tfrac" | "binom" => {
            let (rest, (num, den)) = pair(script, script).parse(rest)?;
            let tag = if name == "binom" { "binom" } else { "frac" };
            Ok((rest, MathNode::op(tag, vec![num, den])))
        }
        "sqrt" => {
            let (rest, index) =
                opt(ws(delimited(char('['), relation, ws(char(']'))))).parse(rest)?;
            let (rest, radicand) = script(rest)?;
            Ok((
                rest,
                match index {
                    Some(index) => MathNode::op("root", vec![index, radicand]),
                    None => MathNode::op("sqrt", vec![radicand]),
                },
            ))
        }
        "left" => left_right(rest),
        "text" | "textrm" | "mbox" => {
            let (rest, text) = braced_text(rest)?;
            Ok((rest, MathNode::Text(text.to_string())))
        }
        "mathrm" | "mathit" | "mathbf" | "operatorname" => {
            let (rest, text) = braced_text(rest)?;
            Ok((rest, MathNode::Ident(text.trim().to_string())))
        }
        "overline" | "widehat" | "widetilde" => {
            let (rest, arg) = script(rest)?;
            let tag = match name {
                "overline" => "bar",
                "widehat" => "hat",
                _ => "tilde",
            };
            Ok((rest, MathNode::op(tag, vec![arg])))
        }
        "dots" => Ok((rest, MathNode::op("ldots", Vec::new()))),
        _ => match rules::lookup(name).map(|rule| rule.class) {
            Some(OpClass::Symbol) => Ok((rest, MathNode::op(name, Vec::new()))),
            Some(OpClass::BigOperator) => big_operator(name, rest),
            Some(OpClass::Function) => {
                let (rest, arg) = function_argument(rest)?;
                Ok((rest, MathNode::op(name, vec![arg])))
            }
            Some(OpClass::Template) => {
                let (rest, arg) = script(rest)?;
                Ok((rest, MathNode::op(name, vec![arg])))
            }
            Some(_) => fail(input),
            None => {
                log::debug!("unknown LaTeX command \\{}", name);
                let (rest, args) = many0(ws(brace_group)).parse(rest)?;
                Ok((rest, MathNode::op(name, args)))
            }
        },
    }
}

fn function_argument(input: &str) -> IResult<&str, MathNode> {
    alt((
        delimited(ws(char('(')), relation, ws(char(')'))),
        ws(brace_group),
        postfix,
    ))
    .parse(input)
}

fn left_right(input: &str) -> IResult<&str, MathNode> {
    let (input, open) = ws(alt((char('('), char('['), char('|'), char('.')))).parse(input)?;
    let (input, inner) = relation(input)?;
    let (input, _) = ws(cmd("\\right")).parse(input)?;
    let (input, _) = ws(alt((char(')'), char(']'), char('|'), char('.')))).parse(input)?;
    let node = match open {
        '(' => MathNode::op("paren", vec![inner]),
        '[' => MathNode::op("bracket", vec![inner]),
        '|' => MathNode::op("abs", vec![inner]),
        _ => inner,
    };
    Ok((input, node))
}

/// `\sum_{lower}^{upper} body`; bounds may come in either order.
fn big_operator<'a>(name: &str, input: &'a str) -> IResult<&'a str, MathNode> {
    let mut input = input;
    let mut lower = None;
    let mut upper = None;
    loop {
        if lower.is_none() {
            if let Ok((rest, bound)) = preceded(ws(char('_')), script).parse(input) {
                lower = Some(bound);
                input = rest;
                continue;
            }
        }
        if upper.is_none() {
            if let Ok((rest, bound)) = preceded(ws(char('^')), script).parse(input) {
                upper = Some(bound);
                input = rest;
                continue;
            }
        }
        break;
    }
    let (input, body) = multiplicative(input)?;
    Ok((input, MathNode::op(name, bounds_then_body(lower, upper, body))))
}

pub(crate) fn bounds_then_body(
    lower: Option<MathNode>,
    upper: Option<MathNode>,
    body: MathNode,
) -> Vec<MathNode> {
    let mut args = match (lower, upper) {
        (Some(lower), Some(upper)) => vec![lower, upper],
        (Some(lower), None) => vec![lower],
        (None, Some(upper)) => vec![MathNode::Empty, upper],
        (None, None) => Vec::new(),
    };
    args.push(body);
    args
}
