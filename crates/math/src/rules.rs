//! Operator rule table.
//!
//! One row per math tag. Templates use `{1}`, `{2}`, … as operand
//! placeholders; everything else is copied literally.

use std::collections::HashMap;
use std::sync::LazyLock;

pub const PREC_RELATION: u8 = 10;
pub const PREC_ADDITIVE: u8 = 20;
pub const PREC_BIG_OPERATOR: u8 = 25;
pub const PREC_MULTIPLICATIVE: u8 = 30;
pub const PREC_PREFIX: u8 = 40;
pub const PREC_SCRIPT: u8 = 50;
pub const PREC_ATOM: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Binary operator written between its operands.
    Infix,
    /// Unary operator written before its operand.
    Prefix,
    /// Superscript or subscript: base then script.
    Script,
    /// Bounds first, body last.
    BigOperator,
    /// Named function applied to one argument.
    Function,
    /// Fixed layout such as fractions, roots and groups.
    Template,
    /// Nullary: Greek letters and named constants.
    Symbol,
}

#[derive(Debug, Clone, Copy)]
pub struct OperatorRule {
    pub tag: &'static str,
    pub latex: &'static str,
    pub typst: &'static str,
    pub ascii: &'static str,
    pub mathml: &'static str,
    pub unicode: &'static str,
    pub arity: u8,
    pub is_binary_infix: bool,
    /// LaTeX must brace this node when it is the base of a script.
    pub needs_braces: bool,
    pub precedence: u8,
    pub class: OpClass,
}

macro_rules! infix {
    ($tag:literal, $prec:expr, $latex:literal, $typst:literal, $ascii:literal, $mo:literal, $uni:literal) => {
        OperatorRule {
            tag: $tag,
            latex: concat!("{1} ", $latex, " {2}"),
            typst: concat!("{1} ", $typst, " {2}"),
            ascii: concat!("{1} ", $ascii, " {2}"),
            mathml: concat!("<mrow>{1}<mo>", $mo, "</mo>{2}</mrow>"),
            unicode: concat!("{1} ", $uni, " {2}"),
            arity: 2,
            is_binary_infix: true,
            needs_braces: false,
            precedence: $prec,
            class: OpClass::Infix,
        }
    };
}

macro_rules! template {
    ($tag:literal, $arity:expr, $braces:expr, $latex:literal, $typst:literal, $ascii:literal, $mathml:literal, $uni:literal) => {
        OperatorRule {
            tag: $tag,
            latex: $latex,
            typst: $typst,
            ascii: $ascii,
            mathml: $mathml,
            unicode: $uni,
            arity: $arity,
            is_binary_infix: false,
            needs_braces: $braces,
            precedence: PREC_ATOM,
            class: OpClass::Template,
        }
    };
}

macro_rules! function {
    ($tag:literal) => {
        OperatorRule {
            tag: $tag,
            latex: concat!("\\", $tag, "({1})"),
            typst: concat!($tag, "({1})"),
            ascii: concat!($tag, "({1})"),
            mathml: concat!(
                "<mrow><mi>",
                $tag,
                "</mi><mo>&#x2061;</mo><mrow><mo>(</mo>{1}<mo>)</mo></mrow></mrow>"
            ),
            unicode: concat!($tag, "({1})"),
            arity: 1,
            is_binary_infix: false,
            needs_braces: false,
            precedence: PREC_ATOM,
            class: OpClass::Function,
        }
    };
}

macro_rules! symbol {
    ($tag:literal, $latex:literal, $typst:literal, $ascii:literal, $uni:literal) => {
        OperatorRule {
            tag: $tag,
            latex: $latex,
            typst: $typst,
            ascii: $ascii,
            mathml: concat!("<mi>", $uni, "</mi>"),
            unicode: $uni,
            arity: 0,
            is_binary_infix: false,
            needs_braces: false,
            precedence: PREC_ATOM,
            class: OpClass::Symbol,
        }
    };
    ($tag:literal, $uni:literal) => {
        OperatorRule {
            tag: $tag,
            latex: concat!("\\", $tag),
            typst: $tag,
            ascii: $tag,
            mathml: concat!("<mi>", $uni, "</mi>"),
            unicode: $uni,
            arity: 0,
            is_binary_infix: false,
            needs_braces: false,
            precedence: PREC_ATOM,
            class: OpClass::Symbol,
        }
    };
}

macro_rules! big {
    ($tag:literal, $latex:literal, $typst:literal, $ascii:literal, $uni:literal) => {
        OperatorRule {
            tag: $tag,
            latex: $latex,
            typst: $typst,
            ascii: $ascii,
            mathml: concat!("<mo>", $uni, "</mo>"),
            unicode: $uni,
            arity: 3,
            is_binary_infix: false,
            needs_braces: true,
            precedence: PREC_BIG_OPERATOR,
            class: OpClass::BigOperator,
        }
    };
}

pub static RULES: &[OperatorRule] = &[
    infix!("add", PREC_ADDITIVE, "+", "+", "+", "+", "+"),
    infix!("sub", PREC_ADDITIVE, "-", "-", "-", "-", "\u{2212}"),
    infix!("pm", PREC_ADDITIVE, "\\pm", "plus.minus", "+-", "\u{b1}", "\u{b1}"),
    infix!("mul", PREC_MULTIPLICATIVE, "\\cdot", "dot", "*", "\u{22c5}", "\u{b7}"),
    infix!("times", PREC_MULTIPLICATIVE, "\\times", "times", "xx", "\u{d7}", "\u{d7}"),
    infix!("div", PREC_MULTIPLICATIVE, "/", "/", "/", "/", "/"),
    OperatorRule {
        tag: "implicit_mul",
        latex: "{1} {2}",
        typst: "{1} {2}",
        ascii: "{1} {2}",
        mathml: "<mrow>{1}<mo>&#x2062;</mo>{2}</mrow>",
        unicode: "{1}{2}",
        arity: 2,
        is_binary_infix: true,
        needs_braces: false,
        precedence: PREC_MULTIPLICATIVE,
        class: OpClass::Infix,
    },
    infix!("eq", PREC_RELATION, "=", "=", "=", "=", "="),
    infix!("neq", PREC_RELATION, "\\neq", "!=", "!=", "\u{2260}", "\u{2260}"),
    infix!("lt", PREC_RELATION, "<", "<", "<", "&lt;", "<"),
    infix!("le", PREC_RELATION, "\\leq", "<=", "<=", "\u{2264}", "\u{2264}"),
    infix!("gt", PREC_RELATION, ">", ">", ">", "&gt;", ">"),
    infix!("ge", PREC_RELATION, "\\geq", ">=", ">=", "\u{2265}", "\u{2265}"),
    infix!("approx", PREC_RELATION, "\\approx", "approx", "~~", "\u{2248}", "\u{2248}"),
    infix!("equiv", PREC_RELATION, "\\equiv", "equiv", "-=", "\u{2261}", "\u{2261}"),
    infix!("to", PREC_RELATION, "\\to", "->", "->", "\u{2192}", "\u{2192}"),
    infix!("implies", PREC_RELATION, "\\Rightarrow", "=>", "=>", "\u{21d2}", "\u{21d2}"),
    infix!("iff", PREC_RELATION, "\\Leftrightarrow", "<=>", "<=>", "\u{21d4}", "\u{21d4}"),
    infix!("in", PREC_RELATION, "\\in", "in", "in", "\u{2208}", "\u{2208}"),
    OperatorRule {
        tag: "neg",
        latex: "-{1}",
        typst: "-{1}",
        ascii: "-{1}",
        mathml: "<mrow><mo>-</mo>{1}</mrow>",
        unicode: "\u{2212}{1}",
        arity: 1,
        is_binary_infix: false,
        needs_braces: false,
        precedence: PREC_PREFIX,
        class: OpClass::Prefix,
    },
    OperatorRule {
        tag: "pow",
        latex: "{1}^{{2}}",
        typst: "{1}^({2})",
        ascii: "{1}^({2})",
        mathml: "<msup>{1}{2}</msup>",
        unicode: "{1}^({2})",
        arity: 2,
        is_binary_infix: false,
        needs_braces: true,
        precedence: PREC_SCRIPT,
        class: OpClass::Script,
    },
    OperatorRule {
        tag: "subscript",
        latex: "{1}_{{2}}",
        typst: "{1}_({2})",
        ascii: "{1}_({2})",
        mathml: "<msub>{1}{2}</msub>",
        unicode: "{1}_({2})",
        arity: 2,
        is_binary_infix: false,
        needs_braces: true,
        precedence: PREC_SCRIPT,
        class: OpClass::Script,
    },
    template!(
        "frac",
        2,
        true,
        "\\frac{{1}}{{2}}",
        "frac({1}, {2})",
        "({1})/({2})",
        "<mfrac>{1}{2}</mfrac>",
        "({1})/({2})"
    ),
    template!(
        "binom",
        2,
        true,
        "\\binom{{1}}{{2}}",
        "binom({1}, {2})",
        "binom({1}, {2})",
        "<mrow><mo>(</mo><mfrac linethickness=\"0\">{1}{2}</mfrac><mo>)</mo></mrow>",
        "C({1}, {2})"
    ),
    template!(
        "sqrt",
        1,
        true,
        "\\sqrt{{1}}",
        "sqrt({1})",
        "sqrt({1})",
        "<msqrt>{1}</msqrt>",
        "\u{221a}({1})"
    ),
    template!(
        "root",
        2,
        true,
        "\\sqrt[{1}]{{2}}",
        "root({1}, {2})",
        "root({1})({2})",
        "<mroot>{2}{1}</mroot>",
        "({1})\u{221a}({2})"
    ),
    template!(
        "paren",
        1,
        false,
        "({1})",
        "({1})",
        "({1})",
        "<mrow><mo>(</mo>{1}<mo>)</mo></mrow>",
        "({1})"
    ),
    template!(
        "bracket",
        1,
        false,
        "[{1}]",
        "[{1}]",
        "[{1}]",
        "<mrow><mo>[</mo>{1}<mo>]</mo></mrow>",
        "[{1}]"
    ),
    template!(
        "abs",
        1,
        false,
        "|{1}|",
        "abs({1})",
        "|{1}|",
        "<mrow><mo>|</mo>{1}<mo>|</mo></mrow>",
        "|{1}|"
    ),
    template!(
        "hat",
        1,
        false,
        "\\hat{{1}}",
        "hat({1})",
        "hat({1})",
        "<mover>{1}<mo>^</mo></mover>",
        "{1}\u{302}"
    ),
    template!(
        "bar",
        1,
        false,
        "\\bar{{1}}",
        "overline({1})",
        "bar({1})",
        "<mover>{1}<mo>\u{af}</mo></mover>",
        "{1}\u{304}"
    ),
    template!(
        "vec",
        1,
        false,
        "\\vec{{1}}",
        "arrow({1})",
        "vec({1})",
        "<mover>{1}<mo>\u{2192}</mo></mover>",
        "{1}\u{20d7}"
    ),
    template!(
        "dot",
        1,
        false,
        "\\dot{{1}}",
        "dot({1})",
        "dot({1})",
        "<mover>{1}<mo>\u{2d9}</mo></mover>",
        "{1}\u{307}"
    ),
    template!(
        "tilde",
        1,
        false,
        "\\tilde{{1}}",
        "tilde({1})",
        "tilde({1})",
        "<mover>{1}<mo>~</mo></mover>",
        "{1}\u{303}"
    ),
    big!("sum", "\\sum", "sum", "sum", "\u{2211}"),
    big!("prod", "\\prod", "product", "prod", "\u{220f}"),
    big!("int", "\\int", "integral", "int", "\u{222b}"),
    big!("oint", "\\oint", "integral.cont", "oint", "\u{222e}"),
    big!("lim", "\\lim", "lim", "lim", "lim"),
    function!("sin"),
    function!("cos"),
    function!("tan"),
    function!("sec"),
    function!("csc"),
    function!("cot"),
    function!("arcsin"),
    function!("arccos"),
    function!("arctan"),
    function!("sinh"),
    function!("cosh"),
    function!("tanh"),
    function!("log"),
    function!("ln"),
    function!("exp"),
    function!("det"),
    function!("min"),
    function!("max"),
    symbol!("alpha", "\u{3b1}"),
    symbol!("beta", "\u{3b2}"),
    symbol!("gamma", "\u{3b3}"),
    symbol!("delta", "\u{3b4}"),
    symbol!("epsilon", "\u{3b5}"),
    symbol!("zeta", "\u{3b6}"),
    symbol!("eta", "\u{3b7}"),
    symbol!("theta", "\u{3b8}"),
    symbol!("iota", "\u{3b9}"),
    symbol!("kappa", "\u{3ba}"),
    symbol!("lambda", "\u{3bb}"),
    symbol!("mu", "\u{3bc}"),
    symbol!("nu", "\u{3bd}"),
    symbol!("xi", "\u{3be}"),
    symbol!("pi", "\u{3c0}"),
    symbol!("rho", "\u{3c1}"),
    symbol!("sigma", "\u{3c3}"),
    symbol!("tau", "\u{3c4}"),
    symbol!("upsilon", "\u{3c5}"),
    symbol!("phi", "\u{3c6}"),
    symbol!("chi", "\u{3c7}"),
    symbol!("psi", "\u{3c8}"),
    symbol!("omega", "\u{3c9}"),
    symbol!("Gamma", "\u{393}"),
    symbol!("Delta", "\u{394}"),
    symbol!("Theta", "\u{398}"),
    symbol!("Lambda", "\u{39b}"),
    symbol!("Xi", "\u{39e}"),
    symbol!("Pi", "\u{3a0}"),
    symbol!("Sigma", "\u{3a3}"),
    symbol!("Phi", "\u{3a6}"),
    symbol!("Psi", "\u{3a8}"),
    symbol!("Omega", "\u{3a9}"),
    symbol!("infty", "\\infty", "infinity", "oo", "\u{221e}"),
    symbol!("partial", "\\partial", "diff", "del", "\u{2202}"),
    symbol!("nabla", "\\nabla", "nabla", "grad", "\u{2207}"),
    symbol!("cdots", "\\cdots", "dots.c", "cdots", "\u{22ef}"),
    symbol!("ldots", "\\ldots", "dots", "...", "\u{2026}"),
];

static BY_TAG: LazyLock<HashMap<&'static str, &'static OperatorRule>> =
    LazyLock::new(|| RULES.iter().map(|rule| (rule.tag, rule)).collect());

pub fn lookup(tag: &str) -> Option<&'static OperatorRule> {
    BY_TAG.get(tag).copied()
}

/// Finds the rule whose ASCII spelling is `word`, for keyword scanning.
pub fn lookup_ascii(word: &str) -> Option<&'static OperatorRule> {
    RULES.iter().find(|rule| {
        matches!(
            rule.class,
            OpClass::Symbol | OpClass::Function | OpClass::BigOperator | OpClass::Template
        ) && rule.ascii.split('(').next() == Some(word)
    })
}

/// Expands `{N}` placeholders with the rendered operands.
pub fn expand(template: &str, operands: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + operands.iter().map(String::len).sum::<usize>());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with('}') {
            let index: usize = after[..digits].parse().unwrap_or(0);
            if let Some(operand) = index.checked_sub(1).and_then(|i| operands.get(i)) {
                out.push_str(operand);
            }
            rest = &after[digits + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
