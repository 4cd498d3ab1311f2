//! Rule-driven math output in five flavors.

use crate::rules::{
    self, OpClass, OperatorRule, PREC_ATOM, PREC_MULTIPLICATIVE, PREC_PREFIX, PREC_SCRIPT,
};
use mosaic_value::{
    DEPTH_SENTINEL, ElementReader, FormatContext, FormatOptions, Item, ItemReader,
};
use std::fmt;
use std::str::FromStr;

const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MathFlavor {
    #[default]
    Latex,
    Typst,
    Ascii,
    MathMl,
    Unicode,
}

impl MathFlavor {
    pub const ALL: [MathFlavor; 5] = [
        MathFlavor::Latex,
        MathFlavor::Typst,
        MathFlavor::Ascii,
        MathFlavor::MathMl,
        MathFlavor::Unicode,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "latex" | "tex" => Some(MathFlavor::Latex),
            "typst" => Some(MathFlavor::Typst),
            "ascii" | "asciimath" => Some(MathFlavor::Ascii),
            "mathml" => Some(MathFlavor::MathMl),
            "unicode" => Some(MathFlavor::Unicode),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MathFlavor::Latex => "latex",
            MathFlavor::Typst => "typst",
            MathFlavor::Ascii => "ascii",
            MathFlavor::MathMl => "mathml",
            MathFlavor::Unicode => "unicode",
        }
    }

    /// Flavors with a parser; the rest are output-only.
    pub fn is_parseable(self) -> bool {
        matches!(self, MathFlavor::Latex | MathFlavor::Ascii)
    }

    fn template(self, rule: &OperatorRule) -> &'static str {
        match self {
            MathFlavor::Latex => rule.latex,
            MathFlavor::Typst => rule.typst,
            MathFlavor::Ascii => rule.ascii,
            MathFlavor::MathMl => rule.mathml,
            MathFlavor::Unicode => rule.unicode,
        }
    }
}

impl fmt::Display for MathFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MathFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown math flavor '{}'", s))
    }
}

/// Formats a math tree. MathML output is wrapped in a `<math>` element.
pub fn format_math(item: &Item, flavor: MathFlavor, options: &FormatOptions) -> String {
    let mut out = FormatContext::new(options.clone());
    let body = MathWriter {
        flavor,
        out: &mut out,
    }
    .render(item.reader());
    if flavor == MathFlavor::MathMl {
        out.push_str("<math xmlns=\"");
        out.push_str(MATHML_NS);
        out.push_str("\">");
        out.push_str(&body);
        out.push_str("</math>");
    } else {
        out.push_str(&body);
    }
    out.into_string()
}

fn rule_of(node: ItemReader<'_>) -> Option<&'static OperatorRule> {
    node.as_element().and_then(|element| rules::lookup(element.tag()))
}

fn precedence(node: ItemReader<'_>) -> u8 {
    match node.item() {
        Item::Int(value) | Item::Int64(value) if *value < 0 => PREC_PREFIX,
        Item::Float(value) if *value < 0.0 => PREC_PREFIX,
        Item::Element(_) => rule_of(node).map_or(PREC_ATOM, |rule| rule.precedence),
        _ => PREC_ATOM,
    }
}

fn is_single_digit(node: ItemReader<'_>) -> bool {
    matches!(node.item(), Item::Int(value) if (0..=9).contains(value))
}

fn is_single_char(node: ItemReader<'_>) -> bool {
    is_single_digit(node)
        || matches!(node.item(), Item::Symbol(name) if name.chars().count() == 1)
}

/// Leaves that need no grouping after `^` or `_` in ASCII-like flavors.
fn is_atomic(node: ItemReader<'_>) -> bool {
    match node.item() {
        Item::Int(value) | Item::Int64(value) => *value >= 0,
        Item::Float(value) => *value >= 0.0,
        Item::Symbol(_) | Item::String(_) => true,
        Item::Element(_) => rule_of(node).is_some_and(|rule| rule.class == OpClass::Symbol),
        _ => false,
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn superscript(text: &str) -> Option<String> {
    text.chars()
        .map(|c| {
            Some(match c {
                '0' => '\u{2070}',
                '1' => '\u{b9}',
                '2' => '\u{b2}',
                '3' => '\u{b3}',
                '4'..='9' => char::from_u32(0x2070 + (c as u32 - '0' as u32))?,
                '+' => '\u{207a}',
                '-' | '\u{2212}' => '\u{207b}',
                '=' => '\u{207c}',
                'n' => '\u{207f}',
                'i' => '\u{2071}',
                _ => return None,
            })
        })
        .collect()
}

fn subscript(text: &str) -> Option<String> {
    text.chars()
        .map(|c| match c {
            '0'..='9' => char::from_u32(0x2080 + (c as u32 - '0' as u32)),
            '+' => Some('\u{208a}'),
            '-' | '\u{2212}' => Some('\u{208b}'),
            '=' => Some('\u{208c}'),
            _ => None,
        })
        .collect()
}

struct MathWriter<'c> {
    flavor: MathFlavor,
    out: &'c mut FormatContext,
}

impl MathWriter<'_> {
    fn render(&mut self, node: ItemReader<'_>) -> String {
        if !self.out.enter() {
            return DEPTH_SENTINEL.to_string();
        }
        let text = match node.item() {
            Item::Null => String::new(),
            Item::Int(value) | Item::Int64(value) => self.number(value.to_string()),
            Item::Float(value) => self.number(format!("{:?}", value)),
            Item::Symbol(name) | Item::String(name) => self.identifier(name),
            Item::Element(element) => self.element(ElementReader::new(element)),
            other => other.type_tag().sentinel(),
        };
        self.out.leave();
        text
    }

    fn number(&self, text: String) -> String {
        match self.flavor {
            MathFlavor::MathMl => format!("<mn>{}</mn>", text),
            _ => text,
        }
    }

    fn identifier(&self, name: &str) -> String {
        let single = name.chars().count() == 1;
        match self.flavor {
            MathFlavor::Latex if !single => format!("\\mathrm{{{}}}", name),
            MathFlavor::Typst if !single => format!("\"{}\"", name),
            MathFlavor::MathMl => format!("<mi>{}</mi>", escape_xml(name)),
            _ => name.to_string(),
        }
    }

    fn text(&self, content: &str) -> String {
        match self.flavor {
            MathFlavor::Latex => format!("\\text{{{}}}", content),
            MathFlavor::Typst | MathFlavor::Ascii => format!("\"{}\"", content),
            MathFlavor::MathMl => format!("<mtext>{}</mtext>", escape_xml(content)),
            MathFlavor::Unicode => content.to_string(),
        }
    }

    fn parens(&self, text: String) -> String {
        match self.flavor {
            MathFlavor::MathMl => format!("<mrow><mo>(</mo>{}<mo>)</mo></mrow>", text),
            _ => format!("({})", text),
        }
    }

    fn element(&mut self, element: ElementReader<'_>) -> String {
        if element.is("text") {
            return self.text(&element.text_content());
        }
        let Some(rule) = rules::lookup(element.tag()) else {
            return self.unknown(element);
        };
        let template = self.flavor.template(rule);
        match rule.class {
            OpClass::Symbol => template.to_string(),
            OpClass::Infix => self.infix(rule, element),
            OpClass::Prefix => {
                let operand = match element.child(0) {
                    Some(child) => self.operand(child, rule.precedence, false),
                    None => String::new(),
                };
                rules::expand(template, &[operand])
            }
            OpClass::Script => self.script(rule, element),
            OpClass::BigOperator => self.big_operator(rule, element),
            OpClass::Function | OpClass::Template => {
                let operands: Vec<String> =
                    element.children().map(|child| self.render(child)).collect();
                rules::expand(template, &operands)
            }
        }
    }

    /// Renders an operand, parenthesized when it binds looser than its
    /// parent. Right operands of left-associative operators are also
    /// parenthesized at equal precedence.
    fn operand(&mut self, child: ItemReader<'_>, parent: u8, right: bool) -> String {
        let text = self.render(child);
        let child_precedence = precedence(child);
        if child_precedence < parent || (right && child_precedence == parent) {
            self.parens(text)
        } else {
            text
        }
    }

    fn infix(&mut self, rule: &OperatorRule, element: ElementReader<'_>) -> String {
        let children: Vec<ItemReader<'_>> = element.children().collect();
        let Some((first, rest)) = children.split_first() else {
            return String::new();
        };
        let template = self.flavor.template(rule);
        let mut acc = self.operand(*first, rule.precedence, false);
        for child in rest {
            let right = self.operand(*child, rule.precedence, true);
            acc = rules::expand(template, &[acc, right]);
        }
        acc
    }

    fn script(&mut self, rule: &OperatorRule, element: ElementReader<'_>) -> String {
        let (Some(base), Some(script)) = (element.child(0), element.child(1)) else {
            return self.unknown(element);
        };
        let is_pow = rule.tag == "pow";
        let base_rule = rule_of(base);
        let base_text = self.render(base);
        let base_text = match self.flavor {
            MathFlavor::Latex => {
                let braces = base_rule.is_some_and(|r| {
                    r.needs_braces && !(is_pow && r.tag == "subscript")
                });
                if braces {
                    format!("{{{}}}", base_text)
                } else if precedence(base) < PREC_SCRIPT {
                    self.parens(base_text)
                } else {
                    base_text
                }
            }
            _ => {
                let group = base_rule.is_some_and(|r| {
                    r.tag == rule.tag || (r.needs_braces && r.class != OpClass::Script)
                });
                if group || precedence(base) < PREC_SCRIPT {
                    self.parens(base_text)
                } else {
                    base_text
                }
            }
        };

        let script_text = self.render(script);
        let mark = if is_pow { '^' } else { '_' };
        match self.flavor {
            MathFlavor::Latex => {
                let compact = if is_pow {
                    is_single_digit(script)
                } else {
                    is_single_char(script)
                };
                if compact {
                    format!("{}{}{}", base_text, mark, script_text)
                } else {
                    format!("{}{}{{{}}}", base_text, mark, script_text)
                }
            }
            MathFlavor::MathMl => rules::expand(rule.mathml, &[base_text, script_text]),
            MathFlavor::Unicode => {
                let converted = if is_pow {
                    superscript(&script_text)
                } else {
                    subscript(&script_text)
                };
                match converted {
                    Some(small) => format!("{}{}", base_text, small),
                    None => self.grouped_script(base_text, mark, script, script_text),
                }
            }
            MathFlavor::Ascii | MathFlavor::Typst => {
                self.grouped_script(base_text, mark, script, script_text)
            }
        }
    }

    fn grouped_script(
        &self,
        base: String,
        mark: char,
        script: ItemReader<'_>,
        text: String,
    ) -> String {
        if is_atomic(script) {
            format!("{}{}{}", base, mark, text)
        } else {
            format!("{}{}({})", base, mark, text)
        }
    }

    fn big_operator(&mut self, rule: &OperatorRule, element: ElementReader<'_>) -> String {
        let children: Vec<ItemReader<'_>> = element.children().collect();
        let (lower, upper, body) = match children.as_slice() {
            [] => (None, None, None),
            [body] => (None, None, Some(*body)),
            [lower, body] => (Some(*lower), None, Some(*body)),
            [lower, upper, .., body] => (Some(*lower), Some(*upper), Some(*body)),
        };
        let lower = lower.filter(|node| !node.is_null());
        let upper = upper.filter(|node| !node.is_null());

        let body_text = match body {
            Some(body) => {
                let text = self.render(body);
                let nested = rule_of(body).is_some_and(|r| r.class == OpClass::BigOperator);
                if precedence(body) < PREC_MULTIPLICATIVE && !nested {
                    self.parens(text)
                } else {
                    text
                }
            }
            None => String::new(),
        };
        let lower_text = lower.map(|node| (node, self.render(node)));
        let upper_text = upper.map(|node| (node, self.render(node)));
        let symbol = self.flavor.template(rule);

        if self.flavor == MathFlavor::MathMl {
            let head = match (lower_text, upper_text) {
                (Some((_, l)), Some((_, u))) => {
                    format!("<munderover>{}{}{}</munderover>", symbol, l, u)
                }
                (Some((_, l)), None) => format!("<munder>{}{}</munder>", symbol, l),
                (None, Some((_, u))) => format!("<mover>{}{}</mover>", symbol, u),
                (None, None) => symbol.to_string(),
            };
            return format!("<mrow>{}{}</mrow>", head, body_text);
        }

        let mut out = symbol.to_string();
        if let Some((node, text)) = lower_text {
            match self.flavor {
                MathFlavor::Latex if is_single_char(node) => out.push_str(&format!("_{}", text)),
                MathFlavor::Latex => out.push_str(&format!("_{{{}}}", text)),
                _ => out.push_str(&format!("_({})", text)),
            }
        }
        if let Some((node, text)) = upper_text {
            match self.flavor {
                MathFlavor::Latex if is_single_char(node) => out.push_str(&format!("^{}", text)),
                MathFlavor::Latex => out.push_str(&format!("^{{{}}}", text)),
                _ if is_atomic(node) => out.push_str(&format!("^{}", text)),
                _ => out.push_str(&format!("^({})", text)),
            }
        }
        if !body_text.is_empty() {
            out.push(' ');
            out.push_str(&body_text);
        }
        out
    }

    fn unknown(&mut self, element: ElementReader<'_>) -> String {
        log::debug!("no math rule for <{}>; using generic form", element.tag());
        let args: Vec<String> = element.children().map(|child| self.render(child)).collect();
        let tag = element.tag();
        match self.flavor {
            MathFlavor::Latex => format!("\\text{{{}}}({})", tag, args.join(", ")),
            MathFlavor::Typst => format!("op(\"{}\")({})", tag, args.join(", ")),
            MathFlavor::Ascii | MathFlavor::Unicode => format!("{}({})", tag, args.join(", ")),
            MathFlavor::MathMl => format!(
                "<mrow><mi>{}</mi><mo>(</mo>{}<mo>)</mo></mrow>",
                escape_xml(tag),
                args.join("<mo>,</mo>")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MathNode;
    use mosaic_value::Context;

    fn ident(name: &str) -> MathNode {
        MathNode::Ident(name.to_string())
    }

    fn render(node: MathNode, flavor: MathFlavor) -> String {
        let ctx = Context::new();
        let item = node.to_item(&ctx).unwrap();
        format_math(&item, flavor, &FormatOptions::default())
    }

    #[test]
    fn test_lower_precedence_child_is_parenthesized() {
        let tree = MathNode::binary(
            "mul",
            MathNode::binary("add", ident("a"), ident("b")),
            ident("c"),
        );
        assert_eq!(render(tree.clone(), MathFlavor::Latex), "(a + b) \\cdot c");
        assert_eq!(render(tree.clone(), MathFlavor::Ascii), "(a + b) * c");
        assert_eq!(render(tree, MathFlavor::Typst), "(a + b) dot c");
    }

    #[test]
    fn test_exponent_rules() {
        let squared = MathNode::binary(
            "pow",
            MathNode::binary("mul", ident("a"), ident("b")),
            MathNode::Int(2),
        );
        assert_eq!(render(squared.clone(), MathFlavor::Latex), "(a \\cdot b)^2");
        assert_eq!(render(squared, MathFlavor::Unicode), "(a \u{b7} b)\u{b2}");

        let tower = MathNode::binary(
            "pow",
            ident("a"),
            MathNode::binary("pow", ident("b"), ident("c")),
        );
        assert_eq!(render(tower.clone(), MathFlavor::Latex), "a^{b^{c}}");
        assert_eq!(render(tower, MathFlavor::Ascii), "a^(b^c)");

        let left = MathNode::binary(
            "pow",
            MathNode::binary("pow", ident("a"), ident("b")),
            ident("c"),
        );
        assert_eq!(render(left.clone(), MathFlavor::Latex), "{a^{b}}^{c}");
        assert_eq!(render(left, MathFlavor::Ascii), "(a^b)^c");
    }

    #[test]
    fn test_right_operand_of_subtraction() {
        let tree = MathNode::binary(
            "sub",
            ident("a"),
            MathNode::binary("sub", ident("b"), ident("c")),
        );
        assert_eq!(render(tree, MathFlavor::Ascii), "a - (b - c)");
        let chain = MathNode::binary(
            "sub",
            MathNode::binary("sub", ident("a"), ident("b")),
            ident("c"),
        );
        assert_eq!(render(chain, MathFlavor::Ascii), "a - b - c");
    }

    #[test]
    fn test_big_operator_bounds() {
        let tree = MathNode::op(
            "sum",
            vec![
                MathNode::binary("eq", ident("i"), MathNode::Int(1)),
                ident("n"),
                MathNode::binary("pow", ident("i"), MathNode::Int(2)),
            ],
        );
        assert_eq!(render(tree.clone(), MathFlavor::Latex), "\\sum_{i = 1}^n i^2");
        assert_eq!(render(tree.clone(), MathFlavor::Ascii), "sum_(i = 1)^n i^2");
        assert_eq!(
            render(tree, MathFlavor::MathMl),
            "<math xmlns=\"http://www.w3.org/1998/Math/MathML\"><mrow><munderover><mo>\u{2211}</mo>\
             <mrow><mi>i</mi><mo>=</mo><mn>1</mn></mrow><mi>n</mi></munderover>\
             <msup><mi>i</mi><mn>2</mn></msup></mrow></math>"
        );
    }

    #[test]
    fn test_templates_and_symbols() {
        let tree = MathNode::op(
            "frac",
            vec![MathNode::op("alpha", Vec::new()), MathNode::op("sqrt", vec![ident("x")])],
        );
        assert_eq!(render(tree.clone(), MathFlavor::Latex), "\\frac{\\alpha}{\\sqrt{x}}");
        assert_eq!(render(tree.clone(), MathFlavor::Typst), "frac(alpha, sqrt(x))");
        assert_eq!(render(tree, MathFlavor::Unicode), "(\u{3b1})/(\u{221a}(x))");
    }

    #[test]
    fn test_unknown_tag_fallback() {
        let tree = MathNode::op("gcd", vec![ident("a"), ident("b")]);
        assert_eq!(render(tree.clone(), MathFlavor::Latex), "\\text{gcd}(a, b)");
        assert_eq!(render(tree, MathFlavor::Ascii), "gcd(a, b)");
    }

    #[test]
    fn test_depth_guard() {
        let mut node = ident("x");
        for _ in 0..80 {
            node = MathNode::op("paren", vec![node]);
        }
        let out = render(node, MathFlavor::Ascii);
        assert!(out.contains(DEPTH_SENTINEL));
    }

    #[test]
    fn test_flavor_names() {
        for flavor in MathFlavor::ALL {
            assert_eq!(MathFlavor::from_name(flavor.name()), Some(flavor));
        }
        assert!("bogus".parse::<MathFlavor>().is_err());
    }
}
