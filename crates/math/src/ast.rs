use crate::error::MathError;
use mosaic_value::{Context, Item};

/// Parse tree shared by the LaTeX and ASCII front ends.
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    Int(i64),
    Float(f64),
    Ident(String),
    Text(String),
    /// Placeholder for an absent bound.
    Empty,
    Op { tag: String, args: Vec<MathNode> },
}

impl MathNode {
    pub fn op(tag: impl Into<String>, args: Vec<MathNode>) -> Self {
        MathNode::Op {
            tag: tag.into(),
            args,
        }
    }

    pub fn binary(tag: &str, left: MathNode, right: MathNode) -> Self {
        Self::op(tag, vec![left, right])
    }

    pub fn is_number(&self) -> bool {
        matches!(self, MathNode::Int(_) | MathNode::Float(_))
    }

    /// Unary minus folds into numeric literals.
    pub fn negate(self) -> Self {
        match self {
            MathNode::Int(value) => MathNode::Int(-value),
            MathNode::Float(value) => MathNode::Float(-value),
            other => Self::op("neg", vec![other]),
        }
    }

    /// Builds the item tree: identifiers become symbols, operators become
    /// elements whose children are the operands in order.
    pub fn to_item(&self, ctx: &Context) -> Result<Item, MathError> {
        Ok(match self {
            MathNode::Int(value) => Item::make_int(*value),
            MathNode::Float(value) => ctx.float(*value)?,
            MathNode::Ident(name) => ctx.symbol(name)?,
            MathNode::Text(text) => {
                let mut element = ctx.element("text")?;
                element.child(ctx.string(text)?);
                element.into_item()?
            }
            MathNode::Empty => Item::Null,
            MathNode::Op { tag, args } => {
                let mut element = ctx.element(tag)?;
                for arg in args {
                    element.child(arg.to_item(ctx)?);
                }
                element.into_item()?
            }
        })
    }
}

/// Builds a left-associative chain from a head and `(operator, operand)` pairs.
pub fn fold_left(first: MathNode, rest: Vec<(&'static str, MathNode)>) -> MathNode {
    rest.into_iter()
        .fold(first, |left, (tag, right)| MathNode::binary(tag, left, right))
}
