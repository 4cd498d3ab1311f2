//! The tagged value.

use crate::element::Element;
use crate::error::{Diagnostic, ErrorKind, ValueError};
use crate::list::{Array, List};
use crate::map::Map;
use crate::name_pool::NamePool;
use crate::pool::Pool;
use crate::reader::ItemReader;
use crate::string::Str;
use crate::tag::TypeTag;
use mosaic_datetime::DateTime;
use std::fmt;
use std::rc::Rc;

pub const INT56_MIN: i64 = -(1 << 55);
pub const INT56_MAX: i64 = (1 << 55) - 1;

/// Every value in the runtime.
///
/// Scalars are stored inline; everything else is a reference-counted handle
/// whose clone is a retain.
#[derive(Clone, Default)]
pub enum Item {
    #[default]
    Null,
    Error(Rc<Diagnostic>),
    Bool(bool),
    /// Signed integer within [`INT56_MIN`]..=[`INT56_MAX`].
    Int(i64),
    Int64(i64),
    Float(f64),
    String(Str),
    Symbol(Str),
    Binary(Rc<[u8]>),
    DateTime(DateTime),
    List(List),
    Array(Array),
    Map(Map),
    Element(Element),
    /// A type used as a value.
    Type(TypeTag),
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $tag:ident, $ty:ty) => {
        pub fn $name(&self) -> Result<$ty, ValueError> {
            match self {
                Item::$variant(value) => Ok(value),
                other => Err(ValueError::mismatch(TypeTag::$tag, other.type_tag())),
            }
        }
    };
}

impl Item {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Item::Null => TypeTag::Null,
            Item::Error(_) => TypeTag::Error,
            Item::Bool(_) => TypeTag::Bool,
            Item::Int(_) => TypeTag::Int,
            Item::Int64(_) => TypeTag::Int64,
            Item::Float(_) => TypeTag::Float,
            Item::String(_) => TypeTag::String,
            Item::Symbol(_) => TypeTag::Symbol,
            Item::Binary(_) => TypeTag::Binary,
            Item::DateTime(_) => TypeTag::DateTime,
            Item::List(_) => TypeTag::List,
            Item::Array(_) => TypeTag::Array,
            Item::Map(_) => TypeTag::Map,
            Item::Element(_) => TypeTag::Element,
            Item::Type(_) => TypeTag::Type,
        }
    }

    /// Inline `Int` when the value fits in 56 bits, boxed `Int64` otherwise.
    pub fn make_int(value: i64) -> Item {
        if (INT56_MIN..=INT56_MAX).contains(&value) {
            Item::Int(value)
        } else {
            Item::Int64(value)
        }
    }

    pub fn make_float(pool: &Pool, value: f64) -> Result<Item, ValueError> {
        pool.charge(8)?;
        Ok(Item::Float(value))
    }

    pub fn make_string(pool: &Pool, text: &str) -> Result<Item, ValueError> {
        pool.alloc_str(text).map(Item::String)
    }

    pub fn make_symbol(names: &NamePool, text: &str) -> Result<Item, ValueError> {
        names.create(text).map(Item::Symbol)
    }

    pub fn make_binary(pool: &Pool, bytes: &[u8]) -> Result<Item, ValueError> {
        pool.charge(bytes.len())?;
        Ok(Item::Binary(bytes.into()))
    }

    pub fn make_list(pool: &Pool) -> Result<Item, ValueError> {
        List::new(pool).map(Item::List)
    }

    pub fn error(diagnostic: Diagnostic) -> Item {
        Item::Error(Rc::new(diagnostic))
    }

    pub fn error_kind(kind: ErrorKind, message: impl Into<String>) -> Item {
        Item::error(Diagnostic::new(kind, message))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Item::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Item::Error(_))
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Item::Bool(value) => Ok(*value),
            other => Err(ValueError::mismatch(TypeTag::Bool, other.type_tag())),
        }
    }

    /// `Int` or `Int64` as a plain integer.
    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self {
            Item::Int(value) | Item::Int64(value) => Ok(*value),
            other => Err(ValueError::mismatch(TypeTag::Int, other.type_tag())),
        }
    }

    pub fn as_float(&self) -> Result<f64, ValueError> {
        match self {
            Item::Float(value) => Ok(*value),
            other => Err(ValueError::mismatch(TypeTag::Float, other.type_tag())),
        }
    }

    /// Any numeric item widened to `f64`.
    pub fn as_number(&self) -> Result<f64, ValueError> {
        match self {
            Item::Int(value) | Item::Int64(value) => Ok(*value as f64),
            Item::Float(value) => Ok(*value),
            other => Err(ValueError::mismatch(TypeTag::Number, other.type_tag())),
        }
    }

    /// Text of a `String` or `Symbol`.
    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Item::String(s) | Item::Symbol(s) => Ok(s.as_str()),
            other => Err(ValueError::mismatch(TypeTag::String, other.type_tag())),
        }
    }

    pub fn as_datetime(&self) -> Result<DateTime, ValueError> {
        match self {
            Item::DateTime(value) => Ok(*value),
            other => Err(ValueError::mismatch(TypeTag::DateTime, other.type_tag())),
        }
    }

    pub fn as_binary(&self) -> Result<&[u8], ValueError> {
        match self {
            Item::Binary(bytes) => Ok(bytes),
            other => Err(ValueError::mismatch(TypeTag::Binary, other.type_tag())),
        }
    }

    accessor!(as_string, String, String, &Str);
    accessor!(as_symbol, Symbol, Symbol, &Str);
    accessor!(as_list, List, List, &List);
    accessor!(as_array, Array, Array, &Array);
    accessor!(as_map, Map, Map, &Map);
    accessor!(as_element, Element, Element, &Element);

    pub fn as_diagnostic(&self) -> Result<&Diagnostic, ValueError> {
        match self {
            Item::Error(diagnostic) => Ok(diagnostic),
            other => Err(ValueError::mismatch(TypeTag::Error, other.type_tag())),
        }
    }

    /// Like an accessor, but turns a mismatch into an `Error` item.
    pub fn expect_tag(&self, tag: TypeTag) -> Item {
        if self.type_tag() == tag {
            self.clone()
        } else {
            Item::error(ValueError::mismatch(tag, self.type_tag()).to_diagnostic())
        }
    }

    /// Shorthand for `ItemReader::new(self)`.
    pub fn reader(&self) -> ItemReader<'_> {
        ItemReader::new(self)
    }

    /// Deep equality by content.
    ///
    /// `Int` and `Int64` compare by numeric value; `String` and `Symbol` stay
    /// distinct. Maps with the same shape handle skip the key comparison.
    pub fn structural_eq(&self, other: &Item) -> bool {
        match (self, other) {
            (Item::Null, Item::Null) => true,
            (Item::Error(a), Item::Error(b)) => a.kind == b.kind && a.message == b.message,
            (Item::Bool(a), Item::Bool(b)) => a == b,
            (Item::Int(a) | Item::Int64(a), Item::Int(b) | Item::Int64(b)) => a == b,
            (Item::Float(a), Item::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Item::String(a), Item::String(b)) | (Item::Symbol(a), Item::Symbol(b)) => a == b,
            (Item::Binary(a), Item::Binary(b)) => a == b,
            (Item::DateTime(a), Item::DateTime(b)) => a == b,
            (Item::List(a), Item::List(b)) => slice_eq(a.as_slice(), b.as_slice()),
            (Item::Array(a), Item::Array(b)) => slice_eq(a.as_slice(), b.as_slice()),
            (Item::Map(a), Item::Map(b)) => map_eq(a, b),
            (Item::Element(a), Item::Element(b)) => {
                Element::ptr_eq(a, b)
                    || (a.tag() == b.tag()
                        && map_eq(a.attrs(), b.attrs())
                        && slice_eq(a.children(), b.children()))
            }
            (Item::Type(a), Item::Type(b)) => a == b,
            _ => false,
        }
    }
}

fn slice_eq(a: &[Item], b: &[Item]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
}

fn map_eq(a: &Map, b: &Map) -> bool {
    if Map::ptr_eq(a, b) {
        return true;
    }
    if a.len() != b.len() {
        return false;
    }
    if !Rc::ptr_eq(a.shape(), b.shape()) && !a.keys().eq(b.keys()) {
        return false;
    }
    a.values().zip(b.values()).all(|(x, y)| x.structural_eq(y))
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

impl From<bool> for Item {
    fn from(value: bool) -> Self {
        Item::Bool(value)
    }
}

impl From<i64> for Item {
    fn from(value: i64) -> Self {
        Item::make_int(value)
    }
}

impl From<DateTime> for Item {
    fn from(value: DateTime) -> Self {
        Item::DateTime(value)
    }
}

impl From<Element> for Item {
    fn from(value: Element) -> Self {
        Item::Element(value)
    }
}

impl From<Map> for Item {
    fn from(value: Map) -> Self {
        Item::Map(value)
    }
}

impl From<List> for Item {
    fn from(value: List) -> Self {
        Item::List(value)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Null => f.write_str("Null"),
            Item::Error(diagnostic) => write!(f, "Error({})", diagnostic),
            Item::Bool(value) => write!(f, "Bool({})", value),
            Item::Int(value) => write!(f, "Int({})", value),
            Item::Int64(value) => write!(f, "Int64({})", value),
            Item::Float(value) => write!(f, "Float({})", value),
            Item::String(s) => write!(f, "String({:?})", s),
            Item::Symbol(s) => write!(f, "Symbol({:?})", s),
            Item::Binary(bytes) => write!(f, "Binary({} bytes)", bytes.len()),
            Item::DateTime(value) => write!(f, "DateTime({})", value),
            Item::List(list) => write!(f, "List{:?}", list),
            Item::Array(array) => fmt::Debug::fmt(array, f),
            Item::Map(map) => write!(f, "Map{:?}", map),
            Item::Element(element) => fmt::Debug::fmt(element, f),
            Item::Type(tag) => write!(f, "Type({})", tag),
        }
    }
}

/// Compact mark-style rendering used in logs and diagnostics.
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Null => f.write_str("null"),
            Item::Error(diagnostic) => write!(f, "error({})", diagnostic),
            Item::Bool(value) => write!(f, "{}", value),
            Item::Int(value) | Item::Int64(value) => write!(f, "{}", value),
            Item::Float(value) => write!(f, "{}", value),
            Item::String(s) => write!(f, "{:?}", s.as_str()),
            Item::Symbol(s) => write!(f, "'{}'", s),
            Item::Binary(bytes) => {
                f.write_str("b'")?;
                for byte in bytes.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str("'")
            }
            Item::DateTime(value) => write!(f, "t'{}'", value),
            Item::List(list) => write_seq(f, list.as_slice()),
            Item::Array(array) => write_seq(f, array.as_slice()),
            Item::Map(map) => {
                f.write_str("{")?;
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Item::Element(element) => {
                write!(f, "<{}", element.tag())?;
                for (key, value) in element.attrs().iter() {
                    write!(f, " {}: {}", key, value)?;
                }
                for (index, child) in element.children().iter().enumerate() {
                    f.write_str(if index == 0 { "; " } else { " " })?;
                    write!(f, "{}", child)?;
                }
                f.write_str(">")
            }
            Item::Type(tag) => write!(f, "type({})", tag),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Item]) -> fmt::Result {
    f.write_str("[")?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("]")
}
