use std::fmt;

/// Runtime type tag of an [`crate::Item`].
///
/// The discriminants are stable and appear in formatter sentinels such as
/// `[type_17]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeTag {
    Null = 0,
    Error = 1,
    Bool = 2,
    Int = 3,
    Int64 = 4,
    Float = 5,
    /// Reserved. No item carries this tag.
    Decimal = 6,
    /// Tag-only numeric placeholder used in shapes and array element types.
    Number = 7,
    String = 8,
    Symbol = 9,
    Binary = 10,
    DateTime = 11,
    List = 12,
    Array = 13,
    Map = 14,
    Element = 15,
    Type = 16,
    Function = 17,
    Any = 18,
}

impl TypeTag {
    pub const ALL: [TypeTag; 19] = [
        TypeTag::Null,
        TypeTag::Error,
        TypeTag::Bool,
        TypeTag::Int,
        TypeTag::Int64,
        TypeTag::Float,
        TypeTag::Decimal,
        TypeTag::Number,
        TypeTag::String,
        TypeTag::Symbol,
        TypeTag::Binary,
        TypeTag::DateTime,
        TypeTag::List,
        TypeTag::Array,
        TypeTag::Map,
        TypeTag::Element,
        TypeTag::Type,
        TypeTag::Function,
        TypeTag::Any,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Error => "error",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Int64 => "int64",
            TypeTag::Float => "float",
            TypeTag::Decimal => "decimal",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Symbol => "symbol",
            TypeTag::Binary => "binary",
            TypeTag::DateTime => "datetime",
            TypeTag::List => "list",
            TypeTag::Array => "array",
            TypeTag::Map => "map",
            TypeTag::Element => "element",
            TypeTag::Type => "type",
            TypeTag::Function => "function",
            TypeTag::Any => "any",
        }
    }

    /// Values of these tags live behind a reference-counted handle.
    pub fn is_heap(self) -> bool {
        matches!(
            self,
            TypeTag::String
                | TypeTag::Symbol
                | TypeTag::Binary
                | TypeTag::List
                | TypeTag::Array
                | TypeTag::Map
                | TypeTag::Element
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::Int | TypeTag::Int64 | TypeTag::Float | TypeTag::Decimal | TypeTag::Number
        )
    }

    /// Placeholder written by formatters for values they cannot represent.
    pub fn sentinel(self) -> String {
        format!("[type_{}]", self.id())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
