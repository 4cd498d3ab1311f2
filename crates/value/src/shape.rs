use crate::string::Str;
use crate::tag::TypeTag;
use std::fmt;
use std::rc::Rc;

/// Slot width used to compute `byte_offset`; every value occupies one word.
pub const SLOT_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeEntry {
    pub name: Str,
    pub type_tag: TypeTag,
    pub byte_offset: usize,
}

/// Ordered field layout of a map.
///
/// Shapes are interned by a [`crate::NamePool`]; two maps built through the
/// same pool with the same `(name, type)` sequence hold the same `Rc`.
#[derive(PartialEq, Eq)]
pub struct Shape {
    entries: Box<[ShapeEntry]>,
}

pub type ShapeRef = Rc<Shape>;

impl Shape {
    pub(crate) fn from_fields(fields: &[(Str, TypeTag)]) -> Self {
        let entries = fields
            .iter()
            .enumerate()
            .map(|(index, (name, type_tag))| ShapeEntry {
                name: name.clone(),
                type_tag: *type_tag,
                byte_offset: index * SLOT_SIZE,
            })
            .collect();
        Shape { entries }
    }

    pub fn entries(&self) -> &[ShapeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ShapeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Total byte size of the value block described by this shape.
    pub fn byte_size(&self) -> usize {
        self.entries.len() * SLOT_SIZE
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.name.as_str(), entry.type_tag)),
            )
            .finish()
    }
}
