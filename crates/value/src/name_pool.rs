//! Content-keyed string interning with parent chaining.
//!
//! A child pool never writes into its parent: `create` does a read-only
//! lookup in the parent chain first and only allocates locally on a miss.

use crate::error::ValueError;
use crate::shape::{Shape, ShapeRef};
use crate::string::Str;
use crate::tag::TypeTag;
use indexmap::IndexSet;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

/// Names longer than this are allocated without interning.
pub const SYMBOL_INTERN_LIMIT: usize = 32;

/// Fixed-key hasher so identical content always maps to the same bucket.
type NameHasher = BuildHasherDefault<DefaultHasher>;

type ShapeKey = Vec<(Str, TypeTag)>;

#[derive(Default)]
pub struct NamePool {
    parent: Option<Rc<NamePool>>,
    names: RefCell<IndexSet<Str, NameHasher>>,
    shapes: RefCell<HashMap<ShapeKey, ShapeRef, NameHasher>>,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<NamePool>) -> Self {
        NamePool {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn parent(&self) -> Option<&Rc<NamePool>> {
        self.parent.as_ref()
    }

    /// Finds an interned name in this pool or any ancestor without touching
    /// reference counts.
    pub fn lookup(&self, name: &str) -> Option<Str> {
        if let Some(parent) = &self.parent {
            if let Some(found) = parent.lookup(name) {
                return Some(found);
            }
        }
        self.names.borrow().get(name).cloned()
    }

    /// Returns the interned string for `name`, retaining it on a hit.
    ///
    /// Names above [`SYMBOL_INTERN_LIMIT`] bytes get a fresh, uninterned
    /// allocation on every call.
    pub fn create(&self, name: &str) -> Result<Str, ValueError> {
        if name.len() > SYMBOL_INTERN_LIMIT {
            return Str::new(name);
        }
        if let Some(found) = self.lookup(name) {
            found.retain();
            return Ok(found);
        }
        let fresh = Str::new(name)?;
        self.names.borrow_mut().insert(fresh.clone());
        Ok(fresh)
    }

    /// Number of names interned locally, excluding the parent chain.
    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locally interned names in insertion order.
    pub fn names(&self) -> Vec<Str> {
        self.names.borrow().iter().cloned().collect()
    }

    /// Returns the canonical shape for a `(name, type)` sequence.
    ///
    /// Names are interned on the way in so that the shape's entries share
    /// storage with the pool.
    pub fn intern_shape(&self, fields: &[(&str, TypeTag)]) -> Result<ShapeRef, ValueError> {
        let mut key = Vec::with_capacity(fields.len());
        for (name, tag) in fields {
            key.push((self.create(name)?, *tag));
        }
        Ok(self.shape_for_key(key))
    }

    pub(crate) fn shape_for_key(&self, key: ShapeKey) -> ShapeRef {
        if let Some(found) = self.find_shape(&key) {
            return found;
        }
        let shape = Rc::new(Shape::from_fields(&key));
        self.shapes.borrow_mut().insert(key, shape.clone());
        shape
    }

    fn find_shape(&self, key: &ShapeKey) -> Option<ShapeRef> {
        if let Some(parent) = &self.parent {
            if let Some(found) = parent.find_shape(key) {
                return Some(found);
            }
        }
        self.shapes.borrow().get(key).cloned()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_interns_and_retains() {
        let pool = NamePool::new();
        let first = pool.create("foo").unwrap();
        let second = pool.create("foo").unwrap();
        assert!(Str::ptr_eq(&first, &second));
        assert_eq!(second.ref_count(), 2);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_parent_chaining() {
        let parent = Rc::new(NamePool::new());
        let foo = parent.create("foo").unwrap();
        let child = NamePool::with_parent(parent.clone());

        let found = child.lookup("foo").unwrap();
        assert!(Str::ptr_eq(&found, &foo));

        child.create("bar").unwrap();
        assert!(child.lookup("bar").is_some());
        assert!(parent.lookup("bar").is_none());
        assert_eq!(child.len(), 1);

        let again = child.create("foo").unwrap();
        assert!(Str::ptr_eq(&again, &foo));
        assert_eq!(child.len(), 1);
    }

    #[test]
    fn test_long_names_are_not_interned() {
        let pool = NamePool::new();
        let long = "x".repeat(SYMBOL_INTERN_LIMIT + 1);
        let a = pool.create(&long).unwrap();
        let b = pool.create(&long).unwrap();
        assert!(!Str::ptr_eq(&a, &b));
        assert!(pool.lookup(&long).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_shapes_share_identity() {
        let pool = NamePool::new();
        let a = pool
            .intern_shape(&[("a", TypeTag::Int), ("b", TypeTag::String)])
            .unwrap();
        let b = pool
            .intern_shape(&[("a", TypeTag::Int), ("b", TypeTag::String)])
            .unwrap();
        let c = pool
            .intern_shape(&[("a", TypeTag::Int), ("b", TypeTag::Float)])
            .unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(a.entries()[1].byte_offset, 8);
        assert_eq!(pool.shape_count(), 2);
    }
}
