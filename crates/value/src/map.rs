//! Shape-addressed maps.
//!
//! Values sit in a contiguous block in shape order. Lookup goes through the
//! shape, iteration follows insertion order.

use crate::error::ValueError;
use crate::item::Item;
use crate::name_pool::NamePool;
use crate::pool::Pool;
use crate::shape::ShapeRef;
use crate::string::Str;
use crate::tag::TypeTag;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
struct MapData {
    shape: ShapeRef,
    values: Vec<Item>,
}

#[derive(Clone)]
pub struct Map(Rc<MapData>);

/// Whether a value may occupy a slot declared with `declared`.
fn slot_accepts(declared: TypeTag, value: &Item) -> bool {
    let tag = value.type_tag();
    declared == tag
        || declared == TypeTag::Any
        || tag == TypeTag::Null
        || (declared == TypeTag::Number && tag.is_numeric())
}

impl Map {
    /// Builds a map over a pre-built shape, one value per entry.
    pub fn with_shape(pool: &Pool, shape: ShapeRef, values: Vec<Item>) -> Result<Self, ValueError> {
        if values.len() != shape.len() {
            return Err(ValueError::invalid(format!(
                "shape has {} fields but {} values were given",
                shape.len(),
                values.len()
            )));
        }
        for (entry, value) in shape.entries().iter().zip(&values) {
            if !slot_accepts(entry.type_tag, value) {
                return Err(ValueError::mismatch(entry.type_tag, value.type_tag()));
            }
        }
        pool.charge(shape.byte_size())?;
        Ok(Map(Rc::new(MapData { shape, values })))
    }

    /// A map over `shape` with every slot set to null.
    pub fn empty_with_shape(pool: &Pool, shape: ShapeRef) -> Result<Self, ValueError> {
        let values = vec![Item::Null; shape.len()];
        Self::with_shape(pool, shape, values)
    }

    pub fn shape(&self) -> &ShapeRef {
        &self.0.shape
    }

    pub fn len(&self) -> usize {
        self.0.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.0
            .shape
            .index_of(key)
            .and_then(|index| self.0.values.get(index))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.shape.index_of(key).is_some()
    }

    pub fn get_index(&self, index: usize) -> Option<(&Str, &Item)> {
        let entry = self.0.shape.entries().get(index)?;
        Some((&entry.name, &self.0.values[index]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Str, &Item)> {
        self.0
            .shape
            .entries()
            .iter()
            .map(|entry| &entry.name)
            .zip(self.0.values.iter())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.shape.names()
    }

    pub fn values(&self) -> std::slice::Iter<'_, Item> {
        self.0.values.iter()
    }

    /// Writes a value at a known slot without changing the shape.
    pub fn put_at(&mut self, index: usize, value: Item) -> Result<(), ValueError> {
        let entry = self
            .0
            .shape
            .entries()
            .get(index)
            .ok_or_else(|| ValueError::out_of_range(format!("slot {}", index)))?;
        if !slot_accepts(entry.type_tag, &value) {
            return Err(ValueError::mismatch(entry.type_tag, value.type_tag()));
        }
        Rc::make_mut(&mut self.0).values[index] = value;
        Ok(())
    }

    /// Inserts or replaces `key`. The shape is re-interned whenever the
    /// field list or a field's type changes.
    pub fn set(&mut self, names: &NamePool, key: &str, value: Item) -> Result<(), ValueError> {
        let data = Rc::make_mut(&mut self.0);
        let reshape = match data.shape.index_of(key) {
            Some(index) => {
                let changed = data.shape.entries()[index].type_tag != value.type_tag();
                data.values[index] = value;
                changed
            }
            None => {
                let name = names.create(key)?;
                let mut fields = current_fields(data);
                fields.push((name, value.type_tag()));
                data.values.push(value);
                data.shape = names.shape_for_key(fields);
                return Ok(());
            }
        };
        if reshape {
            let fields = current_fields(data);
            data.shape = names.shape_for_key(fields);
        }
        Ok(())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, names: &NamePool, key: &str) -> Option<Item> {
        let index = self.0.shape.index_of(key)?;
        let data = Rc::make_mut(&mut self.0);
        let removed = data.values.remove(index);
        let mut fields = Vec::with_capacity(data.values.len());
        for (position, entry) in data.shape.entries().iter().enumerate() {
            if position != index {
                fields.push((entry.name.clone(), entry.type_tag));
            }
        }
        data.shape = names.shape_for_key(fields);
        Some(removed)
    }

    pub fn ptr_eq(a: &Map, b: &Map) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

fn current_fields(data: &MapData) -> Vec<(Str, TypeTag)> {
    data.shape
        .entries()
        .iter()
        .zip(&data.values)
        .map(|(entry, value)| (entry.name.clone(), value.type_tag()))
        .collect()
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Incremental map construction; the shape is installed by [`MapBuilder::build`].
///
/// Inserting an existing key replaces its value in place, so the last write
/// wins and the first position is kept.
pub struct MapBuilder<'a> {
    names: &'a NamePool,
    pool: &'a Pool,
    keys: Vec<Str>,
    values: Vec<Item>,
}

impl<'a> MapBuilder<'a> {
    pub fn new(names: &'a NamePool, pool: &'a Pool) -> Self {
        MapBuilder {
            names,
            pool,
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: &str, value: Item) -> Result<(), ValueError> {
        if let Some(index) = self.keys.iter().position(|existing| existing == key) {
            log::trace!("duplicate map key {:?}: keeping the later value", key);
            self.values[index] = value;
            return Ok(());
        }
        self.keys.push(self.names.create(key)?);
        self.values.push(value);
        Ok(())
    }

    pub fn with(mut self, key: &str, value: Item) -> Result<Self, ValueError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.iter().any(|existing| existing == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        let index = self.keys.iter().position(|existing| existing == key)?;
        self.values.get_mut(index)
    }

    pub fn build(self) -> Result<Map, ValueError> {
        let fields = self
            .keys
            .into_iter()
            .zip(&self.values)
            .map(|(key, value)| (key, value.type_tag()))
            .collect();
        let shape = self.names.shape_for_key(fields);
        self.pool.charge(shape.byte_size())?;
        Ok(Map(Rc::new(MapData {
            shape,
            values: self.values,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(names: &NamePool, pool: &Pool, fields: &[(&str, Item)]) -> Map {
        let mut builder = MapBuilder::new(names, pool);
        for (key, value) in fields {
            builder.insert(key, value.clone()).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_builder_keeps_insertion_order() {
        let names = NamePool::new();
        let pool = Pool::new();
        let map = build(
            &names,
            &pool,
            &[("z", Item::Int(1)), ("a", Item::Int(2)), ("m", Item::Int(3))],
        );
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(map.get("a"), Some(&Item::Int(2)));
        assert_eq!(map.shape().entries()[2].byte_offset, 16);
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let names = NamePool::new();
        let pool = Pool::new();
        let map = build(
            &names,
            &pool,
            &[("a", Item::Int(1)), ("b", Item::Int(2)), ("a", Item::Int(3))],
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Item::Int(3)));
        assert_eq!(map.keys().next(), Some("a"));
    }

    #[test]
    fn test_identical_fields_share_shape() {
        let names = NamePool::new();
        let pool = Pool::new();
        let a = build(&names, &pool, &[("x", Item::Int(1)), ("y", Item::Bool(true))]);
        let b = build(&names, &pool, &[("x", Item::Int(9)), ("y", Item::Bool(false))]);
        assert!(Rc::ptr_eq(a.shape(), b.shape()));
    }

    #[test]
    fn test_set_reinterns_shape() {
        let names = NamePool::new();
        let pool = Pool::new();
        let mut a = build(&names, &pool, &[("x", Item::Int(1))]);
        let original = a.shape().clone();
        a.set(&names, "x", Item::Int(5)).unwrap();
        assert!(Rc::ptr_eq(a.shape(), &original));
        a.set(&names, "y", Item::Null).unwrap();
        let b = build(&names, &pool, &[("x", Item::Int(0)), ("y", Item::Null)]);
        assert!(Rc::ptr_eq(a.shape(), b.shape()));
        assert_eq!(a.remove(&names, "y"), Some(Item::Null));
        assert!(Rc::ptr_eq(a.shape(), &original));
    }

    #[test]
    fn test_with_shape_checks_values() {
        let names = NamePool::new();
        let pool = Pool::new();
        let shape = names
            .intern_shape(&[("n", TypeTag::Number), ("s", TypeTag::String)])
            .unwrap();
        let err = Map::with_shape(&pool, shape.clone(), vec![Item::Int(1)]).unwrap_err();
        assert!(matches!(err, ValueError::Invalid(_)));
        let err = Map::with_shape(&pool, shape.clone(), vec![Item::Int(1), Item::Int(2)])
            .unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { .. }));
        let mut map = Map::empty_with_shape(&pool, shape).unwrap();
        map.put_at(0, Item::Float(1.5)).unwrap();
        assert_eq!(map.get("n"), Some(&Item::Float(1.5)));
    }
}
