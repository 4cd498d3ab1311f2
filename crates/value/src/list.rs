use crate::error::ValueError;
use crate::item::Item;
use crate::pool::Pool;
use crate::shape::SLOT_SIZE;
use crate::tag::TypeTag;
use std::fmt;
use std::rc::Rc;

/// Heterogeneous ordered sequence.
#[derive(Clone, Default)]
pub struct List(Rc<Vec<Item>>);

impl List {
    pub fn new(pool: &Pool) -> Result<Self, ValueError> {
        Self::from_items(pool, Vec::new())
    }

    pub fn from_items(pool: &Pool, items: Vec<Item>) -> Result<Self, ValueError> {
        pool.charge(items.len() * SLOT_SIZE)?;
        Ok(List(Rc::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }

    /// Appends in place, copying first if the storage is shared.
    pub fn push(&mut self, item: Item) {
        Rc::make_mut(&mut self.0).push(item);
    }

    pub fn set(&mut self, index: usize, item: Item) -> Result<(), ValueError> {
        let len = self.len();
        let slot = Rc::make_mut(&mut self.0)
            .get_mut(index)
            .ok_or_else(|| ValueError::out_of_range(format!("index {} of {}", index, len)))?;
        *slot = item;
        Ok(())
    }

    pub fn ptr_eq(a: &List, b: &List) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Ordered sequence that records its element type when homogeneous.
#[derive(Clone)]
pub struct Array {
    elem: TypeTag,
    items: Rc<Vec<Item>>,
}

impl Array {
    pub fn from_items(pool: &Pool, items: Vec<Item>) -> Result<Self, ValueError> {
        pool.charge(items.len() * SLOT_SIZE)?;
        Ok(Array {
            elem: common_tag(&items),
            items: Rc::new(items),
        })
    }

    /// `TypeTag::Any` when empty or heterogeneous.
    pub fn element_type(&self) -> TypeTag {
        self.elem
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn push(&mut self, item: Item) {
        let tag = item.type_tag();
        self.elem = if self.items.is_empty() {
            tag
        } else if self.elem == tag {
            tag
        } else {
            TypeTag::Any
        };
        Rc::make_mut(&mut self.items).push(item);
    }

    pub fn ptr_eq(a: &Array, b: &Array) -> bool {
        Rc::ptr_eq(&a.items, &b.items)
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array<{}>", self.elem)?;
        f.debug_list().entries(self.items.iter()).finish()
    }
}

fn common_tag(items: &[Item]) -> TypeTag {
    let mut tags = items.iter().map(Item::type_tag);
    match tags.next() {
        None => TypeTag::Any,
        Some(first) if tags.all(|tag| tag == first) => first,
        Some(_) => TypeTag::Any,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_copy_on_write() {
        let pool = Pool::new();
        let mut a = List::from_items(&pool, vec![Item::Int(1)]).unwrap();
        let b = a.clone();
        assert!(List::ptr_eq(&a, &b));
        a.push(Item::Int(2));
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert!(!List::ptr_eq(&a, &b));
    }

    #[test]
    fn test_list_set_out_of_range() {
        let pool = Pool::new();
        let mut list = List::new(&pool).unwrap();
        assert!(matches!(
            list.set(0, Item::Null),
            Err(ValueError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_array_element_type() {
        let pool = Pool::new();
        let mut array = Array::from_items(&pool, vec![Item::Int(1), Item::Int(2)]).unwrap();
        assert_eq!(array.element_type(), TypeTag::Int);
        array.push(Item::Bool(true));
        assert_eq!(array.element_type(), TypeTag::Any);
        let empty = Array::from_items(&pool, Vec::new()).unwrap();
        assert_eq!(empty.element_type(), TypeTag::Any);
    }
}
