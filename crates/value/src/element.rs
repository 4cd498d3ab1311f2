use crate::error::ValueError;
use crate::item::Item;
use crate::map::{Map, MapBuilder};
use crate::name_pool::NamePool;
use crate::pool::Pool;
use crate::shape::SLOT_SIZE;
use crate::string::Str;
use std::fmt;
use std::rc::Rc;

/// Interned tag name; lives in the same name pool as the attribute shape.
#[derive(Clone, Debug)]
pub struct ElementType {
    name: Str,
}

impl ElementType {
    pub fn new(names: &NamePool, name: &str) -> Result<Self, ValueError> {
        Ok(ElementType {
            name: names.create(name)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone)]
struct ElementData {
    etype: ElementType,
    attrs: Map,
    children: Vec<Item>,
}

/// A tagged tree node: attributes in a shaped map, children in order.
///
/// Handles are immutable once shared; mutation copies shared storage, so an
/// element can never become its own ancestor.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// Assembles an element from an interned type and a built attribute map.
    pub fn new(
        pool: &Pool,
        etype: ElementType,
        attrs: Map,
        children: Vec<Item>,
    ) -> Result<Self, ValueError> {
        pool.charge((children.len() + 2) * SLOT_SIZE)?;
        Ok(Element(Rc::new(ElementData {
            etype,
            attrs,
            children,
        })))
    }

    pub fn tag(&self) -> &str {
        self.0.etype.name()
    }

    pub fn element_type(&self) -> &ElementType {
        &self.0.etype
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag() == tag
    }

    pub fn attrs(&self) -> &Map {
        &self.0.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&Item> {
        self.0.attrs.get(key)
    }

    /// String or symbol attribute as text.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        match self.attr(key)? {
            Item::String(s) | Item::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Item] {
        &self.0.children
    }

    pub fn len(&self) -> usize {
        self.0.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.children.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&Item> {
        self.0.children.get(index)
    }

    pub fn push_child(&mut self, item: Item) {
        Rc::make_mut(&mut self.0).children.push(item);
    }

    pub fn set_attr(&mut self, names: &NamePool, key: &str, value: Item) -> Result<(), ValueError> {
        Rc::make_mut(&mut self.0).attrs.set(names, key, value)
    }

    /// Concatenated text of every string descendant, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self.children(), &mut out);
        out
    }

    pub fn ptr_eq(a: &Element, b: &Element) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

fn collect_text(items: &[Item], out: &mut String) {
    for item in items {
        match item {
            Item::String(s) => out.push_str(s),
            Item::Element(element) => collect_text(element.children(), out),
            Item::List(list) => collect_text(list.as_slice(), out),
            _ => {}
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag())
            .field("attrs", &self.0.attrs)
            .field("children", &self.0.children)
            .finish()
    }
}

pub struct ElementBuilder<'a> {
    pool: &'a Pool,
    etype: ElementType,
    attrs: MapBuilder<'a>,
    children: Vec<Item>,
}

impl<'a> ElementBuilder<'a> {
    pub fn new(names: &'a NamePool, pool: &'a Pool, tag: &str) -> Result<Self, ValueError> {
        Ok(ElementBuilder {
            pool,
            etype: ElementType::new(names, tag)?,
            attrs: MapBuilder::new(names, pool),
            children: Vec::new(),
        })
    }

    pub fn tag(&self) -> &str {
        self.etype.name()
    }

    pub fn attr(&mut self, key: &str, value: Item) -> Result<(), ValueError> {
        self.attrs.insert(key, value)
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn child(&mut self, item: Item) {
        self.children.push(item);
    }

    pub fn children_mut(&mut self) -> &mut Vec<Item> {
        &mut self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn build(self) -> Result<Element, ValueError> {
        let attrs = self.attrs.build()?;
        Element::new(self.pool, self.etype, attrs, self.children)
    }

    pub fn into_item(self) -> Result<Item, ValueError> {
        self.build().map(Item::Element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_element() {
        let names = NamePool::new();
        let pool = Pool::new();
        let mut builder = ElementBuilder::new(&names, &pool, "a").unwrap();
        builder
            .attr("href", Item::String(Str::new("/x").unwrap()))
            .unwrap();
        builder.child(Item::String(Str::new("link").unwrap()));
        let element = builder.build().unwrap();
        assert_eq!(element.tag(), "a");
        assert_eq!(element.attr_str("href"), Some("/x"));
        assert_eq!(element.text_content(), "link");
    }

    #[test]
    fn test_push_child_copies_shared_storage() {
        let names = NamePool::new();
        let pool = Pool::new();
        let mut parent = ElementBuilder::new(&names, &pool, "p")
            .unwrap()
            .build()
            .unwrap();
        let snapshot = parent.clone();
        parent.push_child(Item::Element(snapshot.clone()));
        assert_eq!(parent.len(), 1);
        assert!(snapshot.is_empty());
        assert!(!Element::ptr_eq(&parent, &snapshot));
    }

    #[test]
    fn test_attribute_shapes_come_from_name_pool() {
        let names = NamePool::new();
        let pool = Pool::new();
        let make = |href: &str| {
            let mut builder = ElementBuilder::new(&names, &pool, "a").unwrap();
            builder
                .attr("href", Item::String(Str::new(href).unwrap()))
                .unwrap();
            builder.build().unwrap()
        };
        let a = make("/a");
        let b = make("/b");
        assert!(Rc::ptr_eq(a.attrs().shape(), b.attrs().shape()));
        assert!(names.lookup("href").is_some());
    }
}
