//! Read-only traversal over item trees.
//!
//! Readers are the way formatters walk a tree: every accessor returns an
//! `Option` so a wrongly-tagged node is skipped rather than trusted.

use crate::element::Element;
use crate::item::Item;
use crate::map::Map;
use crate::tag::TypeTag;
use mosaic_datetime::DateTime;

#[derive(Clone, Copy)]
pub struct ItemReader<'a> {
    item: &'a Item,
}

impl<'a> ItemReader<'a> {
    pub fn new(item: &'a Item) -> Self {
        ItemReader { item }
    }

    pub fn item(&self) -> &'a Item {
        self.item
    }

    pub fn tag(&self) -> TypeTag {
        self.item.type_tag()
    }

    pub fn is_null(&self) -> bool {
        self.item.is_null()
    }

    pub fn is_error(&self) -> bool {
        self.item.is_error()
    }

    pub fn is_string(&self) -> bool {
        matches!(self.item, Item::String(_))
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self.item {
            Item::String(s) | Item::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.item {
            Item::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.item {
            Item::Int(value) | Item::Int64(value) => Some(*value),
            _ => None,
        }
    }

    /// Any numeric item as `f64`.
    pub fn as_float(&self) -> Option<f64> {
        self.item.as_number().ok()
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match self.item {
            Item::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    /// Lists and arrays both read as sequences.
    pub fn as_list(&self) -> Option<ListReader<'a>> {
        match self.item {
            Item::List(list) => Some(ListReader::new(list.as_slice())),
            Item::Array(array) => Some(ListReader::new(array.as_slice())),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<MapReader<'a>> {
        match self.item {
            Item::Map(map) => Some(MapReader::new(map)),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<ElementReader<'a>> {
        match self.item {
            Item::Element(element) => Some(ElementReader::new(element)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
pub struct ListReader<'a> {
    items: &'a [Item],
}

impl<'a> ListReader<'a> {
    pub fn new(items: &'a [Item]) -> Self {
        ListReader { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ItemReader<'a>> {
        self.items.get(index).map(ItemReader::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemReader<'a>> + 'a {
        self.items.iter().map(ItemReader::new)
    }
}

#[derive(Clone, Copy)]
pub struct MapReader<'a> {
    map: &'a Map,
}

impl<'a> MapReader<'a> {
    pub fn new(map: &'a Map) -> Self {
        MapReader { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<ItemReader<'a>> {
        self.map.get(key).map(ItemReader::new)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(|value| value.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'a str, ItemReader<'a>)> + 'a {
        self.map
            .iter()
            .map(|(key, value)| (key.as_str(), ItemReader::new(value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.map.keys()
    }
}

#[derive(Clone, Copy)]
pub struct ElementReader<'a> {
    element: &'a Element,
}

impl<'a> ElementReader<'a> {
    pub fn new(element: &'a Element) -> Self {
        ElementReader { element }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn tag(&self) -> &'a str {
        self.element.tag()
    }

    pub fn is(&self, tag: &str) -> bool {
        self.element.tag() == tag
    }

    pub fn attr(&self, key: &str) -> Option<ItemReader<'a>> {
        self.element.attr(key).map(ItemReader::new)
    }

    pub fn attr_str(&self, key: &str) -> Option<&'a str> {
        self.element.attr_str(key)
    }

    pub fn attr_int(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(|value| value.as_int())
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.element.attrs().contains_key(key)
    }

    pub fn attrs(&self) -> MapReader<'a> {
        MapReader::new(self.element.attrs())
    }

    pub fn child_count(&self) -> usize {
        self.element.len()
    }

    pub fn child(&self, index: usize) -> Option<ItemReader<'a>> {
        self.element.child(index).map(ItemReader::new)
    }

    pub fn children(&self) -> impl Iterator<Item = ItemReader<'a>> + 'a {
        self.element.children().iter().map(ItemReader::new)
    }

    /// Child elements only, skipping text and other scalars.
    pub fn child_elements(&self) -> impl Iterator<Item = ElementReader<'a>> + 'a {
        self.element
            .children()
            .iter()
            .filter_map(|child| match child {
                Item::Element(element) => Some(ElementReader::new(element)),
                _ => None,
            })
    }

    pub fn text_content(&self) -> String {
        self.element.text_content()
    }
}
