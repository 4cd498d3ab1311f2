//! Per-caller state: pool, name pool and error frames.

use crate::element::ElementBuilder;
use crate::error::{Diagnostic, ValueError};
use crate::item::Item;
use crate::list::{Array, List};
use crate::map::MapBuilder;
use crate::name_pool::NamePool;
use crate::pool::{Pool, PoolConfig};
use std::cell::RefCell;
use std::rc::Rc;

/// Diagnostics collected while one labelled operation runs.
#[derive(Debug, Clone, Default)]
pub struct ErrorFrame {
    pub label: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Owns the pool and the active name pool.
///
/// A context is single-threaded; items created through it must not be
/// handed to another context. Two contexts share interned names only
/// through a common parent [`NamePool`].
pub struct Context {
    pool: Pool,
    names: Rc<NamePool>,
    frames: RefCell<Vec<ErrorFrame>>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Context {
            pool: Pool::with_config(config),
            names: Rc::new(NamePool::new()),
            frames: RefCell::new(Vec::new()),
        }
    }

    /// A context whose name pool chains to `parent` for shared names.
    pub fn with_parent_names(parent: Rc<NamePool>, config: PoolConfig) -> Self {
        Context {
            pool: Pool::with_config(config),
            names: Rc::new(NamePool::with_parent(parent)),
            frames: RefCell::new(Vec::new()),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn names(&self) -> &NamePool {
        &self.names
    }

    pub fn shared_names(&self) -> Rc<NamePool> {
        self.names.clone()
    }

    pub fn string(&self, text: &str) -> Result<Item, ValueError> {
        Item::make_string(&self.pool, text)
    }

    pub fn symbol(&self, text: &str) -> Result<Item, ValueError> {
        Item::make_symbol(&self.names, text)
    }

    pub fn float(&self, value: f64) -> Result<Item, ValueError> {
        Item::make_float(&self.pool, value)
    }

    pub fn list(&self, items: Vec<Item>) -> Result<Item, ValueError> {
        List::from_items(&self.pool, items).map(Item::List)
    }

    pub fn array(&self, items: Vec<Item>) -> Result<Item, ValueError> {
        Array::from_items(&self.pool, items).map(Item::Array)
    }

    pub fn map(&self) -> MapBuilder<'_> {
        MapBuilder::new(&self.names, &self.pool)
    }

    pub fn element(&self, tag: &str) -> Result<ElementBuilder<'_>, ValueError> {
        ElementBuilder::new(&self.names, &self.pool, tag)
    }

    /// Records `diagnostic` in the innermost frame and wraps it as an item.
    pub fn error(&self, diagnostic: Diagnostic) -> Item {
        log::debug!("{}", diagnostic);
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            frame.diagnostics.push(diagnostic.clone());
        }
        Item::error(diagnostic)
    }

    pub fn push_frame(&self, label: impl Into<String>) {
        self.frames.borrow_mut().push(ErrorFrame {
            label: label.into(),
            diagnostics: Vec::new(),
        });
    }

    pub fn pop_frame(&self) -> Option<ErrorFrame> {
        self.frames.borrow_mut().pop()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
