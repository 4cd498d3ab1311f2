//! The tagged item runtime.
//!
//! Every parser produces, and every formatter consumes, trees of [`Item`]s.
//! Heap values are reference counted handles; maps are laid out by an
//! interned [`Shape`], and elements are maps with a tag name and children.
//!
//! # Example
//!
//! ```ignore
//! use mosaic_value::{Context, Item};
//!
//! let ctx = Context::new();
//! let mut builder = ctx.map();
//! builder.insert("name", ctx.string("mosaic")?)?;
//! let map = Item::Map(builder.build()?);
//! assert_eq!(map.reader().as_map().and_then(|m| m.get_str("name")), Some("mosaic"));
//! ```

pub mod context;
pub mod element;
pub mod emit;
pub mod error;
pub mod item;
pub mod list;
pub mod map;
pub mod name_pool;
pub mod pool;
pub mod reader;
pub mod shape;
pub mod string;
pub mod tag;

pub use context::{Context, ErrorFrame};
pub use element::{Element, ElementBuilder, ElementType};
pub use emit::{DEFAULT_MAX_DEPTH, DEPTH_SENTINEL, FormatContext, FormatOptions};
pub use error::{Diagnostic, ErrorKind, ValueError};
pub use item::{INT56_MAX, INT56_MIN, Item};
pub use list::{Array, List};
pub use map::{Map, MapBuilder};
pub use name_pool::{NamePool, SYMBOL_INTERN_LIMIT};
pub use pool::{Pool, PoolConfig, PoolStats};
pub use reader::{ElementReader, ItemReader, ListReader, MapReader};
pub use shape::{Shape, ShapeEntry, ShapeRef};
pub use string::{REF_MAX, STR_MAX_LEN, Str};
pub use tag::TypeTag;

pub use mosaic_datetime as datetime;
pub use mosaic_datetime::DateTime;
