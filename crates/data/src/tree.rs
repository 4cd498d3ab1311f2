//! Dotted key paths for the line-oriented config formats.

use indexmap::IndexMap;
use mosaic_value::{Context, Item, MapBuilder, ValueError};

/// A table of keys built from `a.b.c` paths.
///
/// A key may carry both a value and a sub-table (`a = 1` next to
/// `a.b = 2`). Such keys keep their value under `a` and their sub-table
/// entries as literal `a.b` keys of the parent, whichever line came first.
#[derive(Debug, Default)]
pub(crate) struct PathTree {
    entries: IndexMap<String, Node>,
}

#[derive(Debug, Default)]
struct Node {
    value: Option<Item>,
    table: Option<PathTree>,
}

impl PathTree {
    /// Sets the value at `path`; a repeated path replaces the earlier value
    /// in its original position.
    pub(crate) fn set(&mut self, path: &[&str], value: Item) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };
        let node = self.entries.entry(first.to_string()).or_default();
        if rest.is_empty() {
            node.value = Some(value);
        } else {
            node.table.get_or_insert_with(PathTree::default).set(rest, value);
        }
    }

    /// The table at `path`, created on first use.
    pub(crate) fn table_mut(&mut self, path: &[&str]) -> &mut PathTree {
        match path.split_first() {
            None => self,
            Some((first, rest)) => self
                .entries
                .entry(first.to_string())
                .or_default()
                .table
                .get_or_insert_with(PathTree::default)
                .table_mut(rest),
        }
    }

    pub(crate) fn into_item(self, ctx: &Context) -> Result<Item, ValueError> {
        let mut builder = ctx.map();
        self.write_into(ctx, &mut builder, None)?;
        Ok(Item::Map(builder.build()?))
    }

    fn write_into(
        self,
        ctx: &Context,
        builder: &mut MapBuilder<'_>,
        prefix: Option<&str>,
    ) -> Result<(), ValueError> {
        for (key, node) in self.entries {
            let key = match prefix {
                Some(prefix) => format!("{}.{}", prefix, key),
                None => key,
            };
            match (node.value, node.table) {
                (Some(value), None) => builder.insert(&key, value)?,
                (None, Some(table)) => builder.insert(&key, table.into_item(ctx)?)?,
                (Some(value), Some(table)) => {
                    builder.insert(&key, value)?;
                    table.write_into(ctx, builder, Some(&key))?;
                }
                (None, None) => {}
            }
        }
        Ok(())
    }
}

/// Splits a dotted key into its path segments.
pub(crate) fn split_path(key: &str) -> Vec<&str> {
    key.split('.').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths() {
        let ctx = Context::new();
        let mut tree = PathTree::default();
        tree.set(&["a", "b"], Item::Int(1));
        tree.table_mut(&["a", "c"]).set(&["d"], Item::Int(2));
        tree.set(&["e"], Item::Int(3));
        let item = tree.into_item(&ctx).unwrap();
        let root = item.reader().as_map().unwrap();
        let a = root.get("a").and_then(|v| v.as_map()).unwrap();
        assert_eq!(a.get("b").and_then(|v| v.as_int()), Some(1));
        let c = a.get("c").and_then(|v| v.as_map()).unwrap();
        assert_eq!(c.get("d").and_then(|v| v.as_int()), Some(2));
        assert_eq!(root.keys().collect::<Vec<_>>(), vec!["a", "e"]);
    }

    #[test]
    fn test_value_and_table_on_one_key() {
        let ctx = Context::new();
        for order in [true, false] {
            let mut tree = PathTree::default();
            if order {
                tree.set(&["a"], Item::Int(1));
                tree.set(&["a", "b"], Item::Int(2));
            } else {
                tree.set(&["a", "b"], Item::Int(2));
                tree.set(&["a"], Item::Int(1));
            }
            let item = tree.into_item(&ctx).unwrap();
            let root = item.reader().as_map().unwrap();
            assert_eq!(root.get("a").and_then(|v| v.as_int()), Some(1));
            assert_eq!(root.get("a.b").and_then(|v| v.as_int()), Some(2));
        }
    }

    #[test]
    fn test_repeated_key_keeps_position() {
        let ctx = Context::new();
        let mut tree = PathTree::default();
        tree.set(&["x"], Item::Int(1));
        tree.set(&["y"], Item::Int(2));
        tree.set(&["x"], Item::Int(3));
        let item = tree.into_item(&ctx).unwrap();
        let root = item.reader().as_map().unwrap();
        assert_eq!(root.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(root.get("x").and_then(|v| v.as_int()), Some(3));
    }
}
