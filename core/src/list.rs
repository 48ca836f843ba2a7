//! The local mirror of the server's todo collection.
//!
//! `TodoList` is only ever written wholesale: `replace` swaps in a fresh
//! server snapshot. There is no per-item mutation API, so the list cannot
//! hold anything the server did not return on the last successful load.

use crate::types::TodoItem;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoList {
    items: Vec<TodoItem>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection, dropping the placeholder seed record.
    /// Server order is kept.
    pub fn replace(&mut self, snapshot: Vec<TodoItem>) {
        self.items = snapshot.into_iter().filter(|t| !t.is_placeholder()).collect();
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&TodoItem> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose name contains `query`, case-insensitively.
    ///
    /// The returned iterator borrows the list, so it always reflects the
    /// latest `replace`. Clone it to walk the view again.
    pub fn filtered<'a>(&'a self, query: &str) -> Filtered<'a> {
        Filtered {
            inner: self.items.iter(),
            needle: query.to_lowercase(),
        }
    }
}

/// Lazy search view over a `TodoList`.
#[derive(Debug, Clone)]
pub struct Filtered<'a> {
    inner: std::slice::Iter<'a, TodoItem>,
    needle: String,
}

impl<'a> Iterator for Filtered<'a> {
    type Item = &'a TodoItem;

    fn next(&mut self) -> Option<Self::Item> {
        let needle = &self.needle;
        self.inner.find(|t| t.matches(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewTodo;
    use chrono::Utc;

    fn item(id: i64, name: &str) -> TodoItem {
        TodoItem {
            id,
            ..NewTodo::new(name).to_item(Utc::now())
        }
    }

    fn names<'a>(it: impl Iterator<Item = &'a TodoItem>) -> Vec<&'a str> {
        it.map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn replace_drops_placeholder_in_any_case() {
        let mut list = TodoList::new();
        list.replace(vec![item(1, "Item 1"), item(2, "Buy milk"), item(3, "ITEM 1")]);
        assert_eq!(names(list.items().iter()), vec!["Buy milk"]);
    }

    #[test]
    fn replace_keeps_server_order() {
        let mut list = TodoList::new();
        list.replace(vec![item(9, "c"), item(2, "a"), item(5, "b")]);
        let ids: Vec<i64> = list.items().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![9, 2, 5]);
    }

    #[test]
    fn filtered_matches_substring_ignoring_case() {
        let mut list = TodoList::new();
        list.replace(vec![item(1, "Buy Milk"), item(2, "Walk dog"), item(3, "milkshake")]);
        assert_eq!(names(list.filtered("MILK")), vec!["Buy Milk", "milkshake"]);
        assert_eq!(names(list.filtered("")).len(), 3);
        assert!(list.filtered("zebra").next().is_none());
    }

    #[test]
    fn filtered_view_is_restartable() {
        let mut list = TodoList::new();
        list.replace(vec![item(1, "alpha"), item(2, "beta"), item(3, "alphabet")]);
        let view = list.filtered("alpha");
        assert_eq!(view.clone().count(), 2);
        assert_eq!(names(view), vec!["alpha", "alphabet"]);
    }

    #[test]
    fn replace_with_same_snapshot_is_idempotent() {
        let snapshot = vec![item(1, "one"), item(2, "two")];
        let mut list = TodoList::new();
        list.replace(snapshot.clone());
        let first = list.clone();
        list.replace(snapshot);
        assert_eq!(list, first);
    }

    #[test]
    fn get_looks_up_by_id() {
        let mut list = TodoList::new();
        list.replace(vec![item(4, "four")]);
        assert_eq!(list.get(4).map(|t| t.name.as_str()), Some("four"));
        assert!(list.get(5).is_none());
    }
}
