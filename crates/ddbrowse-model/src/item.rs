//! Items and result sets.

use std::collections::HashMap;

use crate::attribute_value::AttributeValue;
use crate::table::TableInfo;

/// A DynamoDB item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// The items of one table loaded into the browser, with a dirty flag per item.
///
/// Write operations mark the item they touched as dirty so the caller knows
/// which items need to be put back to the table.
#[derive(Debug, Clone)]
pub struct ResultSet {
    table_info: TableInfo,
    items: Vec<Item>,
    dirty: Vec<bool>,
}

impl ResultSet {
    /// Creates a result set with every item clean.
    #[must_use]
    pub fn new(table_info: TableInfo, items: Vec<Item>) -> Self {
        let dirty = vec![false; items.len()];
        Self {
            table_info,
            items,
            dirty,
        }
    }

    /// The table the items belong to.
    #[must_use]
    pub fn table_info(&self) -> &TableInfo {
        &self.table_info
    }

    /// All items, in load order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the result set holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index`.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// Mutable access to the item at `index`.
    ///
    /// This does not mark the item dirty; callers that change it must call
    /// [`ResultSet::set_dirty`].
    pub fn item_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.items.get_mut(index)
    }

    /// Appends a new item and returns its index. New items start dirty.
    pub fn push(&mut self, item: Item) -> usize {
        self.items.push(item);
        self.dirty.push(true);
        self.items.len() - 1
    }

    /// Sets the dirty flag of the item at `index`. Out of range indices are ignored.
    pub fn set_dirty(&mut self, index: usize, dirty: bool) {
        if let Some(flag) = self.dirty.get_mut(index) {
            *flag = dirty;
        }
    }

    /// Returns `true` if the item at `index` has unsaved changes.
    #[must_use]
    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.get(index).copied().unwrap_or(false)
    }

    /// Indices of all dirty items, ascending.
    #[must_use]
    pub fn dirty_indices(&self) -> Vec<usize> {
        self.dirty
            .iter()
            .enumerate()
            .filter_map(|(i, dirty)| dirty.then_some(i))
            .collect()
    }

    /// Marks every item clean.
    pub fn clear_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|flag| *flag = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::KeyAttribute;

    fn make_result_set() -> ResultSet {
        let info = TableInfo::new("test", KeyAttribute::new("pk"));
        let items = (0..3)
            .map(|i| {
                let mut item = Item::new();
                item.insert("pk".to_owned(), AttributeValue::string(format!("item-{i}")));
                item
            })
            .collect();
        ResultSet::new(info, items)
    }

    #[test]
    fn test_should_track_dirty_items() {
        let mut rs = make_result_set();
        assert!(rs.dirty_indices().is_empty());

        rs.set_dirty(2, true);
        rs.set_dirty(7, true);
        assert!(rs.is_dirty(2));
        assert!(!rs.is_dirty(7));
        assert_eq!(rs.dirty_indices(), vec![2]);

        rs.clear_dirty();
        assert!(!rs.is_dirty(2));
    }

    #[test]
    fn test_should_mark_pushed_items_dirty() {
        let mut rs = make_result_set();
        let idx = rs.push(Item::new());
        assert_eq!(idx, 3);
        assert_eq!(rs.len(), 4);
        assert!(rs.is_dirty(idx));
    }
}
