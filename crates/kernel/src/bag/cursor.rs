//! Bag: the ordered, limited result set of one built query.

use crate::models::Record;
use crate::store::Selection;

/// Forward-only, rewindable cursor over the rows of one query.
///
/// Rows arrive in the compiled sort order (ties broken by ascending uid),
/// so iterating an unmodified bag twice yields the same sequence.
#[derive(Debug, Clone)]
pub struct Bag<R> {
    rows: Vec<R>,
    position: usize,
    total: u64,
}

impl<R: Record> Bag<R> {
    pub(crate) fn new(selection: Selection<R>) -> Self {
        Self {
            rows: selection.rows,
            position: 0,
            total: selection.total,
        }
    }

    /// Move back to the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// The row at the cursor, `None` once the cursor ran past the end.
    pub fn current(&self) -> Option<&R> {
        self.rows.get(self.position)
    }

    /// Advance the cursor and return the new current row.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&R> {
        if self.position < self.rows.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Whether the cursor points at a row.
    pub fn valid(&self) -> bool {
        self.position < self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in the bag, after the limit was applied.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Rows matching the query before the limit was applied.
    pub fn count_without_limit(&self) -> u64 {
        self.total
    }

    /// Iterate every row from the start without moving the cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Uids in bag order.
    pub fn uids(&self) -> Vec<u32> {
        self.rows.iter().map(Record::uid).collect()
    }

    /// Comma-separated uids in bag order, e.g. `"3,1,2"`.
    pub fn uid_list(&self) -> String {
        self.uids()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Take the rows out of the bag.
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }
}

impl<'a, R: Record> IntoIterator for &'a Bag<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn bag(uids: &[u32], total: u64) -> Bag<Category> {
        Bag::new(Selection {
            rows: uids.iter().map(|uid| Category::new(*uid, "c")).collect(),
            total,
        })
    }

    #[test]
    fn cursor_walks_and_rewinds() {
        let mut bag = bag(&[3, 1], 2);
        assert_eq!(bag.current().map(Record::uid), Some(3));
        assert_eq!(bag.next().map(Record::uid), Some(1));
        assert!(bag.next().is_none());
        assert!(!bag.valid());
        assert!(bag.next().is_none());

        bag.rewind();
        assert_eq!(bag.current().map(Record::uid), Some(3));
    }

    #[test]
    fn empty_bag() {
        let bag = bag(&[], 0);
        assert!(bag.is_empty());
        assert_eq!(bag.count(), 0);
        assert!(bag.current().is_none());
    }

    #[test]
    fn counts_with_and_without_limit() {
        let bag = bag(&[1, 2], 7);
        assert_eq!(bag.count(), 2);
        assert_eq!(bag.count_without_limit(), 7);
        assert_eq!(bag.uid_list(), "1,2");
    }
}
