/// Stable sort `records` by the offset `key` returns and split off the ones repeating the
/// offset of their predecessor.
///
/// Returns `(unique, duplicates)`. Records sharing an offset keep their original order, so the
/// first declared one is kept.
///
/// ```rust
/// use fieldscope::field::sort_by_offset;
///
/// let (unique, duplicates) = sort_by_offset(vec![("b", 8), ("a", 4), ("c", 8)], |r| r.1);
/// assert_eq!(unique, [("a", 4), ("b", 8)]);
/// assert_eq!(duplicates, [("c", 8)]);
/// ```
pub fn sort_by_offset<T, K, F>(mut records: Vec<T>, key: F) -> (Vec<T>, Vec<T>)
where
    K: PartialEq + Ord,
    F: Fn(&T) -> K,
{
    records.sort_by_key(&key);

    let mut unique: Vec<T> = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();
    for record in records {
        match unique.last() {
            Some(last) if key(last) == key(&record) => duplicates.push(record),
            _ => unique.push(record),
        }
    }
    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_of_equal_offsets() {
        let records = vec![(0, 30), (1, 10), (2, 30), (3, 20), (4, 10)];
        let (unique, duplicates) = sort_by_offset(records, |r| r.1);
        assert_eq!(unique, [(1, 10), (3, 20), (0, 30)]);
        assert_eq!(duplicates, [(4, 10), (2, 30)]);
    }

    #[test]
    fn composite_keys() {
        let records = vec![(5u64, 2u64), (5, 3), (5, 2)];
        let (unique, duplicates) = sort_by_offset(records, |r| *r);
        assert_eq!(unique, [(5, 2), (5, 3)]);
        assert_eq!(duplicates, [(5, 2)]);
    }
}
