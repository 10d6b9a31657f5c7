//! Redb table definition and key-range utilities.
//!
//! All items live in one physical table. Logical namespaces are plain byte
//! prefixes of the key, so every prefix scan or prefix delete is a range
//! `[prefix, prefix_successor(prefix))` over that table.

use redb::{ReadableTable, Table, TableDefinition};

use crate::engine::StorageResult;

/// The physical table that stores all key-value pairs.
pub const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> =
    TableDefinition::new("keyport_data");

/// Concatenate a prefix and a key into the literal engine key.
pub fn compose_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut composed = Vec::with_capacity(prefix.len() + key.len());
    composed.extend_from_slice(prefix);
    composed.extend_from_slice(key);
    composed
}

/// The smallest key strictly greater than every key starting with `prefix`.
///
/// Increments the last byte that is not `0xFF` and truncates after it.
/// Returns `None` when no such key exists (empty or all-`0xFF` prefix), in
/// which case the range is unbounded above.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let pos = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut successor = prefix[..=pos].to_vec();
    successor[pos] += 1;
    Some(successor)
}

/// Exclusive upper bound covering every key up to and including `last`.
pub fn past_last_key(last: &[u8]) -> Vec<u8> {
    let mut end = Vec::with_capacity(last.len() + 1);
    end.extend_from_slice(last);
    end.push(0xFF);
    end
}

/// Range bounds for a scan that starts at `start` and stays within `prefix`.
///
/// The lower bound is `max(start, prefix)`: keys below the prefix can never
/// carry it.
pub fn prefix_scan_bounds(prefix: &[u8], start: &[u8]) -> (Vec<u8>, Option<Vec<u8>>) {
    let lower = if start < prefix { prefix.to_vec() } else { start.to_vec() };
    (lower, prefix_successor(prefix))
}

/// The data table as opened inside a write transaction.
pub type DataTable<'txn> = Table<'txn, &'static [u8], &'static [u8]>;

/// Delete every key in `[lower, upper)`, or `[lower, ..)` when `upper` is `None`.
///
/// # Errors
///
/// Returns an engine error if the delete fails.
pub fn delete_range(
    table: &mut DataTable<'_>,
    lower: &[u8],
    upper: Option<&[u8]>,
) -> StorageResult<()> {
    match upper {
        Some(upper) => table.retain_in(lower..upper, |_, _| false)?,
        None => table.retain_in(lower.., |_, _| false)?,
    }
    Ok(())
}

/// Delete `[first, last || 0xFF)`. Returns `false` if the table was empty.
///
/// # Errors
///
/// Returns an engine error if the table cannot be read or the delete fails.
pub fn clear_table(table: &mut DataTable<'_>) -> StorageResult<bool> {
    let first = table.first()?.map(|(key, _)| key.value().to_vec());
    let last = table.last()?.map(|(key, _)| key.value().to_vec());
    let (Some(first), Some(last)) = (first, last) else {
        return Ok(false);
    };
    let end = past_last_key(&last);
    delete_range(table, &first, Some(end.as_slice()))?;
    Ok(true)
}


#[cfg(test)]
mod proptest_tests {
    //! Property-based tests for prefix ranges.

    #![allow(clippy::expect_used)]

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn successor_bounds_every_extension(
            prefix in prop::collection::vec(any::<u8>(), 0..48),
            suffix in prop::collection::vec(any::<u8>(), 0..48),
        ) {
            let key = compose_key(&prefix, &suffix);
            if let Some(end) = prefix_successor(&prefix) {
                prop_assert!(key < end);
                prop_assert!(prefix < end);
            } else {
                prop_assert!(prefix.iter().all(|&b| b == 0xFF));
            }
        }

        #[test]
        fn range_contains_only_prefixed_keys(
            prefix in prop::collection::vec(any::<u8>(), 1..8),
            key in prop::collection::vec(any::<u8>(), 0..16),
        ) {
            let end = prefix_successor(&prefix);
            let in_range = key.as_slice() >= prefix.as_slice()
                && end.as_ref().map_or(true, |end| key.as_slice() < end.as_slice());
            prop_assert_eq!(in_range, key.starts_with(&prefix));
        }
    }
}
