use std::collections::HashMap;

use crate::db::{Row, Value};

/// Inner-join named result sets on `merge_keys`.
///
/// The first set is the accumulator; each later set is joined onto it in
/// turn, and fields from the later set win when names collide. Output order
/// follows the accumulator.
///
/// Returns an empty result, not an error, when any non-empty set lacks one of
/// the merge keys in its first record.
pub fn merge_results(results: &[(String, Vec<Row>)], merge_keys: &[String]) -> Vec<Row> {
    let Some(((_, first), rest)) = results.split_first() else {
        return vec![];
    };

    for (name, rows) in results {
        let Some(head) = rows.first() else {
            continue;
        };
        let missing: Vec<&str> = merge_keys
            .iter()
            .filter(|key| !head.contains(key))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            tracing::warn!(result_set = %name, ?missing, "result set is missing merge keys");
            return vec![];
        }
    }

    rest.iter().fold(first.clone(), |merged, (_, rows)| {
        merge_two(&merged, rows, merge_keys)
    })
}

fn merge_two(left: &[Row], right: &[Row], merge_keys: &[String]) -> Vec<Row> {
    // Later records win when several share a key tuple.
    let lookup: HashMap<Vec<Option<String>>, &Row> = right
        .iter()
        .map(|row| (key_tuple(row, merge_keys), row))
        .collect();

    left.iter()
        .filter_map(|row| {
            let other = lookup.get(&key_tuple(row, merge_keys))?;
            let mut merged = row.clone();
            for (field, value) in other.iter() {
                merged.insert(field, value.clone());
            }
            Some(merged)
        })
        .collect()
}

/// Stringified merge-key values; a missing field and a null compare equal.
fn key_tuple(row: &Row, merge_keys: &[String]) -> Vec<Option<String>> {
    merge_keys
        .iter()
        .map(|key| match row.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.display()),
        })
        .collect()
}
