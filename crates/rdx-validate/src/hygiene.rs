use std::collections::{BTreeMap, BTreeSet};

use rdx_core::TaskRecord;

/// One message per family that shows up in more than one split, sorted by family.
pub fn check_split_hygiene(records: &[TaskRecord]) -> Vec<String> {
    let mut family_splits: BTreeMap<&str, BTreeSet<&'static str>> = BTreeMap::new();
    for record in records {
        family_splits
            .entry(record.family.as_str())
            .or_default()
            .insert(record.split.as_str());
    }

    family_splits
        .into_iter()
        .filter(|(_, splits)| splits.len() > 1)
        .map(|(family, splits)| {
            let joined = splits.into_iter().collect::<Vec<_>>().join(", ");
            format!("family '{family}' appears in multiple splits: {joined}")
        })
        .collect()
}

/// Distinct family count across `records`.
pub fn family_count(records: &[TaskRecord]) -> usize {
    records.iter().map(|r| r.family.as_str()).collect::<BTreeSet<_>>().len()
}
