//! Member display names and contribution aggregation.

use std::collections::HashSet;
use std::hash::Hash;

/// Username that inherits the contributions of deleted members.
pub const SENTINEL_USERNAME: &str = "deleted";

/// `"{first} {last}"`, trimmed so a missing half leaves no stray space.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}").trim().to_string()
}

pub fn short_name(first_name: &str) -> String {
    first_name.to_string()
}

/// Distinct article ids in the order the member first contributed to them.
///
/// `article_ids` is the parent article of each of the member's versions, in
/// version creation order.
pub fn contributions_by_article<T, I>(article_ids: I) -> Vec<T>
where
    T: Copy + Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    article_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect()
}
