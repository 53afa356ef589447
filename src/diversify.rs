// src/diversify.rs
//! Category-balanced selection.

use std::collections::{BTreeMap, HashSet};

use crate::category::Category;
use crate::model::{ArticleId, ArticleSignal};

/// Pick up to `target` articles, at most `max(1, target / categories)` per category,
/// trusted first within each category, then backfill from the rest (trusted first).
///
/// Duplicate ids in the input keep their first occurrence. Categories are visited in
/// their fixed enum order and every sort is stable, so the output is deterministic.
pub fn diversify(candidates: &[ArticleSignal], target: usize) -> Vec<ArticleSignal> {
    let mut seen: HashSet<ArticleId> = HashSet::new();
    let pool: Vec<&ArticleSignal> = candidates.iter().filter(|a| seen.insert(a.id)).collect();

    let mut groups: BTreeMap<Category, Vec<&ArticleSignal>> = BTreeMap::new();
    for &a in &pool {
        groups.entry(a.category).or_default().push(a);
    }
    if target == 0 || groups.is_empty() {
        return Vec::new();
    }

    let cap = (target / groups.len()).max(1);
    let mut picked: Vec<&ArticleSignal> = Vec::with_capacity(target);
    for (_, mut members) in groups {
        members.sort_by_key(|a| !a.trusted);
        picked.extend(members.into_iter().take(cap));
    }

    if picked.len() < target {
        let taken: HashSet<ArticleId> = picked.iter().map(|a| a.id).collect();
        let mut rest: Vec<&ArticleSignal> = pool.iter().copied().filter(|a| !taken.contains(&a.id)).collect();
        rest.sort_by_key(|a| !a.trusted);
        let missing = target - picked.len();
        picked.extend(rest.into_iter().take(missing));
    }

    picked.truncate(target);
    picked.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn a(id: u64, category: Category, trusted: bool) -> ArticleSignal {
        ArticleSignal {
            id,
            category,
            title: String::new(),
            view_count: 0,
            share_count: 0,
            trusted,
            published_at: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ids(v: &[ArticleSignal]) -> Vec<u64> {
        v.iter().map(|a| a.id).collect()
    }

    #[test]
    fn empty_input_or_zero_target_is_empty() {
        assert!(diversify(&[], 10).is_empty());
        assert!(diversify(&[a(1, Category::Art, true)], 0).is_empty());
    }

    #[test]
    fn caps_each_category_and_prefers_trusted() {
        let mut c = Vec::new();
        for i in 0..8 {
            c.push(a(i, Category::Economy, i % 2 == 1));
        }
        for i in 100..102 {
            c.push(a(i, Category::Art, false));
        }
        // cap = 4 / 2 = 2
        let out = diversify(&c, 4);
        assert_eq!(ids(&out), vec![1, 3, 100, 101]);
    }

    #[test]
    fn backfills_from_remaining_pool() {
        let c = vec![
            a(1, Category::Economy, false),
            a(2, Category::Economy, false),
            a(3, Category::Economy, true),
            a(4, Category::Economy, false),
            a(10, Category::Politics, false),
        ];
        // cap = 5 / 2 = 2: politics gives 10, economy gives 3 and 1, backfill adds 2 and 4.
        let out = diversify(&c, 5);
        assert_eq!(ids(&out), vec![10, 3, 1, 2, 4]);
    }

    #[test]
    fn never_exceeds_target_nor_repeats_ids() {
        let mut c: Vec<_> = Category::ALL
            .iter()
            .enumerate()
            .flat_map(|(i, cat)| (0..3).map(move |j| a((i * 10 + j) as u64, *cat, j == 0)))
            .collect();
        c.push(c[0].clone());

        for target in [1, 3, 9, 10, 40] {
            let out = diversify(&c, target);
            assert!(out.len() <= target);
            let unique: HashSet<_> = out.iter().map(|x| x.id).collect();
            assert_eq!(unique.len(), out.len());
        }

        // Without backfill each category holds at most the cap.
        let out = diversify(&c, 9);
        let mut per: HashMap<Category, usize> = HashMap::new();
        for x in &out {
            *per.entry(x.category).or_default() += 1;
        }
        assert!(per.values().all(|&n| n <= 1));
        assert!(out.iter().all(|x| x.trusted));
    }
}
