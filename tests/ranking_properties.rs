// tests/ranking_properties.rs
//
// Pure ranking pieces through the public API: keyword filter, the two scoring
// formulas, and diversification bounds.

use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};

use news_ranking_engine::category::Category;
use news_ranking_engine::diversify::diversify;
use news_ranking_engine::keywords::extract;
use news_ranking_engine::model::ArticleSignal;
use news_ranking_engine::scoring::{popularity, priority};

#[test]
fn extractor_filters_noise_tokens() {
    let out = extract("ㅋㅋㅋ 123 AI 반도체");
    assert!(out.contains(&"반도체".to_string()));
    assert!(!out.contains(&"ㅋㅋㅋ".to_string()));
    assert!(!out.contains(&"123".to_string()));
    assert!(!out.contains(&"AI".to_string()));
}

#[test]
fn popularity_scenario() {
    let now = Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap();
    let p = popularity(999, 0, true, now - Duration::hours(10), now);
    assert!((p - 0.54).abs() < 1e-3, "popularity = {p}");
}

#[test]
fn priority_weights_trust_views_and_recency() {
    let now = Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap();
    // 0.4 trust + min(0.3, log10(1000)/log10(1001)) + 0.3 fresh → clamped to 1.0
    assert!((priority(999, true, now, now) - 1.0).abs() < 1e-9);
    // 0 + log10(2)/log10(1001) + 0 (older than 72h)
    let q = priority(1, false, now - Duration::hours(100), now);
    assert!((q - 2f64.log10() / 1001f64.log10()).abs() < 1e-9);
}

fn signal(id: u64, category: Category, trusted: bool) -> ArticleSignal {
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

#[test]
fn diversify_bounds_hold_for_skewed_pools() {
    // 12 economy, 2 art, 1 politics; some duplicated.
    let mut pool: Vec<ArticleSignal> = (1..=12).map(|i| signal(i, Category::Economy, i > 9)).collect();
    pool.push(signal(20, Category::Art, false));
    pool.push(signal(21, Category::Art, true));
    pool.push(signal(30, Category::Politics, false));
    pool.push(signal(11, Category::Economy, true));

    for k in 0..=20 {
        let out = diversify(&pool, k);
        assert!(out.len() <= k);
        let ids: HashSet<u64> = out.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), out.len(), "duplicate ids for k={k}");
    }

    // k = 3 → cap 1 per category, no backfill needed.
    let out = diversify(&pool, 3);
    let mut per: HashMap<Category, Vec<u64>> = HashMap::new();
    for a in &out {
        per.entry(a.category).or_default().push(a.id);
    }
    assert_eq!(per[&Category::Economy], vec![10]);
    assert_eq!(per[&Category::Art], vec![21]);
    assert_eq!(per[&Category::Politics], vec![30]);

    // k = 9 → cap 3, economy filled with its trusted first, backfill tops up to 9.
    let out = diversify(&pool, 9);
    assert_eq!(out.len(), 9);
    let economy: Vec<u64> = out
        .iter()
        .filter(|a| a.category == Category::Economy)
        .map(|a| a.id)
        .collect();
    assert_eq!(&economy[..3], &[10, 11, 12]);
}
