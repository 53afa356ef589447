//! # Categories
//!
//! The closed set of news sections and its explicit mapping table.
//!
//! - Lookup accepts the upper-snake code (`IT_SCIENCE`) or the Korean label (`IT/과학`).
//! - Matching is trimmed and case-insensitive for codes.
//! - Anything else is an `Unmappable` branch carrying the closest code as a hint.
//! - Each category owns its default trending keywords.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CategoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Politics,
    Economy,
    Society,
    Life,
    International,
    ItScience,
    Vehicle,
    TravelFood,
    Art,
}

/// (variant, code, Korean label). Exhaustive: every variant appears exactly once.
const CATEGORY_TABLE: [(Category, &str, &str); 9] = [
    (Category::Politics, "POLITICS", "정치"),
    (Category::Economy, "ECONOMY", "경제"),
    (Category::Society, "SOCIETY", "사회"),
    (Category::Life, "LIFE", "생활"),
    (Category::International, "INTERNATIONAL", "세계"),
    (Category::ItScience, "IT_SCIENCE", "IT/과학"),
    (Category::Vehicle, "VEHICLE", "자동차/교통"),
    (Category::TravelFood, "TRAVEL_FOOD", "여행/음식"),
    (Category::Art, "ART", "예술"),
];

/// Used when a trending query has no category scope.
pub const GENERAL_DEFAULT_KEYWORDS: [&str; 8] = [
    "주요뉴스", "핫이슈", "트렌드", "분석", "전망", "동향", "소식", "업데이트",
];

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Politics,
        Category::Economy,
        Category::Society,
        Category::Life,
        Category::International,
        Category::ItScience,
        Category::Vehicle,
        Category::TravelFood,
        Category::Art,
    ];

    pub fn code(self) -> &'static str {
        Self::row(self).1
    }

    pub fn label(self) -> &'static str {
        Self::row(self).2
    }

    fn row(self) -> (Category, &'static str, &'static str) {
        // The table is ordered like the enum.
        CATEGORY_TABLE[self as usize]
    }

    /// Map a raw profile/request string into the closed set.
    pub fn parse(raw: &str) -> Result<Category, CategoryError> {
        let s = raw.trim();
        let upper = s.to_ascii_uppercase();
        for (cat, code, label) in CATEGORY_TABLE {
            if upper == code || s == label {
                return Ok(cat);
            }
        }
        Err(CategoryError {
            raw: raw.to_string(),
            suggestion: closest_code(&upper),
        })
    }

    pub fn default_keywords(self) -> [&'static str; 8] {
        match self {
            Category::Vehicle => [
                "전기차", "자율주행", "대중교통", "도로교통", "친환경", "모빌리티", "자동차시장", "교통정책",
            ],
            Category::Economy => [
                "주식", "부동산", "금리", "환율", "투자", "경제정책", "기업실적", "시장동향",
            ],
            Category::Politics => [
                "정치", "국회", "정부", "외교", "정책", "선거", "여야", "국정감사",
            ],
            Category::Society => [
                "사회", "교육", "복지", "의료", "환경", "안전", "범죄", "사회문제",
            ],
            Category::ItScience => [
                "AI", "빅데이터", "클라우드", "블록체인", "5G", "반도체", "소프트웨어", "디지털전환",
            ],
            Category::International => [
                "국제", "외교", "무역", "글로벌", "외국", "국제정세", "외교정책", "국제협력",
            ],
            Category::Life => [
                "생활", "문화", "건강", "요리", "패션", "여행", "취미", "라이프스타일",
            ],
            Category::TravelFood => [
                "여행", "음식", "맛집", "관광", "호텔", "레스토랑", "카페", "여행지",
            ],
            Category::Art => [
                "예술", "영화", "음악", "미술", "공연", "문화", "창작", "아트",
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s)
    }
}

/// Map a list of raw names, keeping order and dropping duplicates.
/// Unmappable entries are returned separately so the caller decides how loud to be.
pub fn map_categories<S: AsRef<str>>(names: &[S]) -> (Vec<Category>, Vec<CategoryError>) {
    let mut ok = Vec::with_capacity(names.len());
    let mut dropped = Vec::new();
    for n in names {
        match Category::parse(n.as_ref()) {
            Ok(c) if !ok.contains(&c) => ok.push(c),
            Ok(_) => {}
            Err(e) => dropped.push(e),
        }
    }
    (ok, dropped)
}

fn closest_code(upper: &str) -> Option<&'static str> {
    CATEGORY_TABLE
        .iter()
        .map(|(_, code, _)| (*code, strsim::normalized_levenshtein(upper, code)))
        .filter(|(_, sim)| *sim >= 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_line_up_with_variants() {
        for cat in Category::ALL {
            assert_eq!(CATEGORY_TABLE[cat as usize].0, cat);
        }
    }

    #[test]
    fn parses_codes_and_labels() {
        assert_eq!(Category::parse("politics").unwrap(), Category::Politics);
        assert_eq!(Category::parse(" IT_SCIENCE ").unwrap(), Category::ItScience);
        assert_eq!(Category::parse("여행/음식").unwrap(), Category::TravelFood);
    }

    #[test]
    fn unmappable_carries_suggestion() {
        let e = Category::parse("ECONOMYY").unwrap_err();
        assert_eq!(e.raw, "ECONOMYY");
        assert_eq!(e.suggestion, Some("ECONOMY"));

        let e2 = Category::parse("gardening").unwrap_err();
        assert_eq!(e2.suggestion, None);
    }

    #[test]
    fn map_keeps_order_and_drops_duplicates() {
        let (ok, dropped) = map_categories(&["ART", "nope", "art", "경제"]);
        assert_eq!(ok, vec![Category::Art, Category::Economy]);
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn serde_uses_codes() {
        let s = serde_json::to_string(&Category::TravelFood).unwrap();
        assert_eq!(s, "\"TRAVEL_FOOD\"");
    }
}
