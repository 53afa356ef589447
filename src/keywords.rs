//! Keyword extraction for trending.
//!
//! Whitespace tokenizer with a fixed rejection filter tuned for Korean news
//! headlines. Pure: same text in, same tokens out, in order, duplicates kept.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashSet;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // newsroom boilerplate
        "속보", "영상", "단독", "인터뷰", "기자", "사진", "종합", "뉴스", "기사", "외신",
        "현장", "보도", "취재", "논평", "사설", "칼럼", "특집", "기획", "리포트",
        // time
        "오늘", "내일", "어제", "이번", "지난", "현재", "최근", "곧", "이제",
        "년", "월", "일", "시", "분", "초", "주", "달", "년도",
        // particles, connectives, copulas
        "것", "수", "등", "및", "또는", "그리고", "하지만", "그러나", "따라서",
        "있다", "없다", "하다", "되다", "이다", "아니다", "같다", "다르다",
        "위해", "통해", "대해", "관해", "대한", "관련", "위한", "통한",
        // institutions
        "정부", "대통령", "국회", "한국", "대한민국", "국가", "정부기관", "공공기관",
        "시청", "구청", "군청", "도청", "청", "부", "처", "원",
        // intensifiers
        "최대", "최소", "매우", "정말", "진짜", "완전", "엄청", "너무", "아주",
        "많이", "조금", "약간", "좀", "더", "가장", "제일", "특히", "특별히",
        // vague nouns
        "내용", "정보", "자료", "데이터", "결과", "상황", "문제", "이슈", "사건",
        "분석", "전망", "동향", "소식", "업데이트", "변화", "발전", "진전",
        "영향", "효과", "원인", "이유", "목적", "방법", "과정",
    ]
    .into_iter()
    .collect()
});

/// Any token containing one of these is a grammatical fragment, not a topic.
const MEANINGLESS_FRAGMENTS: &[&str] = &[
    "영화의", "기사의", "뉴스의", "사진의", "영상의", "내용의", "정보의",
    "추출할", "분석할", "조사할", "확인할", "검토할", "검증할",
    "관련된", "대한", "위한", "통한", "통해", "대해", "관해",
    "있는", "없는", "같은", "다른", "이런", "그런", "저런",
    "하는", "되는", "이되는",
];

const SPECIAL_CHARS: &[char] = &['#', '@', '$', '%', '^', '&', '*', '(', ')'];

/// Decode HTML entities, drop tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let untagged = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&untagged, " ").trim().to_string()
}

/// Split, strip non-alphanumerics, filter. See [`is_keyword`].
pub fn extract(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|tok| tok.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|tok| is_keyword(tok))
        .collect()
}

/// Rejection filter applied to an already stripped token.
pub fn is_keyword(tok: &str) -> bool {
    let len = tok.chars().count();
    if len < 2 || STOPWORDS.contains(tok) {
        return false;
    }
    if tok.chars().all(|c| c.is_numeric()) {
        return false;
    }
    // Unreachable through `extract`, which strips these first; guards direct callers.
    if tok.contains(SPECIAL_CHARS) {
        return false;
    }

    static RE_SHORT_LATIN: OnceCell<Regex> = OnceCell::new();
    let re_short = RE_SHORT_LATIN.get_or_init(|| Regex::new(r"^[A-Za-z]{1,2}$").unwrap());
    if re_short.is_match(tok) {
        return false;
    }

    if len >= 3 && is_single_char_run(tok) {
        return false;
    }

    !MEANINGLESS_FRAGMENTS.iter().any(|f| tok.contains(f))
}

fn is_single_char_run(tok: &str) -> bool {
    let mut chars = tok.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}
