//! Lightweight title parsing.
//!
//! Pulls season/episode markers and a release year out of a free-form title
//! so lookups can use the bare name.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::MediaType;

static SEASON_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bS(\d{1,2})(?:\s*E(\d{1,4}))?\b").unwrap());
static SEASON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSeason\s*(\d{1,2})\b").unwrap());
static SEASON_CN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第\s*([0-9一二三四五六七八九十]+)\s*季").unwrap());
static EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bEP?(\d{1,4})\b").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub name: String,
    pub year: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    pub begin_season: Option<u32>,
    pub begin_episode: Option<u32>,
}

impl MetaInfo {
    pub fn parse(title: &str) -> Self {
        let mut rest = title.replace(['.', '_'], " ");
        let mut meta = MetaInfo::default();

        if let Some(caps) = SEASON_EPISODE.captures(&rest) {
            meta.begin_season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            meta.begin_episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
            rest = SEASON_EPISODE.replace(&rest, " ").into_owned();
        }
        if let Some(caps) = SEASON_WORD.captures(&rest) {
            meta.begin_season = meta
                .begin_season
                .or_else(|| caps.get(1).and_then(|m| m.as_str().parse().ok()));
            rest = SEASON_WORD.replace(&rest, " ").into_owned();
        }
        if let Some(caps) = SEASON_CN.captures(&rest) {
            meta.begin_season = meta
                .begin_season
                .or_else(|| caps.get(1).and_then(|m| parse_number(m.as_str())));
            rest = SEASON_CN.replace(&rest, " ").into_owned();
        }
        if let Some(caps) = EPISODE.captures(&rest) {
            meta.begin_episode = meta
                .begin_episode
                .or_else(|| caps.get(1).and_then(|m| m.as_str().parse().ok()));
            rest = EPISODE.replace(&rest, " ").into_owned();
        }

        // The last year wins: "Blade Runner 2049 2017" was released in 2017.
        let year = YEAR
            .find_iter(&rest)
            .last()
            .map(|m| (m.range(), m.as_str().to_string()));
        if let Some((range, year)) = year {
            meta.year = Some(year);
            rest.replace_range(range, " ");
        }

        if meta.begin_season.is_some() || meta.begin_episode.is_some() {
            meta.media_type = Some(MediaType::Tv);
        }

        let name = rest
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| c == '-' || c.is_whitespace())
            .to_string();
        meta.name = if name.is_empty() {
            title.trim().to_string()
        } else {
            name
        };
        meta
    }
}

/// Parse an arabic or chinese numeral up to 99.
fn parse_number(s: &str) -> Option<u32> {
    if let Ok(n) = s.parse() {
        return Some(n);
    }
    let digit = |c: char| "一二三四五六七八九".chars().position(|d| d == c).map(|i| i as u32 + 1);
    let chars: Vec<char> = s.chars().collect();
    match chars.as_slice() {
        ['十'] => Some(10),
        ['十', ones] => Some(10 + digit(*ones)?),
        [tens, '十'] => Some(digit(*tens)? * 10),
        [tens, '十', ones] => Some(digit(*tens)? * 10 + digit(*ones)?),
        [single] => digit(*single),
        _ => None,
    }
}
