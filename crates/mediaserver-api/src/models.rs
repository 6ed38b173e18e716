use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Media server vendors the gateway can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaServerType {
    Emby,
    Jellyfin,
    Plex,
}

serde_plain::derive_display_from_serialize!(MediaServerType);
serde_plain::derive_fromstr_from_deserialize!(MediaServerType);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "movie", alias = "电影")]
    Movie,
    #[serde(rename = "tv", alias = "电视剧")]
    Tv,
    #[serde(rename = "unknown", alias = "未知")]
    Unknown,
}

serde_plain::derive_display_from_serialize!(MediaType);
serde_plain::derive_fromstr_from_deserialize!(MediaType);

/// Item ids are strings on Emby/Jellyfin and integers on Plex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{n}"),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

/// Episodes a media server already holds for one title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExistMediaInfo {
    #[serde(rename = "type", default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub seasons: BTreeMap<u32, Vec<u32>>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub itemid: Option<ItemId>,
}

/// Episodes missing from the library for one season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotExistMediaInfo {
    pub season: Option<u32>,
    pub episodes: Vec<u32>,
    pub total_episode: u32,
    pub start_episode: u32,
}

/// Result of the download chain's missing-episode lookup.
///
/// `no_exists` is keyed by media key (tmdb id, else douban id) and then by
/// season number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoExistsInfo {
    pub exists: bool,
    pub no_exists: HashMap<String, BTreeMap<u32, NotExistMediaInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerPlayItem {
    pub id: Option<ItemId>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryPath {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerLibrary {
    pub server_name: Option<String>,
    pub server: Option<MediaServerType>,
    pub id: Option<ItemId>,
    pub name: Option<String>,
    pub path: Option<LibraryPath>,
    #[serde(rename = "type")]
    pub library_type: Option<String>,
    pub image: Option<String>,
    pub image_list: Option<Vec<String>>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerItemUserState {
    pub played: Option<bool>,
    pub resume: Option<bool>,
    /// Unix timestamp in seconds, as sent by the server.
    pub last_played_date: Option<String>,
    pub play_count: Option<u32>,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerItem {
    pub id: Option<ItemId>,
    pub server_name: Option<String>,
    pub server: Option<MediaServerType>,
    pub library: Option<ItemId>,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<String>,
    pub tmdbid: Option<i64>,
    pub imdbid: Option<String>,
    pub tvdbid: Option<String>,
    pub path: Option<String>,
    pub seasoninfo: Option<BTreeMap<u32, Vec<u32>>>,
    pub note: Option<String>,
    pub lst_mod_date: Option<String>,
    pub user_state: Option<MediaServerItemUserState>,
}

/// Media descriptor posted by clients of the existence endpoints.
///
/// Fields the gateway does not interpret are kept in `extra` and forwarded
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    pub title: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub year: Option<String>,
    pub season: Option<u32>,
    pub tmdb_id: Option<i64>,
    pub douban_id: Option<String>,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i64>,
    pub original_title: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Clients send years both as `"1995"` and as `1995`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    }))
}

impl MediaInfo {
    /// Key under which the download chain reports missing episodes.
    pub fn media_key(&self) -> Option<String> {
        self.tmdb_id
            .filter(|id| *id != 0)
            .map(|id| id.to_string())
            .or_else(|| self.douban_id.clone().filter(|id| !id.is_empty()))
    }
}

/// Lookup against the local media registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalLookup {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Passed through as given; the registry decides what it accepts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdbid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
}
