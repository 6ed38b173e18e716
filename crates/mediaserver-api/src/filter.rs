//! Vendor-neutral item filter and its per-vendor query parameters.
//!
//! An [`ItemFilter`] holds one logical catalog query. Each vendor gets its own
//! pure mapping function; [`ItemFilter::params`] recomputes the mapping from
//! the current criteria on every call, merges caller extras and drops unset
//! fields.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::error::FilterError;
use crate::models::MediaServerType;

/// Fields requested from Emby/Jellyfin for every listed item.
pub const EMBY_ITEM_FIELDS: &str =
    "ProviderIds,OriginalTitle,ProductionYear,Path,UserDataPlayCount,UserDataLastPlayedDate,ParentId";

pub const DEFAULT_START_INDEX: u32 = 0;
/// Servers cope badly with larger pages, but nothing enforces this.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Query parameters for one vendor, with unset fields already removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VendorParams(BTreeMap<String, Value>);

impl VendorParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Render as `key=value` pairs for a query string.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// Mappings for all vendors built from the same criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorMappings {
    pub emby: VendorParams,
    pub jellyfin: VendorParams,
    pub plex: VendorParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFilter {
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    pub is_played: Option<bool>,
    pub resume: Option<bool>,
    pub start_index: u32,
    pub limit: u32,
    extra: HashMap<MediaServerType, BTreeMap<String, String>>,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            parent_id: None,
            title: None,
            year: None,
            is_played: None,
            resume: None,
            start_index: DEFAULT_START_INDEX,
            limit: DEFAULT_PAGE_SIZE,
            extra: HashMap::new(),
        }
    }
}

impl ItemFilter {
    pub fn new(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year;
        self
    }

    pub fn with_played(mut self, is_played: Option<bool>) -> Self {
        self.is_played = is_played;
        self
    }

    pub fn with_resume(mut self, resume: Option<bool>) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_page(mut self, start_index: u32, limit: u32) -> Self {
        self.set_page(start_index, limit);
        self
    }

    /// Move the pagination window. Nothing tracks pages between calls, so
    /// callers set this before every paged fetch.
    pub fn set_page(&mut self, start_index: u32, limit: u32) -> &mut Self {
        self.start_index = start_index;
        self.limit = limit;
        self
    }

    /// Merge vendor-specific parameters. Later calls win on key conflicts and
    /// extras win over computed parameters.
    pub fn set_extra_params<I, K, V>(&mut self, server: MediaServerType, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let extra = self.extra.entry(server).or_default();
        for (key, value) in params {
            extra.insert(key.into(), value.into());
        }
        self
    }

    pub fn extra_params(&self, server: MediaServerType) -> Option<&BTreeMap<String, String>> {
        self.extra.get(&server)
    }

    /// Parameters for one vendor. Only that vendor's mapping is computed, so a
    /// non-numeric parent id fails Plex and nothing else.
    pub fn params(&self, server: MediaServerType) -> Result<VendorParams, FilterError> {
        let raw = match server {
            MediaServerType::Emby => emby_mapping(self),
            MediaServerType::Jellyfin => jellyfin_mapping(self),
            MediaServerType::Plex => plex_mapping(self)?,
        };
        Ok(self.finish(server, raw))
    }

    pub fn emby_params(&self) -> Result<VendorParams, FilterError> {
        self.params(MediaServerType::Emby)
    }

    pub fn jellyfin_params(&self) -> Result<VendorParams, FilterError> {
        self.params(MediaServerType::Jellyfin)
    }

    pub fn plex_params(&self) -> Result<VendorParams, FilterError> {
        self.params(MediaServerType::Plex)
    }

    /// Rebuild every vendor's mapping; fails when any one of them does.
    pub fn build_all(&self) -> Result<VendorMappings, FilterError> {
        Ok(VendorMappings {
            emby: self.params(MediaServerType::Emby)?,
            jellyfin: self.params(MediaServerType::Jellyfin)?,
            plex: self.params(MediaServerType::Plex)?,
        })
    }

    fn finish(&self, server: MediaServerType, raw: BTreeMap<String, Value>) -> VendorParams {
        let mut params: BTreeMap<String, Value> =
            raw.into_iter().filter(|(_, v)| !v.is_null()).collect();
        if let Some(extra) = self.extra.get(&server) {
            for (key, value) in extra {
                params.insert(key.clone(), Value::String(value.clone()));
            }
        }
        VendorParams(params)
    }
}

fn optional<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

fn emby_mapping(filter: &ItemFilter) -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("ParentId".to_string(), optional(filter.parent_id.clone())),
        ("Fields".to_string(), Value::from(EMBY_ITEM_FIELDS)),
        ("IsPlayed".to_string(), optional(filter.is_played)),
        // Emby's recursive flag follows `resume`; kept as the backend expects it.
        ("Recursive".to_string(), optional(filter.resume)),
        ("Limit".to_string(), Value::from(filter.limit)),
        ("StartIndex".to_string(), Value::from(filter.start_index)),
    ])
}

fn jellyfin_mapping(filter: &ItemFilter) -> BTreeMap<String, Value> {
    emby_mapping(filter)
}

fn plex_mapping(filter: &ItemFilter) -> Result<BTreeMap<String, Value>, FilterError> {
    let parent_id = filter
        .parent_id
        .as_deref()
        .ok_or(FilterError::MissingParentId {
            server: MediaServerType::Plex,
        })?;
    let section: i64 = parent_id
        .trim()
        .parse()
        .map_err(|source| FilterError::InvalidParentId {
            value: parent_id.to_string(),
            source,
        })?;

    let year = match filter.year.as_deref() {
        Some(year) => Some(year.trim().parse::<i64>().map_err(|source| {
            FilterError::InvalidYear {
                value: year.to_string(),
                source,
            }
        })?),
        None => None,
    };

    Ok(BTreeMap::from([
        ("librarySectionID".to_string(), Value::from(section)),
        ("title".to_string(), optional(filter.title.clone())),
        ("year".to_string(), optional(year)),
        ("unwatched".to_string(), optional(filter.is_played.map(|p| !p))),
        ("inProgress".to_string(), optional(filter.resume)),
    ]))
}
