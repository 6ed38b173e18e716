use std::collections::HashMap;

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::filter::ItemFilter;
use crate::meta::MetaInfo;
use crate::models::{
    ExistMediaInfo, LocalLookup, MediaInfo, MediaServerItem, MediaServerLibrary,
    MediaServerPlayItem, MediaServerType, NoExistsInfo,
};

#[derive(Debug, Deserialize)]
struct PlayUrlResponse {
    url: Option<String>,
}

/// Client for the host backend that owns the media servers, the download
/// chain and the local media registry.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    http_client: Client,
    api_key: Option<String>,
    servers: HashMap<String, MediaServerType>,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Self::new_with_client(base_url, api_key, http_client)
    }

    pub fn new_with_client(
        base_url: &str,
        api_key: Option<String>,
        http_client: Client,
    ) -> Result<Self, Error> {
        let mut url = Url::parse(base_url)?;
        // Ensure trailing slash for consistent joining
        if !url.path().ends_with('/') {
            url.path_segments_mut()
                .map_err(|_| Error::UrlParse(url::ParseError::EmptyHost))?
                .push("");
        }

        Ok(Self {
            base_url: url,
            http_client,
            api_key: api_key.filter(|k| !k.is_empty()),
            servers: HashMap::new(),
        })
    }

    /// Register which vendor a named media server runs.
    pub fn with_server(mut self, name: impl Into<String>, server_type: MediaServerType) -> Self {
        self.servers.insert(name.into(), server_type);
        self
    }

    pub fn server_type(&self, name: &str) -> Option<MediaServerType> {
        self.servers.get(name).copied()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        debug!("Backend request: {} {}", method, url);

        let mut request = self.http_client.request(method, url).query(query);

        if let Some(key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(data)
        } else {
            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
                StatusCode::NOT_FOUND => Err(Error::NotFound),
                _ => {
                    let text = response.text().await.unwrap_or_default();
                    Err(Error::ServerError(format!("{} - {}", status, text)))
                }
            }
        }
    }

    /// Like [`Self::request`], but a 404 or a `null` body means "nothing found".
    async fn request_optional<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Option<T>, Error> {
        match self.request::<Option<T>>(method, path, query, body).await {
            Err(Error::NotFound) => Ok(None),
            other => other,
        }
    }

    pub async fn get_play_url(&self, server: &str, item_id: &str) -> Result<Option<String>, Error> {
        let path = format!("mediaserver/{}/play_url", server);
        let query = [("item_id".to_string(), item_id.to_string())];
        let response: Option<PlayUrlResponse> = self
            .request_optional(reqwest::Method::GET, &path, &query, None)
            .await?;
        Ok(response.and_then(|r| r.url).filter(|url| !url.is_empty()))
    }

    pub async fn media_exists(&self, media: &MediaInfo) -> Result<Option<ExistMediaInfo>, Error> {
        let body = serde_json::to_value(media)?;
        self.request_optional(reqwest::Method::POST, "mediaserver/exists", &[], Some(&body))
            .await
    }

    pub async fn latest(
        &self,
        server: &str,
        count: u32,
        username: &str,
    ) -> Result<Option<Vec<MediaServerPlayItem>>, Error> {
        let path = format!("mediaserver/{}/latest", server);
        let query = [
            ("count".to_string(), count.to_string()),
            ("username".to_string(), username.to_string()),
        ];
        self.request_optional(reqwest::Method::GET, &path, &query, None)
            .await
    }

    pub async fn playing(
        &self,
        server: &str,
        count: u32,
        username: &str,
    ) -> Result<Option<Vec<MediaServerPlayItem>>, Error> {
        let path = format!("mediaserver/{}/playing", server);
        let query = [
            ("count".to_string(), count.to_string()),
            ("username".to_string(), username.to_string()),
        ];
        self.request_optional(reqwest::Method::GET, &path, &query, None)
            .await
    }

    pub async fn librarys(
        &self,
        server: &str,
        username: &str,
        hidden: bool,
    ) -> Result<Option<Vec<MediaServerLibrary>>, Error> {
        let path = format!("mediaserver/{}/librarys", server);
        let query = [
            ("username".to_string(), username.to_string()),
            ("hidden".to_string(), hidden.to_string()),
        ];
        self.request_optional(reqwest::Method::GET, &path, &query, None)
            .await
    }

    /// List items with the filter rendered in the server's own dialect.
    pub async fn items(
        &self,
        server: &str,
        username: &str,
        filter: &ItemFilter,
    ) -> Result<Option<Vec<MediaServerItem>>, Error> {
        let server_type = self
            .server_type(server)
            .ok_or_else(|| Error::UnknownServer(server.to_string()))?;
        let params = filter.params(server_type)?;

        let mut query = vec![("username".to_string(), username.to_string())];
        query.extend(params.to_query());

        let path = format!("mediaserver/{}/items", server);
        self.request_optional(reqwest::Method::GET, &path, &query, None)
            .await
    }

    pub async fn get_no_exists_info(
        &self,
        meta: &MetaInfo,
        media: &MediaInfo,
    ) -> Result<NoExistsInfo, Error> {
        let body = json!({
            "meta": meta,
            "mediainfo": media,
        });
        self.request(reqwest::Method::POST, "download/no_exists", &[], Some(&body))
            .await
    }

    pub async fn local_exists(&self, lookup: &LocalLookup) -> Result<Option<MediaServerItem>, Error> {
        let mut query = vec![("title".to_string(), lookup.title.clone())];
        if let Some(year) = lookup.year {
            query.push(("year".to_string(), year.to_string()));
        }
        if let Some(mtype) = &lookup.mtype {
            query.push(("mtype".to_string(), mtype.clone()));
        }
        if let Some(tmdbid) = lookup.tmdbid {
            query.push(("tmdbid".to_string(), tmdbid.to_string()));
        }
        if let Some(season) = lookup.season {
            query.push(("season".to_string(), season.to_string()));
        }
        self.request_optional(reqwest::Method::GET, "mediaserver/local/exists", &query, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_play_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mediaserver/emby-main/play_url"))
            .and(query_param("item_id", "42"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"url": "http://emby.local/web/index.html#!/item?id=42"})),
            )
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&mock_server.uri(), Some("secret".to_string())).unwrap();
        let url = client.get_play_url("emby-main", "42").await.unwrap();

        assert_eq!(
            url.as_deref(),
            Some("http://emby.local/web/index.html#!/item?id=42")
        );
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mediaserver/plex/latest"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mediaserver/exists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&mock_server.uri(), None).unwrap();

        assert_eq!(client.latest("plex", 18, "admin").await.unwrap(), None);
        assert_eq!(
            client.media_exists(&MediaInfo::default()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_server_errors_propagate() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mediaserver/emby/playing"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&mock_server.uri(), None).unwrap();
        let err = client.playing("emby", 12, "admin").await.unwrap_err();

        assert!(matches!(err, Error::ServerError(msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_items_use_vendor_dialect() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mediaserver/living-room/items"))
            .and(query_param("librarySectionID", "7"))
            .and(query_param("unwatched", "true"))
            .and(query_param("username", "admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"item_id": "1001", "title": "Heat", "year": "1995", "server": "plex"}
            ])))
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&mock_server.uri(), None)
            .unwrap()
            .with_server("living-room", MediaServerType::Plex);
        let filter = ItemFilter::new("7").with_played(Some(false));

        let items = client
            .items("living-room", "admin", &filter)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Heat"));
        assert_eq!(items[0].server, Some(MediaServerType::Plex));
    }

    #[tokio::test]
    async fn test_items_for_unknown_server() {
        let client = BackendClient::new("http://localhost:3001", None).unwrap();
        let err = client
            .items("nowhere", "admin", &ItemFilter::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownServer(name) if name == "nowhere"));
    }

    #[tokio::test]
    async fn test_items_filter_error_skips_request() {
        let client = BackendClient::new("http://localhost:3001", None)
            .unwrap()
            .with_server("plex", MediaServerType::Plex);
        let err = client
            .items("plex", "admin", &ItemFilter::new("movies"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Filter(_)));
    }

    #[tokio::test]
    async fn test_get_no_exists_info() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/download/no_exists"))
            .and(body_partial_json(json!({"meta": {"name": "Severance", "begin_season": 2}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "exists": false,
                "no_exists": {
                    "95396": {"2": {"season": 2, "episodes": [9, 10], "total_episode": 10, "start_episode": 1}}
                }
            })))
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&mock_server.uri(), None).unwrap();
        let meta = MetaInfo::parse("Severance S02");
        let info = client
            .get_no_exists_info(&meta, &MediaInfo::default())
            .await
            .unwrap();

        assert!(!info.exists);
        let missing = &info.no_exists["95396"][&2];
        assert_eq!(missing.episodes, vec![9, 10]);
    }

    #[tokio::test]
    async fn test_local_exists() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mediaserver/local/exists"))
            .and(query_param("title", "Dark"))
            .and(query_param("mtype", "tv"))
            .and(query_param("season", "3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"item_id": "abc123", "title": "Dark"})),
            )
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&mock_server.uri(), None).unwrap();
        let lookup = LocalLookup {
            title: "Dark".to_string(),
            mtype: Some("tv".to_string()),
            season: Some(3),
            ..Default::default()
        };

        let item = client.local_exists(&lookup).await.unwrap().unwrap();
        assert_eq!(item.item_id.as_deref(), Some("abc123"));
    }
}
