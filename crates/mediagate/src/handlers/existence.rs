use std::collections::BTreeMap;

use axum::{extract::State, Json};
use mediaserver_api::models::{LocalLookup, MediaInfo, NotExistMediaInfo};
use mediaserver_api::{MediaType, MetaInfo};
use serde::Deserialize;
use tracing::debug;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    extract::{AppJson, AppQuery},
    models::{ApiResponse, ExistsData, LocalItemRef},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub mtype: Option<String>,
    pub tmdbid: Option<i64>,
    pub season: Option<u32>,
}

/// Look a title up in the local media registry.
pub async fn exists_local(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppQuery(query): AppQuery<ExistsQuery>,
) -> AppResult<Json<ApiResponse<ExistsData>>> {
    let meta = MetaInfo::parse(query.title.as_deref().unwrap_or_default());
    let season = query.season.filter(|s| *s != 0).or(meta.begin_season);

    let lookup = LocalLookup {
        title: meta.name,
        year: query.year,
        mtype: query.mtype,
        tmdbid: query.tmdbid,
        season,
    };
    let exist = state.media_server_oper.exists(&lookup).await?;
    debug!("Local lookup for {:?}: found={}", lookup.title, exist.is_some());

    let item = LocalItemRef {
        id: exist.as_ref().and_then(|item| item.item_id.clone()),
    };
    Ok(Json(ApiResponse {
        success: exist.is_some(),
        message: None,
        data: Some(ExistsData { item }),
    }))
}

/// Episodes the media servers already have, by season.
pub async fn exists_remote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppJson(media_in): AppJson<MediaInfo>,
) -> AppResult<Json<BTreeMap<u32, Vec<u32>>>> {
    let Some(mut exists) = state.media_server_chain.media_exists(&media_in).await? else {
        return Ok(Json(BTreeMap::new()));
    };

    if let Some(season) = media_in.season.filter(|s| *s != 0) {
        let episodes = exists.seasons.remove(&season).unwrap_or_default();
        return Ok(Json(BTreeMap::from([(season, episodes)])));
    }
    Ok(Json(exists.seasons))
}

/// Missing movie or missing episodes of a show.
pub async fn not_exists(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppJson(media_in): AppJson<MediaInfo>,
) -> AppResult<Json<Vec<NotExistMediaInfo>>> {
    let meta = request_meta(&media_in);
    let info = state
        .download_chain
        .get_no_exists_info(&meta, &media_in)
        .await?;

    if media_in.media_type == Some(MediaType::Movie) {
        return Ok(Json(if info.exists {
            Vec::new()
        } else {
            vec![NotExistMediaInfo::default()]
        }));
    }

    let missing = media_in
        .media_key()
        .and_then(|key| info.no_exists.get(&key))
        .map(|seasons| seasons.values().cloned().collect())
        .unwrap_or_default();
    Ok(Json(missing))
}

/// Title metadata with the request's explicit fields taking precedence.
fn request_meta(media_in: &MediaInfo) -> MetaInfo {
    let mut meta = MetaInfo::parse(media_in.title.as_deref().unwrap_or_default());
    if let Some(media_type) = media_in.media_type {
        meta.media_type = Some(media_type);
    }
    if let Some(season) = media_in.season.filter(|s| *s != 0) {
        meta.begin_season = Some(season);
        meta.media_type = Some(MediaType::Tv);
    }
    if let Some(year) = media_in.year.as_ref().filter(|y| !y.is_empty()) {
        meta.year = Some(year.clone());
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{chain_state, get, post_json, send, state};
    use crate::services::{MockDownloadChain, MockMediaServerChain, MockMediaServerOper};
    use axum::http::StatusCode;
    use mediaserver_api::models::{ExistMediaInfo, MediaServerItem, NoExistsInfo};
    use serde_json::json;
    use std::collections::HashMap;

    fn downloads_state(downloads: MockDownloadChain) -> AppState {
        state(MockMediaServerChain::new(), downloads, MockMediaServerOper::new())
    }

    fn show_exists() -> ExistMediaInfo {
        ExistMediaInfo {
            media_type: Some(MediaType::Tv),
            seasons: BTreeMap::from([(1, vec![1, 2, 3]), (2, vec![1, 2])]),
            server: Some("emby-main".to_string()),
            itemid: None,
        }
    }

    #[tokio::test]
    async fn test_exists_local_found() {
        let mut oper = MockMediaServerOper::new();
        oper.expect_exists()
            .withf(|lookup| {
                lookup.title == "The Office"
                    && lookup.season == Some(2)
                    && lookup.year == Some(2005)
                    && lookup.mtype.as_deref() == Some("tv")
            })
            .times(1)
            .returning(|_| {
                Ok(Some(MediaServerItem {
                    item_id: Some("itm-9".to_string()),
                    ..Default::default()
                }))
            });
        let state = state(MockMediaServerChain::new(), MockDownloadChain::new(), oper);

        let (status, body) = send(
            state,
            get("/exists?title=The%20Office%20S02&year=2005&mtype=tv"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "data": {"item": {"id": "itm-9"}}}));
    }

    #[tokio::test]
    async fn test_exists_local_explicit_season_wins() {
        let mut oper = MockMediaServerOper::new();
        oper.expect_exists()
            .withf(|lookup| lookup.season == Some(5))
            .returning(|_| Ok(None));
        let state = state(MockMediaServerChain::new(), MockDownloadChain::new(), oper);

        let (status, body) = send(state, get("/exists?title=Dark%20S02&season=5")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "data": {"item": {}}}));
    }

    #[tokio::test]
    async fn test_exists_remote_all_seasons() {
        let mut chain = MockMediaServerChain::new();
        chain
            .expect_media_exists()
            .returning(|_| Ok(Some(show_exists())));

        let (status, body) = send(
            chain_state(chain),
            post_json("/exists_remote", json!({"type": "tv", "title": "Dark"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"1": [1, 2, 3], "2": [1, 2]}));
    }

    #[tokio::test]
    async fn test_exists_remote_requested_season() {
        let mut chain = MockMediaServerChain::new();
        chain
            .expect_media_exists()
            .times(2)
            .returning(|_| Ok(Some(show_exists())));
        let state = chain_state(chain);

        let (_, body) = send(
            state.clone(),
            post_json("/exists_remote", json!({"title": "Dark", "season": 2})),
        )
        .await;
        assert_eq!(body, json!({"2": [1, 2]}));

        // An absent season keeps its key with no episodes.
        let (_, body) = send(
            state,
            post_json("/exists_remote", json!({"title": "Dark", "season": 7})),
        )
        .await;
        assert_eq!(body, json!({"7": []}));
    }

    #[tokio::test]
    async fn test_exists_remote_not_found() {
        let mut chain = MockMediaServerChain::new();
        chain.expect_media_exists().returning(|_| Ok(None));

        let (status, body) = send(
            chain_state(chain),
            post_json("/exists_remote", json!({"title": "Nothing", "season": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_not_exists_movie() {
        for (exists, expected) in [
            (true, json!([])),
            (
                false,
                json!([{"season": null, "episodes": [], "total_episode": 0, "start_episode": 0}]),
            ),
        ] {
            let mut downloads = MockDownloadChain::new();
            downloads.expect_get_no_exists_info().returning(move |_, _| {
                Ok(NoExistsInfo {
                    exists,
                    no_exists: HashMap::new(),
                })
            });

            let (status, body) = send(
                downloads_state(downloads),
                post_json("/notexists", json!({"type": "movie", "title": "Heat", "tmdb_id": 949})),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn test_not_exists_show_lists_missing_seasons() {
        let mut downloads = MockDownloadChain::new();
        downloads
            .expect_get_no_exists_info()
            .withf(|meta, media| {
                meta.name == "Severance"
                    && meta.begin_season == Some(2)
                    && meta.media_type == Some(MediaType::Tv)
                    && meta.year.as_deref() == Some("2022")
                    && media.tmdb_id == Some(95396)
            })
            .returning(|_, _| {
                let seasons = BTreeMap::from([
                    (
                        2,
                        NotExistMediaInfo {
                            season: Some(2),
                            episodes: vec![9, 10],
                            total_episode: 10,
                            start_episode: 1,
                        },
                    ),
                    (
                        1,
                        NotExistMediaInfo {
                            season: Some(1),
                            episodes: vec![],
                            total_episode: 9,
                            start_episode: 1,
                        },
                    ),
                ]);
                Ok(NoExistsInfo {
                    exists: false,
                    no_exists: HashMap::from([("95396".to_string(), seasons)]),
                })
            });

        let (status, body) = send(
            downloads_state(downloads),
            post_json(
                "/notexists",
                json!({"type": "tv", "title": "Severance", "year": "2022", "season": 2, "tmdb_id": 95396}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let seasons: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["season"].as_u64().unwrap())
            .collect();
        assert_eq!(seasons, vec![1, 2]);
        assert_eq!(body[1]["episodes"], json!([9, 10]));
    }

    #[tokio::test]
    async fn test_not_exists_show_nothing_missing() {
        let mut downloads = MockDownloadChain::new();
        downloads
            .expect_get_no_exists_info()
            .returning(|_, _| Ok(NoExistsInfo::default()));

        let (_, body) = send(
            downloads_state(downloads),
            post_json("/notexists", json!({"type": "tv", "title": "Dark", "tmdb_id": 70523})),
        )
        .await;

        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_requires_token() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri(format!("{}/notexists", crate::handlers::test_support::PREFIX))
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json!({"title": "Dark"}).to_string()))
            .unwrap();

        let (status, body) = send(downloads_state(MockDownloadChain::new()), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("Authentication required"));
    }

    #[test]
    fn test_request_meta_overrides() {
        let media = MediaInfo {
            title: Some("Dark S01".to_string()),
            media_type: Some(MediaType::Movie),
            season: Some(3),
            year: Some("2017".to_string()),
            ..Default::default()
        };
        let meta = request_meta(&media);

        assert_eq!(meta.name, "Dark");
        assert_eq!(meta.begin_season, Some(3));
        assert_eq!(meta.media_type, Some(MediaType::Tv));
        assert_eq!(meta.year.as_deref(), Some("2017"));
    }

    #[tokio::test]
    async fn test_exists_local_passes_mtype_through() {
        let mut oper = MockMediaServerOper::new();
        oper.expect_exists()
            .withf(|lookup| lookup.title == "Dark" && lookup.mtype.as_deref() == Some("TV"))
            .times(1)
            .returning(|_| Ok(None));
        let state = state(MockMediaServerChain::new(), MockDownloadChain::new(), oper);

        let (status, body) = send(state, get("/exists?title=Dark&mtype=TV")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "data": {"item": {}}}));
    }

    #[tokio::test]
    async fn test_malformed_input_gets_failure_envelope() {
        // Nothing downstream is consulted.
        let state = state(
            MockMediaServerChain::new(),
            MockDownloadChain::new(),
            MockMediaServerOper::new(),
        );

        let (status, body) = send(state.clone(), get("/exists?title=Dark&year=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("year"));

        let (status, body) = send(
            state,
            post_json("/exists_remote", json!({"title": "Dark", "season": "first"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_not_exists_accepts_numeric_year() {
        let mut downloads = MockDownloadChain::new();
        downloads
            .expect_get_no_exists_info()
            .withf(|meta, media| {
                meta.year.as_deref() == Some("1995") && media.year.as_deref() == Some("1995")
            })
            .times(1)
            .returning(|_, _| {
                Ok(NoExistsInfo {
                    exists: true,
                    no_exists: HashMap::new(),
                })
            });

        let (status, body) = send(
            downloads_state(downloads),
            post_json("/notexists", json!({"type": "movie", "title": "Heat", "year": 1995})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
