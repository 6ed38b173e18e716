//! Collaborator services the router delegates to.
//!
//! The production implementation of every trait is
//! [`BackendClient`], which forwards to the host backend over HTTP.

use async_trait::async_trait;
use mediaserver_api::models::{
    ExistMediaInfo, LocalLookup, MediaInfo, MediaServerItem, MediaServerLibrary,
    MediaServerPlayItem, NoExistsInfo,
};
use mediaserver_api::{BackendClient, Error, ItemFilter, MetaInfo};

/// Media servers: play links, existence, catalog listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaServerChain: Send + Sync {
    async fn get_play_url(&self, server: &str, item_id: &str) -> Result<Option<String>, Error>;

    async fn media_exists(&self, media: &MediaInfo) -> Result<Option<ExistMediaInfo>, Error>;

    async fn latest(
        &self,
        server: &str,
        count: u32,
        username: &str,
    ) -> Result<Option<Vec<MediaServerPlayItem>>, Error>;

    async fn playing(
        &self,
        server: &str,
        count: u32,
        username: &str,
    ) -> Result<Option<Vec<MediaServerPlayItem>>, Error>;

    async fn librarys(
        &self,
        server: &str,
        username: &str,
        hidden: bool,
    ) -> Result<Option<Vec<MediaServerLibrary>>, Error>;

    async fn items(
        &self,
        server: &str,
        username: &str,
        filter: &ItemFilter,
    ) -> Result<Option<Vec<MediaServerItem>>, Error>;
}

/// Works out which episodes of a title are still missing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownloadChain: Send + Sync {
    async fn get_no_exists_info(
        &self,
        meta: &MetaInfo,
        media: &MediaInfo,
    ) -> Result<NoExistsInfo, Error>;
}

/// The local registry of media server items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaServerOper: Send + Sync {
    async fn exists(&self, lookup: &LocalLookup) -> Result<Option<MediaServerItem>, Error>;
}

#[async_trait]
impl MediaServerChain for BackendClient {
    async fn get_play_url(&self, server: &str, item_id: &str) -> Result<Option<String>, Error> {
        BackendClient::get_play_url(self, server, item_id).await
    }

    async fn media_exists(&self, media: &MediaInfo) -> Result<Option<ExistMediaInfo>, Error> {
        BackendClient::media_exists(self, media).await
    }

    async fn latest(
        &self,
        server: &str,
        count: u32,
        username: &str,
    ) -> Result<Option<Vec<MediaServerPlayItem>>, Error> {
        BackendClient::latest(self, server, count, username).await
    }

    async fn playing(
        &self,
        server: &str,
        count: u32,
        username: &str,
    ) -> Result<Option<Vec<MediaServerPlayItem>>, Error> {
        BackendClient::playing(self, server, count, username).await
    }

    async fn librarys(
        &self,
        server: &str,
        username: &str,
        hidden: bool,
    ) -> Result<Option<Vec<MediaServerLibrary>>, Error> {
        BackendClient::librarys(self, server, username, hidden).await
    }

    async fn items(
        &self,
        server: &str,
        username: &str,
        filter: &ItemFilter,
    ) -> Result<Option<Vec<MediaServerItem>>, Error> {
        BackendClient::items(self, server, username, filter).await
    }
}

#[async_trait]
impl DownloadChain for BackendClient {
    async fn get_no_exists_info(
        &self,
        meta: &MetaInfo,
        media: &MediaInfo,
    ) -> Result<NoExistsInfo, Error> {
        BackendClient::get_no_exists_info(self, meta, media).await
    }
}

#[async_trait]
impl MediaServerOper for BackendClient {
    async fn exists(&self, lookup: &LocalLookup) -> Result<Option<MediaServerItem>, Error> {
        BackendClient::local_exists(self, lookup).await
    }
}
