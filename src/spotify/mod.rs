//! Spotify Web API client.
//!
//! Uses the Authorization Code flow: the user's access token is handed in by
//! the caller on every request, nothing is cached here.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::Config;

/// Errors raised while talking to the provider.
#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("request to provider failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Provider operations used by the HTTP layer and the export pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// URL of the provider's consent page for the given anti-forgery state.
    fn authorize_url(&self, state: &str) -> String;

    /// Trade an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, SpotifyError>;

    /// One page of the current user's playlists.
    async fn playlists_page(
        &self,
        token: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistItem>, SpotifyError>;

    /// One page of a playlist's tracks.
    async fn tracks_page(
        &self,
        token: &str,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistTrackItem>, SpotifyError>;
}

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    accounts_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            scope: config.spotify_scope.clone(),
            accounts_url: config.spotify_accounts_url.clone(),
            api_url: config.spotify_api_url.clone(),
        }
    }

    fn basic_auth_header(&self) -> String {
        let auth = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret).as_bytes());
        format!("Basic {}", auth)
    }

    async fn get_page<T>(&self, url: &str, token: &str) -> Result<Page<T>, SpotifyError>
    where
        T: serde::de::DeserializeOwned,
    {
        let res = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let res = ensure_success(res).await?;
        Ok(res.json().await?)
    }
}

async fn ensure_success(res: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    Err(SpotifyError::Status { status, body })
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scope),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, SpotifyError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let res = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .header("Authorization", self.basic_auth_header())
            .form(&params)
            .send()
            .await?;

        let res = ensure_success(res).await?;
        Ok(res.json().await?)
    }

    async fn playlists_page(
        &self,
        token: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistItem>, SpotifyError> {
        let url = format!(
            "{}/me/playlists?limit={}&offset={}",
            self.api_url, limit, offset
        );
        self.get_page(&url, token).await
    }

    async fn tracks_page(
        &self,
        token: &str,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistTrackItem>, SpotifyError> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}&offset={}",
            self.api_url,
            urlencoding::encode(playlist_id),
            limit,
            offset,
        );
        self.get_page(&url, token).await
    }
}

/// Token endpoint response.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// A paging object as returned by list endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub total: u32,
}

/// A playlist (simplified).
#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub name: String,
}

/// Entry of a playlist's track list. `track` is null for removed or unavailable items.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistTrackItem {
    #[serde(default)]
    pub track: Option<Track>,
}

/// A track or episode (simplified).
#[derive(Clone, Debug, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Artist {
    pub name: String,
}
