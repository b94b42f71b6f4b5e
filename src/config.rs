use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

pub const DEFAULT_SCOPE: &str = "playlist-read-private playlist-read-collaborative";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// File name of the generated report inside the public directory.
pub const REPORT_FILE_NAME: &str = "playlist.txt";

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub spotify_scope: String,
    pub spotify_accounts_url: String,
    pub spotify_api_url: String,
    pub public_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match lookup("HOST") {
            Some(h) => h
                .parse()
                .map_err(|_| anyhow::anyhow!("HOST must be an IP address, got {h:?}"))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(9000);

        let spotify_client_id = lookup("SPOTIFY_CLIENT_ID")
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_CLIENT_ID is required"))?;

        let spotify_client_secret = lookup("SPOTIFY_CLIENT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_CLIENT_SECRET is required"))?;

        let spotify_redirect_uri = lookup("SPOTIFY_REDIRECT_URI")
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_REDIRECT_URI is required"))?;

        let spotify_scope = lookup("SPOTIFY_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.into());

        let spotify_accounts_url = lookup("SPOTIFY_ACCOUNTS_URL")
            .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.into())
            .trim_end_matches('/')
            .to_string();

        let spotify_api_url = lookup("SPOTIFY_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.into())
            .trim_end_matches('/')
            .to_string();

        let public_dir = lookup("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public"));

        Ok(Self {
            host,
            port,
            spotify_client_id,
            spotify_client_secret,
            spotify_redirect_uri,
            spotify_scope,
            spotify_accounts_url,
            spotify_api_url,
            public_dir,
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.public_dir.join(REPORT_FILE_NAME)
    }
}
