//! Playlist export pipeline: playlists, then each playlist's tracks, then the report.

use std::path::Path;

use crate::error::AppError;
use crate::pagination::fetch_all;
use crate::report;
use crate::spotify::{PlaylistItem, PlaylistTrackItem, SpotifyApi, SpotifyError};

pub const PLAYLIST_PAGE_LIMIT: u32 = 50;
pub const TRACK_PAGE_LIMIT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
}

impl From<PlaylistItem> for PlaylistRef {
    fn from(item: PlaylistItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackEntry {
    pub name: String,
    pub artist: String,
}

impl TrackEntry {
    /// Keeps the first credited artist. Items without a track are dropped.
    pub fn from_item(item: PlaylistTrackItem) -> Option<Self> {
        let track = item.track?;
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default();
        Some(Self {
            name: track.name,
            artist,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistTracks {
    pub name: String,
    pub tracks: Vec<TrackEntry>,
}

/// Every playlist with its tracks, in provider order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Library {
    pub playlists: Vec<PlaylistTracks>,
}

impl Library {
    pub fn track_count(&self) -> usize {
        self.playlists.iter().map(|p| p.tracks.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub playlists: usize,
    pub tracks: usize,
    pub bytes: usize,
}

pub async fn collect_playlists(
    api: &dyn SpotifyApi,
    token: &str,
) -> Result<Vec<PlaylistRef>, SpotifyError> {
    let items = fetch_all(PLAYLIST_PAGE_LIMIT, move |offset, limit| {
        api.playlists_page(token, offset, limit)
    })
    .await?;
    Ok(items.into_iter().map(PlaylistRef::from).collect())
}

pub async fn collect_tracks(
    api: &dyn SpotifyApi,
    token: &str,
    playlist_id: &str,
) -> Result<Vec<TrackEntry>, SpotifyError> {
    let items = fetch_all(TRACK_PAGE_LIMIT, move |offset, limit| {
        api.tracks_page(token, playlist_id, offset, limit)
    })
    .await?;
    Ok(items.into_iter().filter_map(TrackEntry::from_item).collect())
}

/// Fetch all playlists, then fully paginate each playlist's tracks before moving on.
pub async fn collect_library(api: &dyn SpotifyApi, token: &str) -> Result<Library, SpotifyError> {
    let playlists = collect_playlists(api, token).await?;
    tracing::info!(count = playlists.len(), "fetched playlists");

    let mut library = Library::default();
    for playlist in playlists {
        let tracks = collect_tracks(api, token, &playlist.id).await?;
        tracing::debug!(playlist = %playlist.name, tracks = tracks.len(), "fetched tracks");
        library.playlists.push(PlaylistTracks {
            name: playlist.name,
            tracks,
        });
    }
    Ok(library)
}

/// Run the whole export for one access token and write the report to `report_path`.
pub async fn run(
    api: &dyn SpotifyApi,
    token: &str,
    report_path: &Path,
) -> Result<ExportSummary, AppError> {
    let library = collect_library(api, token).await?;
    let text = report::format_report(&library);
    report::write_report(report_path, &text).await?;

    Ok(ExportSummary {
        playlists: library.playlists.len(),
        tracks: library.track_count(),
        bytes: text.len(),
    })
}
