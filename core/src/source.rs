/*
    spotify-wrapped-rs | Rust CLI tool that turns your top tracks into shareable cards.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::models::{AudioFeatures, FeatureMap, Track};
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use rspotify::{
    model::{FullTrack, TimeRange as SpotifyTimeRange, TrackId},
    prelude::*,
    AuthCodePkceSpotify,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Spotify never returns more than 50 top tracks per request.
pub const MAX_TOP_TRACKS: u32 = 50;
/// Ids per `/audio-features` request.
pub const FEATURES_BATCH_SIZE: usize = 50;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Spotify API error: {0}")]
    Spotify(#[from] rspotify::ClientError),
}

/// Listening window for top tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    #[default]
    LongTerm,
}

impl From<TimeRange> for SpotifyTimeRange {
    fn from(range: TimeRange) -> Self {
        match range {
            TimeRange::ShortTerm => SpotifyTimeRange::ShortTerm,
            TimeRange::MediumTerm => SpotifyTimeRange::MediumTerm,
            TimeRange::LongTerm => SpotifyTimeRange::LongTerm,
        }
    }
}

/// Where listening history comes from.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// The user's most played tracks, most played first.
    async fn fetch_top_tracks(
        &self,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<Track>, SourceError>;

    /// Audio features for the given ids. Ids without features are simply absent.
    async fn fetch_audio_features(&self, track_ids: &[String]) -> Result<FeatureMap, SourceError>;
}

/// [`TrackSource`] backed by the Spotify Web API.
pub struct SpotifySource {
    spotify: Arc<AuthCodePkceSpotify>,
}

impl SpotifySource {
    pub fn new(spotify: AuthCodePkceSpotify) -> Self {
        Self {
            spotify: Arc::new(spotify),
        }
    }

    async fn fetch_feature_batch(
        &self,
        batch: Vec<TrackId<'_>>,
    ) -> Result<Vec<rspotify::model::AudioFeatures>, SourceError> {
        let features = self.spotify.tracks_features(batch).await?;
        Ok(features.unwrap_or_default())
    }
}

#[async_trait]
impl TrackSource for SpotifySource {
    async fn fetch_top_tracks(
        &self,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<Track>, SourceError> {
        let limit = limit.clamp(1, MAX_TOP_TRACKS);
        info!("Fetching top {} tracks ({:?})", limit, time_range);

        let page = self
            .spotify
            .current_user_top_tracks_manual(Some(time_range.into()), Some(limit), None)
            .await?;

        let tracks: Vec<Track> = page.items.iter().filter_map(to_track).collect();
        debug!(
            "Received {} tracks, kept {} with an id",
            page.items.len(),
            tracks.len()
        );
        Ok(tracks)
    }

    async fn fetch_audio_features(&self, track_ids: &[String]) -> Result<FeatureMap, SourceError> {
        let ids = parse_track_ids(track_ids);

        let batches = ids
            .chunks(FEATURES_BATCH_SIZE)
            .map(|chunk| self.fetch_feature_batch(chunk.to_vec()));

        let mut map = FeatureMap::new();
        for (i, result) in join_all(batches).await.into_iter().enumerate() {
            match result {
                Ok(features) => {
                    for f in features {
                        map.insert(f.id.id().to_string(), from_spotify_features(&f));
                    }
                }
                // A failed batch only costs those tracks their scores.
                Err(e) => warn!("Audio features batch {} failed: {}", i, e),
            }
        }

        debug!("Audio features for {}/{} tracks", map.len(), track_ids.len());
        Ok(map)
    }
}

/// Ids Spotify would reject are skipped; those tracks just get no features.
fn parse_track_ids(track_ids: &[String]) -> Vec<TrackId<'_>> {
    track_ids
        .iter()
        .filter_map(|id| match TrackId::from_id(id.as_str()) {
            Ok(track_id) => Some(track_id),
            Err(_) => {
                warn!("Invalid Track ID {}, skipping its audio features", id);
                None
            }
        })
        .collect()
}

/// Converts an API track. Tracks without an id (local files) are dropped.
fn to_track(track: &FullTrack) -> Option<Track> {
    let id = track.id.as_ref()?;

    let artists = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    Some(Track {
        id: id.id().to_string(),
        name: track.name.clone(),
        artists,
        album: track.album.name.clone(),
        release_date: track.album.release_date.clone().unwrap_or_default(),
        popularity: track.popularity,
        image_url: track.album.images.first().map(|img| img.url.clone()),
        external_url: track
            .external_urls
            .get("spotify")
            .cloned()
            .unwrap_or_default(),
    })
}

fn from_spotify_features(f: &rspotify::model::AudioFeatures) -> AudioFeatures {
    AudioFeatures {
        energy: f64::from(f.energy),
        valence: f64::from(f.valence),
        danceability: f64::from(f.danceability),
        tempo: f64::from(f.tempo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_track(id: serde_json::Value, images: serde_json::Value) -> FullTrack {
        let value = json!({
            "album": {
                "album_type": "album",
                "artists": [],
                "available_markets": ["MX", "US"],
                "external_urls": {},
                "href": null,
                "id": "2noRn2Aes5aoNVsU6iWThc",
                "images": images,
                "name": "Discovery",
                "release_date": "2001-03-12",
                "release_date_precision": "day"
            },
            "artists": [
                { "external_urls": {}, "href": null, "id": "4tZwfgrHOc3mvqYlEYSvVi", "name": "Daft Punk" },
                { "external_urls": {}, "href": null, "id": null, "name": "Romanthony" }
            ],
            "available_markets": ["MX", "US"],
            "disc_number": 1,
            "duration_ms": 320357,
            "explicit": false,
            "external_ids": { "isrc": "GBDUW0000053" },
            "external_urls": { "spotify": "https://open.spotify.com/track/0DiWol3AO6WpXZgp0goxAV" },
            "href": null,
            "id": id,
            "is_local": false,
            "name": "One More Time",
            "popularity": 82,
            "preview_url": null,
            "track_number": 1
        });
        serde_json::from_value(value).expect("valid track json")
    }

    #[test]
    fn test_to_track_maps_fields() {
        let full = full_track(
            json!("0DiWol3AO6WpXZgp0goxAV"),
            json!([{ "height": 640, "url": "https://i.scdn.co/image/cover", "width": 640 }]),
        );

        let track = to_track(&full).expect("track has an id");
        assert_eq!(track.id, "0DiWol3AO6WpXZgp0goxAV");
        assert_eq!(track.name, "One More Time");
        assert_eq!(track.artists, "Daft Punk, Romanthony");
        assert_eq!(track.album, "Discovery");
        assert_eq!(track.release_date, "2001-03-12");
        assert_eq!(track.popularity, 82);
        assert_eq!(track.image_url.as_deref(), Some("https://i.scdn.co/image/cover"));
        assert_eq!(
            track.external_url,
            "https://open.spotify.com/track/0DiWol3AO6WpXZgp0goxAV"
        );
    }

    #[test]
    fn test_to_track_drops_local_files() {
        let full = full_track(json!(null), json!([]));
        assert!(to_track(&full).is_none());
    }

    #[test]
    fn test_parse_track_ids_skips_invalid_ids() {
        let ids = vec![
            "0DiWol3AO6WpXZgp0goxAV".to_string(),
            "not a valid id!".to_string(),
            "4uLU6hMCjMI75M1A2tKUQC".to_string(),
        ];

        let parsed: Vec<String> = parse_track_ids(&ids)
            .iter()
            .map(|id| id.id().to_string())
            .collect();
        assert_eq!(parsed, vec!["0DiWol3AO6WpXZgp0goxAV", "4uLU6hMCjMI75M1A2tKUQC"]);
    }

    #[test]
    fn test_time_range_defaults_to_long_term() {
        assert_eq!(TimeRange::default(), TimeRange::LongTerm);
        assert!(matches!(
            SpotifyTimeRange::from(TimeRange::ShortTerm),
            SpotifyTimeRange::ShortTerm
        ));
    }
}
