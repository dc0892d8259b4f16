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

pub mod auth;
pub mod curator;
pub mod models;
pub mod ranking;
pub mod source;

// Re-export key items for convenience
pub use auth::get_spotify_client;
pub use curator::{CurateError, CurateOptions, Curator};
pub use models::{
    AudioFeatures, FeatureMap, PhasedTrack, Poster, Selection, Track, Uniqueness,
    UniquenessBand, VibeBuckets, VibeMode,
};
pub use ranking::{assign_vibes, phase_by_release, rank_by_obscurity, RankingError};
pub use source::{SpotifySource, TimeRange, TrackSource};
