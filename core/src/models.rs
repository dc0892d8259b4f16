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

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Maximum number of tracks a user can pick on the list screens (Eras, Gatekeeper).
pub const LIST_PICK_LIMIT: usize = 10;
/// A poster never shows more than this many tracks.
pub const POSTER_TRACK_LIMIT: usize = 10;

/// One entry of the user's listening history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub release_date: String, // "YYYY", "YYYY-MM" or "YYYY-MM-DD"
    pub popularity: u32,      // 0..=100
    pub image_url: Option<String>,
    pub external_url: String,
}

impl Track {
    pub fn uniqueness(&self) -> Uniqueness {
        Uniqueness::from_popularity(self.popularity)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({}, {})",
            self.name, self.artists, self.album, self.release_date
        )
    }
}

/// Per-track descriptors computed by Spotify. Missing entries are treated as all zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub tempo: f64,
}

/// Audio features keyed by track id.
pub type FeatureMap = HashMap<String, AudioFeatures>;

/// A track placed in one of three chronological thirds of a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasedTrack {
    #[serde(flatten)]
    pub track: Track,
    pub phase: u8, // 1, 2 or 3
}

impl PhasedTrack {
    pub fn phase_label(&self) -> &'static str {
        match self.phase {
            1 => "JAN - APR",
            2 => "MAY - AUG",
            _ => "SEP - DEC",
        }
    }
}

/// Mood categories of the Sonic Aura screen.
///
/// Variants are declared in the order they are resolved, so `Ord` and
/// iteration over [`VibeMode::ALL`] follow the greedy allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VibeMode {
    Doomscrolling,
    TimeTraveler,
    Villain,
    Beast,
    LateNight,
    MainChar,
}

impl VibeMode {
    pub const ALL: [VibeMode; 6] = [
        VibeMode::Doomscrolling,
        VibeMode::TimeTraveler,
        VibeMode::Villain,
        VibeMode::Beast,
        VibeMode::LateNight,
        VibeMode::MainChar,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            VibeMode::Doomscrolling => "Doomscrolling",
            VibeMode::TimeTraveler => "Time Traveler",
            VibeMode::Villain => "Villain Arc",
            VibeMode::Beast => "Beast Mode",
            VibeMode::LateNight => "Late Night Drive",
            VibeMode::MainChar => "Main Character",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VibeMode::Doomscrolling => "Heard for hours on loop",
            VibeMode::TimeTraveler => "Oldest Release Date",
            VibeMode::Villain => "High Energy + Low Valence (Angry)",
            VibeMode::Beast => "Highest Energy (Motivation)",
            VibeMode::LateNight => "Highest Danceability",
            VibeMode::MainChar => "Highest Valence (Happiness)",
        }
    }
}

impl fmt::Display for VibeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Winner for each vibe category, as a list of zero or one track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VibeBuckets(BTreeMap<VibeMode, Vec<Track>>);

impl VibeBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mode: VibeMode, winner: Option<Track>) {
        self.0.insert(mode, winner.into_iter().collect());
    }

    /// The winning track for `mode`, if the pool was not exhausted.
    pub fn winner(&self, mode: VibeMode) -> Option<&Track> {
        self.0.get(&mode).and_then(|bucket| bucket.first())
    }

    pub fn iter(&self) -> impl Iterator<Item = (VibeMode, Option<&Track>)> {
        self.0.iter().map(|(mode, bucket)| (*mode, bucket.first()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Display bands for the Gatekeeper score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniquenessBand {
    RoyalGem,
    Underground,
    Mainstream,
}

impl fmt::Display for UniquenessBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UniquenessBand::RoyalGem => "Royal Gem",
            UniquenessBand::Underground => "Underground",
            UniquenessBand::Mainstream => "Mainstream",
        };
        f.write_str(label)
    }
}

/// How obscure a track is: `100 - popularity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uniqueness {
    pub percent: u32,
    pub band: UniquenessBand,
}

impl Uniqueness {
    pub fn from_popularity(popularity: u32) -> Self {
        let percent = 100u32.saturating_sub(popularity);
        let band = if percent >= 80 {
            UniquenessBand::RoyalGem
        } else if percent >= 50 {
            UniquenessBand::Underground
        } else {
            UniquenessBand::Mainstream
        };
        Self { percent, band }
    }
}

/// Tracks the user picked from a candidate list, capped at `limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    limit: usize,
    ids: Vec<String>,
}

impl Selection {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ids: Vec::new(),
        }
    }

    /// Adds `id` if absent, removes it if present.
    ///
    /// Returns `false` when adding would exceed the limit; the selection is left untouched.
    pub fn toggle(&mut self, id: &str) -> bool {
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
            return true;
        }
        if self.ids.len() >= self.limit {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.limit
    }

    /// Picked tracks, in the order they appear in `candidates`.
    pub fn resolve<'a, I>(&self, candidates: I) -> Vec<Track>
    where
        I: IntoIterator<Item = &'a Track>,
    {
        candidates
            .into_iter()
            .filter(|t| self.contains(&t.id))
            .cloned()
            .collect()
    }
}

/// Shareable result card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poster {
    pub title: String,
    pub tracks: Vec<Track>,
}

impl Poster {
    pub fn new(title: impl Into<String>, mut tracks: Vec<Track>) -> Self {
        tracks.truncate(POSTER_TRACK_LIMIT);
        Self {
            title: title.into(),
            tracks,
        }
    }
}

impl fmt::Display for Poster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===================================================")?;
        writeln!(f, "{}", self.title.to_uppercase())?;
        writeln!(f, "===================================================")?;
        for (i, track) in self.tracks.iter().enumerate() {
            writeln!(f, "{:>2}. {}", i + 1, track)?;
        }
        write!(f, "---------------------------------------------------")
    }
}

#[cfg(test)]
pub(crate) fn track(id: &str, release_date: &str, popularity: u32) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Song {}", id),
        artists: "Some Artist".to_string(),
        album: "Some Album".to_string(),
        release_date: release_date.to_string(),
        popularity,
        image_url: None,
        external_url: format!("https://open.spotify.com/track/{}", id),
    }
}
