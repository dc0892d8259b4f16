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

//! Pure ranking of listening history: chronological eras, obscurity order and
//! greedy vibe allocation. Nothing in here performs I/O.

use crate::models::{AudioFeatures, FeatureMap, PhasedTrack, Track, VibeBuckets, VibeMode};
use log::debug;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RankingError {
    #[error("No listening history found.")]
    EmptyInput,
}

/// How a vibe category picks its winner from the remaining pool.
#[derive(Clone, Copy)]
enum Policy {
    /// First remaining track in input order.
    FirstAvailable,
    /// Smallest key under plain string ordering.
    Earliest(fn(&Track) -> &str),
    /// Largest feature score.
    Maximize(fn(&AudioFeatures) -> f64),
}

fn release_date(track: &Track) -> &str {
    &track.release_date
}

fn villain_score(f: &AudioFeatures) -> f64 {
    f.energy - f.valence
}

fn energy(f: &AudioFeatures) -> f64 {
    f.energy
}

fn danceability(f: &AudioFeatures) -> f64 {
    f.danceability
}

fn valence(f: &AudioFeatures) -> f64 {
    f.valence
}

/// Categories in resolution order. Each winner leaves the pool before the next row runs.
const VIBE_TABLE: [(VibeMode, Policy); 6] = [
    (VibeMode::Doomscrolling, Policy::FirstAvailable),
    (VibeMode::TimeTraveler, Policy::Earliest(release_date)),
    (VibeMode::Villain, Policy::Maximize(villain_score)),
    (VibeMode::Beast, Policy::Maximize(energy)),
    (VibeMode::LateNight, Policy::Maximize(danceability)),
    (VibeMode::MainChar, Policy::Maximize(valence)),
];

/// Sorts by release date and splits the list into three eras.
///
/// Index `i` of `n` lands in phase 1 when `i < n/3`, phase 2 when `i < 2n/3`,
/// phase 3 otherwise. Equal dates keep their input order.
pub fn phase_by_release(mut tracks: Vec<Track>) -> Vec<PhasedTrack> {
    tracks.sort_by(|a, b| a.release_date.cmp(&b.release_date));

    let n = tracks.len();
    tracks
        .into_iter()
        .enumerate()
        .map(|(i, track)| {
            // 3i < n  <=>  i < n/3, without going through floats.
            let phase = if 3 * i < n {
                1
            } else if 3 * i < 2 * n {
                2
            } else {
                3
            };
            PhasedTrack { track, phase }
        })
        .collect()
}

/// Most obscure first. Ties keep their input order.
pub fn rank_by_obscurity(mut tracks: Vec<Track>) -> Vec<Track> {
    tracks.sort_by_key(|t| t.popularity);
    tracks
}

/// Assigns at most one track to every [`VibeMode`], never the same track twice.
///
/// Tracks without an entry in `features` score zero on every feature.
pub fn assign_vibes(
    tracks: &[Track],
    features: Option<&FeatureMap>,
) -> Result<VibeBuckets, RankingError> {
    if tracks.is_empty() {
        return Err(RankingError::EmptyInput);
    }

    let lookup = |track: &Track| -> AudioFeatures {
        features
            .and_then(|map| map.get(&track.id))
            .copied()
            .unwrap_or_default()
    };

    let mut pool: Vec<&Track> = tracks.iter().collect();
    let mut buckets = VibeBuckets::new();

    for (mode, policy) in VIBE_TABLE {
        let winner = match policy {
            _ if pool.is_empty() => None,
            Policy::FirstAvailable => Some(0),
            Policy::Earliest(key) => first_min_by(&pool, |a, b| key(a).cmp(key(b))),
            Policy::Maximize(score) => first_min_by(&pool, |a, b| {
                // Reversed so the highest score sorts first.
                score(&lookup(b))
                    .partial_cmp(&score(&lookup(a)))
                    .unwrap_or(Ordering::Equal)
            }),
        };

        let picked = winner.map(|idx| pool.remove(idx).clone());
        debug!(
            "{} -> {}",
            mode,
            picked.as_ref().map(|t| t.id.as_str()).unwrap_or("<none>")
        );
        buckets.insert(mode, picked);
    }

    Ok(buckets)
}

/// Index of the element a stable sort by `cmp` would put first.
fn first_min_by<F>(pool: &[&Track], mut cmp: F) -> Option<usize>
where
    F: FnMut(&Track, &Track) -> Ordering,
{
    // `min_by` keeps the earliest of equal elements.
    pool.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| cmp(a, b))
        .map(|(idx, _)| idx)
}
