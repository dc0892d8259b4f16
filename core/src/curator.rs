use crate::models::{PhasedTrack, Track, VibeBuckets};
use crate::ranking::{self, RankingError};
use crate::source::{SourceError, TimeRange, TrackSource, MAX_TOP_TRACKS};
use log::{debug, info};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurateError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Ranking(#[from] RankingError),
}

/// How many tracks are fetched and how many reach the selection screen.
#[derive(Debug, Clone, Copy)]
pub struct CurateOptions {
    pub time_range: TimeRange,
    pub fetch_limit: u32,
    pub display_limit: usize,
}

impl Default for CurateOptions {
    fn default() -> Self {
        Self {
            time_range: TimeRange::LongTerm,
            fetch_limit: MAX_TOP_TRACKS,
            display_limit: 25,
        }
    }
}

/// Fetches listening history and runs it through the ranking engine.
pub struct Curator {
    source: Box<dyn TrackSource>,
    options: CurateOptions,
}

impl Curator {
    pub fn new<S: TrackSource + 'static>(source: S) -> Self {
        Self::with_options(source, CurateOptions::default())
    }

    pub fn with_options<S: TrackSource + 'static>(source: S, options: CurateOptions) -> Self {
        Self {
            source: Box::new(source),
            options,
        }
    }

    async fn top_tracks(&self) -> Result<Vec<Track>, CurateError> {
        let tracks = self
            .source
            .fetch_top_tracks(self.options.fetch_limit, self.options.time_range)
            .await?;
        debug!("Source returned {} tracks", tracks.len());
        Ok(tracks)
    }

    /// "Your Eras": the most played tracks, oldest first, split into three phases.
    ///
    /// The list is cut to `display_limit` most played tracks *before* sorting by date,
    /// so the eras describe what the user actually listens to most.
    pub async fn your_eras(&self) -> Result<Vec<PhasedTrack>, CurateError> {
        let mut tracks = self.top_tracks().await?;
        tracks.truncate(self.options.display_limit);

        let phased = ranking::phase_by_release(tracks);
        info!("Your Eras: {} tracks phased", phased.len());
        Ok(phased)
    }

    /// "Gatekeeper Score": the most obscure tracks first.
    ///
    /// Every fetched track is ranked, then the result is cut to `display_limit`.
    pub async fn gatekeeper(&self) -> Result<Vec<Track>, CurateError> {
        let mut ranked = ranking::rank_by_obscurity(self.top_tracks().await?);
        ranked.truncate(self.options.display_limit);

        info!("Gatekeeper: {} tracks ranked", ranked.len());
        Ok(ranked)
    }

    /// "Sonic Aura": one winner per vibe category.
    pub async fn sonic_aura(&self) -> Result<VibeBuckets, CurateError> {
        let tracks = self.top_tracks().await?;
        if tracks.is_empty() {
            return Err(RankingError::EmptyInput.into());
        }

        let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let features = self.source.fetch_audio_features(&ids).await?;
        if features.len() < ids.len() {
            debug!(
                "{} tracks have no audio features and score zero",
                ids.len() - features.len()
            );
        }

        let buckets = ranking::assign_vibes(&tracks, Some(&features))?;
        info!("Sonic Aura: {} categories resolved", buckets.len());
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{track, AudioFeatures, FeatureMap, VibeMode};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory history that records what was asked of it.
    #[derive(Default)]
    struct FakeSource {
        tracks: Vec<Track>,
        features: FeatureMap,
        feature_calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<(u32, TimeRange)>>>,
    }

    #[async_trait]
    impl TrackSource for FakeSource {
        async fn fetch_top_tracks(
            &self,
            limit: u32,
            time_range: TimeRange,
        ) -> Result<Vec<Track>, SourceError> {
            *self.last_request.lock().unwrap() = Some((limit, time_range));
            Ok(self.tracks.iter().take(limit as usize).cloned().collect())
        }

        async fn fetch_audio_features(
            &self,
            track_ids: &[String],
        ) -> Result<FeatureMap, SourceError> {
            self.feature_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .features
                .iter()
                .filter(|(id, _)| track_ids.contains(id))
                .map(|(id, f)| (id.clone(), *f))
                .collect())
        }
    }

    fn history(n: usize) -> Vec<Track> {
        // Most played first; release dates run backwards, popularity rises.
        (0..n)
            .map(|i| track(&format!("t{:02}", i), &format!("{}", 2049 - i), i as u32 * 2))
            .collect()
    }

    #[tokio::test]
    async fn test_your_eras_slices_before_sorting() {
        let curator = Curator::new(FakeSource {
            tracks: history(50),
            ..Default::default()
        });

        let eras = curator.your_eras().await.unwrap();
        assert_eq!(eras.len(), 25);
        // Only the 25 most played survive, oldest of those first.
        assert_eq!(eras[0].track.id, "t24");
        assert_eq!(eras[24].track.id, "t00");
        assert_eq!(eras[0].phase, 1);
        assert_eq!(eras[24].phase, 3);
    }

    #[tokio::test]
    async fn test_gatekeeper_sorts_before_slicing() {
        let mut tracks = history(50);
        tracks.reverse(); // least popular tracks are now at the end of the fetch
        let curator = Curator::new(FakeSource {
            tracks,
            ..Default::default()
        });

        let ranked = curator.gatekeeper().await.unwrap();
        assert_eq!(ranked.len(), 25);
        assert_eq!(ranked[0].id, "t00");
        assert_eq!(ranked[24].id, "t24");
    }

    #[tokio::test]
    async fn test_options_reach_the_source() {
        let last_request = Arc::new(Mutex::new(None));
        let source = FakeSource {
            tracks: history(10),
            last_request: last_request.clone(),
            ..Default::default()
        };
        let options = CurateOptions {
            time_range: TimeRange::ShortTerm,
            fetch_limit: 10,
            display_limit: 4,
        };
        let curator = Curator::with_options(source, options);

        let ranked = curator.gatekeeper().await.unwrap();
        assert_eq!(ranked.len(), 4);
        assert_eq!(
            *last_request.lock().unwrap(),
            Some((10, TimeRange::ShortTerm))
        );
    }

    #[tokio::test]
    async fn test_sonic_aura_uses_features() {
        let mut features = FeatureMap::new();
        features.insert(
            "t05".to_string(),
            AudioFeatures {
                energy: 0.99,
                valence: 0.5,
                danceability: 0.1,
                tempo: 170.0,
            },
        );
        let curator = Curator::new(FakeSource {
            tracks: history(8),
            features,
            ..Default::default()
        });

        let buckets = curator.sonic_aura().await.unwrap();
        assert_eq!(buckets.winner(VibeMode::Doomscrolling).unwrap().id, "t00");
        assert_eq!(buckets.winner(VibeMode::TimeTraveler).unwrap().id, "t07");
        assert_eq!(buckets.winner(VibeMode::Villain).unwrap().id, "t05");
        // t05 is gone, so Beast falls back to the first zero-scored track.
        assert_eq!(buckets.winner(VibeMode::Beast).unwrap().id, "t01");
    }

    #[tokio::test]
    async fn test_sonic_aura_without_history() {
        let feature_calls = Arc::new(AtomicUsize::new(0));
        let curator = Curator::new(FakeSource {
            feature_calls: feature_calls.clone(),
            ..Default::default()
        });

        let err = curator.sonic_aura().await.unwrap_err();
        assert!(matches!(err, CurateError::Ranking(RankingError::EmptyInput)));
        assert_eq!(err.to_string(), "No listening history found.");
        assert_eq!(feature_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_eras_and_gatekeeper_accept_empty_history() {
        let curator = Curator::new(FakeSource::default());
        assert!(curator.your_eras().await.unwrap().is_empty());
        assert!(curator.gatekeeper().await.unwrap().is_empty());
    }
}
