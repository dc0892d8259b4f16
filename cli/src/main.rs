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

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::process;
use wrapped_core::models::LIST_PICK_LIMIT;
use wrapped_core::{
    get_spotify_client, CurateOptions, Curator, Poster, Selection, SpotifySource, TimeRange,
    Track, VibeMode,
};

#[derive(Parser)]
#[command(name = "spotify-wrapped")]
#[command(about = "Turn your Spotify listening history into shareable cards", long_about = None)]
struct Cli {
    /// Listening window used to pick your top tracks
    #[arg(long, value_enum, global = true, default_value_t = RangeArg::Long)]
    time_range: RangeArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Your Eras: your 25 most played tracks, oldest first, split into three phases
    Eras {
        /// Track IDs to put on the poster (up to 10)
        #[arg(long, value_name = "TRACK_ID", num_args = 1..)]
        pick: Vec<String>,
        /// Output the result to a JSON file (e.g., --json=eras.json)
        #[arg(long)]
        json: Option<String>,
    },
    /// Gatekeeper Score: your 25 most obscure top tracks
    Gatekeeper {
        /// Track IDs to put on the poster (up to 10)
        #[arg(long, value_name = "TRACK_ID", num_args = 1..)]
        pick: Vec<String>,
        /// Output the result to a JSON file
        #[arg(long)]
        json: Option<String>,
    },
    /// Sonic Aura: one track for each of six moods
    Aura {
        /// The mood to put on the poster
        #[arg(long, value_enum)]
        vibe: Option<VibeArg>,
        /// Output the result to a JSON file
        #[arg(long)]
        json: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RangeArg {
    /// About the last 4 weeks
    Short,
    /// About the last 6 months
    Medium,
    /// Several years of history
    Long,
}

impl From<RangeArg> for TimeRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::Short => TimeRange::ShortTerm,
            RangeArg::Medium => TimeRange::MediumTerm,
            RangeArg::Long => TimeRange::LongTerm,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum VibeArg {
    Doomscrolling,
    TimeTraveler,
    Villain,
    Beast,
    LateNight,
    MainChar,
}

impl From<VibeArg> for VibeMode {
    fn from(arg: VibeArg) -> Self {
        match arg {
            VibeArg::Doomscrolling => VibeMode::Doomscrolling,
            VibeArg::TimeTraveler => VibeMode::TimeTraveler,
            VibeArg::Villain => VibeMode::Villain,
            VibeArg::Beast => VibeMode::Beast,
            VibeArg::LateNight => VibeMode::LateNight,
            VibeArg::MainChar => VibeMode::MainChar,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if dotenv().is_err() {
        debug!("No .env file found, using the process environment");
    }

    let cli = Cli::parse();
    let options = CurateOptions {
        time_range: cli.time_range.into(),
        ..Default::default()
    };

    match &cli.command {
        Commands::Eras { pick, json } => {
            handle_eras(options, pick, json.as_deref()).await;
        }
        Commands::Gatekeeper { pick, json } => {
            handle_gatekeeper(options, pick, json.as_deref()).await;
        }
        Commands::Aura { vibe, json } => {
            handle_aura(options, vibe.map(VibeMode::from), json.as_deref()).await;
        }
    }
}

async fn get_curator(options: CurateOptions) -> Curator {
    let spotify = match get_spotify_client().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error initializing Spotify client: {}", e);
            process::exit(1);
        }
    };
    Curator::with_options(SpotifySource::new(spotify), options)
}

fn write_json<T: Serialize>(path: &str, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file '{}'", path))?;
    file.write_all(content.as_bytes())
        .context("Failed to write report to file")?;
    Ok(())
}

fn save_json<T: Serialize>(path: Option<&str>, value: &T) {
    if let Some(path) = path {
        match write_json(path, value) {
            Ok(()) => {
                println!();
                println!("[SAVED] Report saved to: {}", path);
            }
            Err(e) => {
                eprintln!();
                eprintln!("[ERROR] {:#}", e);
            }
        }
    }
}

/// Selects the picked ids that are candidates, in pick order, up to `limit`.
fn select_picks(candidates: &[Track], picks: &[String], limit: usize) -> Selection {
    let mut selection = Selection::new(limit);
    for id in picks {
        if !candidates.iter().any(|t| &t.id == id) {
            eprintln!("[WARN] Track {} is not one of the candidates, skipping", id);
            continue;
        }
        if selection.contains(id) {
            continue;
        }
        if !selection.toggle(id) {
            eprintln!("[WARN] You can pick up to {} songs, ignoring {}", limit, id);
        }
    }
    selection
}

/// Builds the poster from the picked ids, or `None` when nothing was picked.
fn pick_poster(
    title: &str,
    candidates: &[Track],
    picks: &[String],
    limit: usize,
) -> Option<Poster> {
    if picks.is_empty() {
        return None;
    }

    let selection = select_picks(candidates, picks, limit);
    if selection.is_empty() {
        eprintln!("[ERROR] None of the picked tracks are in the list.");
        process::exit(1);
    }
    Some(Poster::new(title, selection.resolve(candidates)))
}

fn print_poster_tip() {
    println!();
    println!(
        "Tip: pick up to {} IDs with '--pick <ID> <ID> ...' to build your poster.",
        LIST_PICK_LIMIT
    );
}

async fn handle_eras(options: CurateOptions, picks: &[String], json_path: Option<&str>) {
    let curator = get_curator(options).await;
    println!("Building your eras...");

    match curator.your_eras().await {
        Ok(eras) => {
            println!();
            println!("---------------------------------------------------");
            println!("YOUR ERAS");
            println!("---------------------------------------------------");
            for (i, era) in eras.iter().enumerate() {
                println!(
                    "{:>2}. [{}] {:<22} | {}",
                    i + 1,
                    era.phase_label(),
                    era.track.id,
                    era.track
                );
            }
            println!("---------------------------------------------------");

            let candidates: Vec<Track> = eras.iter().map(|e| e.track.clone()).collect();
            match pick_poster("Your Eras", &candidates, picks, LIST_PICK_LIMIT) {
                Some(poster) => {
                    println!();
                    println!("{}", poster);
                    save_json(json_path, &poster);
                }
                None => {
                    print_poster_tip();
                    save_json(json_path, &eras);
                }
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Your Eras failed: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_gatekeeper(options: CurateOptions, picks: &[String], json_path: Option<&str>) {
    let curator = get_curator(options).await;
    println!("Measuring how underground you are...");

    match curator.gatekeeper().await {
        Ok(ranked) => {
            println!();
            println!(
                "{:<22} | {:<40} | {:>6} | {:<11}",
                "ID", "Track", "Unique", "Band"
            );
            println!("{:-<22}-+-{:-<40}-+-{:-<6}-+-{:-<11}", "", "", "", "");

            for track in &ranked {
                let uniqueness = track.uniqueness();
                let name = format!("{} - {}", track.name, track.artists);
                let name = if name.chars().count() > 38 {
                    format!("{}..", name.chars().take(38).collect::<String>())
                } else {
                    name
                };
                println!(
                    "{:<22} | {:<40} | {:>5}% | {:<11}",
                    track.id,
                    name,
                    uniqueness.percent,
                    uniqueness.band.to_string()
                );
            }

            println!();
            println!("Legend:");
            println!("  [Royal Gem]:   80% unique or more.");
            println!("  [Underground]: 50% unique or more.");
            println!("  [Mainstream]:  Everybody knows this one.");

            match pick_poster("Gatekeeper Score", &ranked, picks, LIST_PICK_LIMIT) {
                Some(poster) => {
                    println!();
                    println!("{}", poster);
                    save_json(json_path, &poster);
                }
                None => {
                    print_poster_tip();
                    save_json(json_path, &ranked);
                }
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Gatekeeper Score failed: {}", e);
            process::exit(1);
        }
    }
}

async fn handle_aura(options: CurateOptions, vibe: Option<VibeMode>, json_path: Option<&str>) {
    let curator = get_curator(options).await;
    println!("Reading your sonic aura...");

    match curator.sonic_aura().await {
        Ok(buckets) => {
            println!();
            println!("---------------------------------------------------");
            println!("SONIC AURA");
            println!("---------------------------------------------------");
            for (mode, winner) in buckets.iter() {
                match winner {
                    Some(track) => println!("{:<17} {}", mode.display_name(), track),
                    None => println!("{:<17} (not enough tracks)", mode.display_name()),
                }
                println!("{:<17} {}", "", mode.description());
            }
            println!("---------------------------------------------------");

            match vibe {
                Some(mode) => {
                    let Some(track) = buckets.winner(mode) else {
                        eprintln!("[ERROR] No track was assigned to {}.", mode);
                        process::exit(1);
                    };
                    let poster = Poster::new(mode.display_name(), vec![track.clone()]);
                    println!();
                    println!("{}", poster);
                    save_json(json_path, &poster);
                }
                None => {
                    println!();
                    println!("Tip: choose one with '--vibe <MOOD>' to build your poster.");
                    save_json(json_path, &buckets);
                }
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Sonic Aura failed: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Song {}", id),
            artists: "Some Artist".to_string(),
            album: "Some Album".to_string(),
            release_date: "2020-01-01".to_string(),
            popularity: 50,
            image_url: None,
            external_url: String::new(),
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_repeated_pick_stays_selected() {
        let candidates = vec![candidate("x"), candidate("y")];

        let selection = select_picks(&candidates, &ids(&["x", "x"]), LIST_PICK_LIMIT);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains("x"));

        let picks = ids(&["y", "x", "y"]);
        let poster = pick_poster("Your Eras", &candidates, &picks, LIST_PICK_LIMIT)
            .expect("picks were given");
        let picked: Vec<&str> = poster.tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(picked, vec!["x", "y"]);
    }

    #[test]
    fn test_unknown_and_excess_picks_are_skipped() {
        let candidates = vec![candidate("a"), candidate("b"), candidate("c")];

        let selection = select_picks(&candidates, &ids(&["zzz", "c", "a", "b"]), 2);
        assert_eq!(selection.len(), 2);
        assert!(selection.contains("c"));
        assert!(selection.contains("a"));
        assert!(!selection.contains("b"));
    }

    #[test]
    fn test_no_picks_means_no_poster() {
        let candidates = vec![candidate("a")];
        assert!(pick_poster("Gatekeeper Score", &candidates, &[], LIST_PICK_LIMIT).is_none());
    }
}
