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

use rspotify::{prelude::*, scopes, AuthCodePkceSpotify, Config, Credentials, OAuth};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to initialize Spotify client: {0}")]
    ClientConfig(String),
    #[error("Spotify authentication failed: {0}")]
    Spotify(#[from] rspotify::ClientError),
}

/// Initializes and authenticates a Spotify client using the Authorization Code Flow with PKCE.
///
/// This function:
/// 1. Reads the client id (`RSPOTIFY_CLIENT_ID`) from the environment. No secret is needed.
/// 2. Reads the redirect URI (`RSPOTIFY_REDIRECT_URI`) from the environment.
/// 3. Requests the read-only scopes needed to rank top tracks.
/// 4. Handles the OAuth2 flow, including token caching and refreshing.
///
/// The returned client is the session: hand it to [`crate::SpotifySource::new`].
/// If a valid token is not cached, the user is prompted (via stdout) to visit a URL
/// to authorize the application.
pub async fn get_spotify_client() -> Result<AuthCodePkceSpotify, AuthError> {
    let creds = Credentials::from_env()
        .ok_or_else(|| AuthError::ClientConfig("Missing RSPOTIFY_CLIENT_ID".to_string()))?;

    // - user-top-read: top tracks and their audio features.
    // - user-read-private / user-read-email: profile of the logged in user.
    let scopes = scopes!("user-top-read", "user-read-private", "user-read-email");

    let oauth = OAuth::from_env(scopes)
        .ok_or_else(|| AuthError::ClientConfig("Missing RSPOTIFY_REDIRECT_URI".to_string()))?;

    let config = Config {
        token_cached: true,
        token_refreshing: true,
        ..Default::default()
    };

    let mut spotify = AuthCodePkceSpotify::with_config(creds, oauth, config);

    // Generates the PKCE verifier (default length) and keeps it inside the client.
    let url = spotify.get_authorize_url(None)?;

    spotify.prompt_for_token(&url).await?;

    Ok(spotify)
}
