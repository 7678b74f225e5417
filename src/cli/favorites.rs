use anyhow::Result;

use crate::config::Config;
use crate::favorites::FavoritesClient;

pub async fn handle_favorites_command() -> Result<()> {
    let config = Config::load()?;
    let client = FavoritesClient::from_config(reqwest::Client::new(), &config.api);

    let favorites = client.list_favorites().await?;
    if favorites.is_empty() {
        println!("No favorites yet.");
        return Ok(());
    }

    println!("Found {} favorite(s):\n", favorites.len());

    for song in favorites {
        let saved = song
            .favorited_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        println!("ID: {}", song.id);
        println!("Title: {}", song.title);
        if let Some(tags) = song.tags.as_deref().filter(|t| !t.is_empty()) {
            println!("Tags: {}", tags);
        }
        println!("Saved: {}", saved);
        println!("Audio: {}", client.resolve_audio_url(&song.audio_url));
        println!("---");
    }

    println!("\nTo record over a song, use: karaoke-studio serve --track <Audio> --song-id <ID>");

    Ok(())
}
