use crate::model::{Playlist, Track};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Source of tracks and playlists. Empty results mean "no tracks", not failure.
pub trait Catalog {
    fn search(&self, query: &str) -> Result<Vec<Track>>;
    fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>>;
    fn user_playlists(&self) -> Result<Vec<Playlist>>;
    fn liked_tracks(&self) -> Result<Vec<Track>>;
}

/// Turns a queued track into something the renderer can open.
pub trait StreamResolver: Send {
    fn stream_url(&self, track: &Track) -> Result<String>;
}

pub struct WatchUrlResolver {
    base: String,
}

impl WatchUrlResolver {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
        }
    }
}

impl StreamResolver for WatchUrlResolver {
    fn stream_url(&self, track: &Track) -> Result<String> {
        if track.id.trim().is_empty() {
            anyhow::bail!("track \"{}\" has no catalog id", track.title);
        }
        Ok(format!("{}{}", self.base, track.id))
    }
}

/// Catalog backed by a JSON file of playlists and liked tracks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryCatalog {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    #[serde(default)]
    pub liked: Vec<Track>,
}

impl LibraryCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read library file {}", path.display()))?;
        let library: LibraryCatalog = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse library file {}", path.display()))?;
        Ok(library)
    }

    fn all_tracks(&self) -> impl Iterator<Item = &Track> {
        self.liked
            .iter()
            .chain(self.playlists.iter().flat_map(|playlist| playlist.tracks.iter()))
    }
}

impl Catalog for LibraryCatalog {
    fn search(&self, query: &str) -> Result<Vec<Track>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: Vec<Track> = Vec::new();
        for track in self.all_tracks() {
            let matches = track.title.to_lowercase().contains(&needle)
                || track.artist.to_lowercase().contains(&needle);
            if matches && !found.iter().any(|existing| existing.id == track.id) {
                found.push(track.clone());
            }
        }
        Ok(found)
    }

    fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        let playlist = self
            .playlists
            .iter()
            .find(|playlist| playlist.id == playlist_id)
            .with_context(|| format!("playlist {playlist_id} not found"))?;
        Ok(playlist.tracks.clone())
    }

    fn user_playlists(&self) -> Result<Vec<Playlist>> {
        Ok(self.playlists.clone())
    }

    fn liked_tracks(&self) -> Result<Vec<Track>> {
        Ok(self.liked.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn library() -> LibraryCatalog {
        LibraryCatalog {
            playlists: vec![Playlist {
                id: String::from("PL1"),
                title: String::from("Road trip"),
                tracks: vec![
                    Track::new("a1", "Highway Song", "The Drivers", 200),
                    Track::new("a2", "Exit Ramp", "Merge", 150),
                ],
            }],
            liked: vec![
                Track::new("a1", "Highway Song", "The Drivers", 200),
                Track::new("b1", "Quiet Night", "Lamps", 240),
            ],
        }
    }

    #[test]
    fn search_matches_title_or_artist_once() {
        let catalog = library();
        let found = catalog.search("drivers").expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a1");

        let found = catalog.search("NIGHT").expect("search");
        assert_eq!(found[0].id, "b1");
    }

    #[test]
    fn empty_results_are_not_errors() {
        let catalog = LibraryCatalog::default();
        assert!(catalog.search("anything").expect("search").is_empty());
        assert!(catalog.liked_tracks().expect("liked").is_empty());
        assert!(catalog.user_playlists().expect("playlists").is_empty());
        assert!(library().search("   ").expect("search").is_empty());
    }

    #[test]
    fn unknown_playlist_is_an_error() {
        assert!(library().playlist_tracks("nope").is_err());
        assert_eq!(library().playlist_tracks("PL1").expect("tracks").len(), 2);
    }

    #[test]
    fn loads_library_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("library.json");
        fs::write(
            &path,
            r#"{"playlists":[{"id":"p","title":"Mix","tracks":[{"id":"x","title":"X","artist":"Y","duration":61}]}]}"#,
        )
        .expect("write");

        let catalog = LibraryCatalog::load(&path).expect("load");
        assert!(catalog.liked.is_empty());
        assert_eq!(catalog.playlist_tracks("p").expect("tracks")[0].duration, 61);
    }

    #[test]
    fn watch_resolver_appends_id() {
        let resolver = WatchUrlResolver::new("https://www.youtube.com/watch?v=");
        let url = resolver
            .stream_url(&Track::new("dQw4w9WgXcQ", "Song", "Artist", 212))
            .expect("url");
        assert_eq!(url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(resolver.stream_url(&Track::new("", "Song", "Artist", 1)).is_err());
    }
}
