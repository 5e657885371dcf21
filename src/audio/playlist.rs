use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A user-made playlist. Holds track ids, not tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Ordered, no duplicates
    pub track_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomPlaylist {
    /// Create a new empty playlist
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            track_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append ids not already present. Returns how many were added.
    pub fn add_tracks(&mut self, track_ids: &[String]) -> usize {
        let mut added = 0;
        for id in track_ids {
            if !self.track_ids.contains(id) {
                self.track_ids.push(id.clone());
                added += 1;
            }
        }
        self.touch();
        added
    }

    /// Drop every listed id. Returns how many were removed.
    pub fn remove_tracks(&mut self, track_ids: &[String]) -> usize {
        let before = self.track_ids.len();
        self.track_ids.retain(|id| !track_ids.contains(id));
        self.touch();
        before - self.track_ids.len()
    }

    /// Move a track to a different position in the playlist
    pub fn move_track(&mut self, from_index: usize, to_index: usize) -> bool {
        if from_index < self.track_ids.len() && to_index < self.track_ids.len() {
            let id = self.track_ids.remove(from_index);
            self.track_ids.insert(to_index, id);
            self.touch();
            true
        } else {
            false
        }
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.track_ids.iter().any(|id| id == track_id)
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Keeps the user's playlists in creation order
#[derive(Debug, Clone, Default)]
pub struct PlaylistManager {
    playlists: Vec<CustomPlaylist>,
}

impl PlaylistManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_playlists(playlists: Vec<CustomPlaylist>) -> Self {
        Self { playlists }
    }

    /// Create a new playlist and return its id. Names need not be unique.
    pub fn create_playlist(&mut self, name: String, description: Option<String>) -> String {
        let playlist = CustomPlaylist::new(name, description);
        let id = playlist.id.clone();
        info!("Created new playlist: '{}'", playlist.name);
        self.playlists.push(playlist);
        id
    }

    pub fn get_playlist(&self, id: &str) -> Option<&CustomPlaylist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    fn get_playlist_mut(&mut self, id: &str) -> Result<&mut CustomPlaylist> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::PlaylistNotFound(id.to_string()))
    }

    pub fn rename_playlist(&mut self, id: &str, new_name: String) -> Result<()> {
        let playlist = self.get_playlist_mut(id)?;
        let old_name = std::mem::replace(&mut playlist.name, new_name);
        playlist.touch();
        info!("Renamed playlist '{}' to '{}'", old_name, playlist.name);
        Ok(())
    }

    pub fn set_description(&mut self, id: &str, description: Option<String>) -> Result<()> {
        let playlist = self.get_playlist_mut(id)?;
        playlist.description = description;
        playlist.touch();
        Ok(())
    }

    /// Returns whether anything was deleted
    pub fn delete_playlist(&mut self, id: &str) -> bool {
        match self.playlists.iter().position(|p| p.id == id) {
            Some(pos) => {
                let playlist = self.playlists.remove(pos);
                info!("Deleted playlist: '{}'", playlist.name);
                true
            }
            None => false,
        }
    }

    pub fn add_to_playlist(&mut self, id: &str, track_ids: &[String]) -> Result<usize> {
        let playlist = self.get_playlist_mut(id)?;
        let added = playlist.add_tracks(track_ids);
        info!("Added {} tracks to playlist '{}'", added, playlist.name);
        Ok(added)
    }

    pub fn remove_from_playlist(&mut self, id: &str, track_ids: &[String]) -> Result<usize> {
        let playlist = self.get_playlist_mut(id)?;
        Ok(playlist.remove_tracks(track_ids))
    }

    pub fn move_track(&mut self, id: &str, from_index: usize, to_index: usize) -> Result<bool> {
        Ok(self.get_playlist_mut(id)?.move_track(from_index, to_index))
    }

    /// Drop a track from every playlist that has it (library removal)
    pub fn remove_track_everywhere(&mut self, track_id: &str) {
        let ids = [track_id.to_string()];
        for playlist in self.playlists.iter_mut().filter(|p| p.contains(track_id)) {
            playlist.remove_tracks(&ids);
        }
    }

    pub fn list_playlists(&self) -> &[CustomPlaylist] {
        &self.playlists
    }

    pub fn playlists_containing(&self, track_id: &str) -> Vec<&CustomPlaylist> {
        self.playlists.iter().filter(|p| p.contains(track_id)).collect()
    }

    pub fn clear(&mut self) {
        self.playlists.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_and_lookup() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Road trip".to_string(), Some("summer".to_string()));
        let other = manager.create_playlist("Road trip".to_string(), None);

        assert_ne!(id, other);
        let playlist = manager.get_playlist(&id).unwrap();
        assert_eq!(playlist.name, "Road trip");
        assert_eq!(playlist.description.as_deref(), Some("summer"));
        assert!(playlist.is_empty());
        assert_eq!(manager.list_playlists().len(), 2);
    }

    #[test]
    fn test_add_filters_duplicates() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Mix".to_string(), None);

        assert_eq!(manager.add_to_playlist(&id, &ids(&["a", "b"])).unwrap(), 2);
        assert_eq!(manager.add_to_playlist(&id, &ids(&["b", "c", "a"])).unwrap(), 1);
        assert_eq!(manager.get_playlist(&id).unwrap().track_ids, ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_remove_and_touch() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Mix".to_string(), None);
        manager.add_to_playlist(&id, &ids(&["a", "b", "c"])).unwrap();
        let before = manager.get_playlist(&id).unwrap().updated_at;

        assert_eq!(manager.remove_from_playlist(&id, &ids(&["b", "zzz"])).unwrap(), 1);
        let playlist = manager.get_playlist(&id).unwrap();
        assert_eq!(playlist.track_ids, ids(&["a", "c"]));
        assert!(playlist.updated_at >= before);
        assert!(playlist.updated_at >= playlist.created_at);
    }

    #[test]
    fn test_rename_and_delete() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Old".to_string(), None);

        manager.rename_playlist(&id, "New".to_string()).unwrap();
        assert_eq!(manager.get_playlist(&id).unwrap().name, "New");

        assert!(manager.delete_playlist(&id));
        assert!(!manager.delete_playlist(&id));
        assert!(matches!(
            manager.rename_playlist(&id, "x".to_string()),
            Err(Error::PlaylistNotFound(_))
        ));
        assert!(manager.add_to_playlist(&id, &ids(&["a"])).is_err());
    }

    #[test]
    fn test_move_track() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Mix".to_string(), None);
        manager.add_to_playlist(&id, &ids(&["a", "b", "c"])).unwrap();

        assert!(manager.move_track(&id, 2, 0).unwrap());
        assert!(!manager.move_track(&id, 5, 0).unwrap());
        assert_eq!(manager.get_playlist(&id).unwrap().track_ids, ids(&["c", "a", "b"]));
    }

    #[test]
    fn test_remove_track_everywhere() {
        let mut manager = PlaylistManager::new();
        let first = manager.create_playlist("One".to_string(), None);
        let second = manager.create_playlist("Two".to_string(), None);
        manager.add_to_playlist(&first, &ids(&["a", "b"])).unwrap();
        manager.add_to_playlist(&second, &ids(&["b"])).unwrap();

        assert_eq!(manager.playlists_containing("b").len(), 2);
        manager.remove_track_everywhere("b");
        assert!(manager.playlists_containing("b").is_empty());
        assert_eq!(manager.get_playlist(&first).unwrap().track_ids, ids(&["a"]));
    }
}
