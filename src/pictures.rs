//! Room picture handling.

use serde::Serialize;
use std::collections::HashSet;

/// Whether a stored picture reference can be handed to an image renderer.
///
/// `data:` and `http(s):` URLs are the expected forms, but any other non-empty
/// reference is accepted too: blob-storage identifiers are resolved elsewhere.
pub fn is_valid_picture_url(url: &str) -> bool {
    !url.trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisiblePicture {
    /// Position in the room's stored picture list
    pub index: usize,
    pub url: String,
}

/// Pictures of one room plus the URLs that failed to load for this list.
///
/// Failures are keyed by URL, so excluding one picture never shifts the
/// indices of its neighbours. Replacing the list clears the failures.
#[derive(Debug, Clone)]
pub struct PictureGallery {
    pictures: Vec<String>,
    failed: HashSet<String>,
}

impl PictureGallery {
    pub fn new(pictures: Vec<String>) -> Self {
        Self {
            pictures,
            failed: HashSet::new(),
        }
    }

    /// Swap in a new picture list. Failures only reset if the list changed.
    pub fn set_pictures(&mut self, pictures: Vec<String>) {
        if pictures != self.pictures {
            self.pictures = pictures;
            self.failed.clear();
        }
    }

    /// Record a load failure. URLs that are not part of the list are ignored.
    pub fn mark_failed(&mut self, url: &str) -> bool {
        if !self.pictures.iter().any(|p| p == url) {
            return false;
        }
        self.failed.insert(url.to_string());
        true
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn visible(&self) -> Vec<VisiblePicture> {
        self.pictures
            .iter()
            .enumerate()
            .filter(|(_, url)| is_valid_picture_url(url) && !self.failed.contains(*url))
            .map(|(index, url)| VisiblePicture {
                index,
                url: url.clone(),
            })
            .collect()
    }
}
