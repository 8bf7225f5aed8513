use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::request::UnsplashPhoto;

pub const DEFAULT_TITLE: &str = "Untitled Wallpaper";

/// A displayable, favoritable wallpaper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperItem {
    pub id: String,
    pub image_url: String,
    pub title: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl WallpaperItem {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl From<UnsplashPhoto> for WallpaperItem {
    fn from(photo: UnsplashPhoto) -> Self {
        from_unsplash(photo)
    }
}

/// Maps a provider record to a `WallpaperItem`.
///
/// Title precedence: alt description, then description, then [`DEFAULT_TITLE`].
/// Empty strings count as absent.
pub fn from_unsplash(photo: UnsplashPhoto) -> WallpaperItem {
    let title = [photo.alt_description, photo.description]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    WallpaperItem {
        id: photo.id,
        image_url: photo.urls.regular,
        title,
        is_favorite: false,
        category: None,
        author: Some(photo.user.name).filter(|name| !name.is_empty()),
        download_url: Some(photo.urls.full),
    }
}

/// Removes repeated ids, first occurrence wins, order preserved.
pub fn dedupe_by_id(items: Vec<WallpaperItem>) -> Vec<WallpaperItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Appends the items of `page` whose ids are not yet in `existing`.
/// Returns how many were appended.
pub fn append_unique(existing: &mut Vec<WallpaperItem>, page: Vec<WallpaperItem>) -> usize {
    let mut seen: HashSet<String> = existing.iter().map(|item| item.id.clone()).collect();
    let before = existing.len();
    existing.extend(page.into_iter().filter(|item| seen.insert(item.id.clone())));
    existing.len() - before
}

#[cfg(test)]
pub(crate) fn item(id: &str) -> WallpaperItem {
    WallpaperItem {
        id: id.to_string(),
        image_url: format!("https://images.example/{id}"),
        title: id.to_uppercase(),
        is_favorite: false,
        category: None,
        author: None,
        download_url: None,
    }
}
