use anyhow::{Context, Result};
use log::{info, warn};
use std::fmt;

use crate::storage::KvStore;
use crate::wallpaper::{dedupe_by_id, WallpaperItem};

pub const FAVORITES_KEY: &str = "wallx_favorites";

/// Where a favorite toggle was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteRoute {
    External,
    Local,
}

/// Routes each toggle to exactly one owner: the external handler when one
/// was supplied, the caller's local mutation otherwise.
#[derive(Default)]
pub struct FavoriteBridge {
    handler: Option<Box<dyn FnMut(&str) + Send>>,
}

impl FavoriteBridge {
    pub fn local() -> Self {
        Self { handler: None }
    }

    pub fn external(handler: impl FnMut(&str) + Send + 'static) -> Self {
        Self { handler: Some(Box::new(handler)) }
    }

    pub fn is_external(&self) -> bool {
        self.handler.is_some()
    }

    pub fn route<F: FnOnce(&str)>(&mut self, id: &str, local: F) -> FavoriteRoute {
        match self.handler.as_mut() {
            Some(handler) => {
                handler(id);
                FavoriteRoute::External
            }
            None => {
                local(id);
                FavoriteRoute::Local
            }
        }
    }
}

impl fmt::Debug for FavoriteBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FavoriteBridge")
            .field("external", &self.is_external())
            .finish()
    }
}

/// Parent-owned favorites, optionally persisted under [`FAVORITES_KEY`].
#[derive(Debug, Clone, Default)]
pub struct FavoriteShelf {
    items: Vec<WallpaperItem>,
}

impl FavoriteShelf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(kv: &dyn KvStore) -> Result<Self> {
        let Some(raw) = kv.get_item(FAVORITES_KEY)? else {
            return Ok(Self::new());
        };
        match serde_json::from_str::<Vec<WallpaperItem>>(&raw) {
            Ok(items) => {
                let items = dedupe_by_id(items)
                    .into_iter()
                    .map(|item| WallpaperItem { is_favorite: true, ..item })
                    .collect::<Vec<_>>();
                info!("Loaded {} favorites", items.len());
                Ok(Self { items })
            }
            Err(e) => {
                warn!("Discarding unreadable favorites: {}", e);
                Ok(Self::new())
            }
        }
    }

    pub fn save(&self, kv: &dyn KvStore) -> Result<()> {
        let raw = serde_json::to_string(&self.items).context("Failed to encode favorites")?;
        kv.set_item(FAVORITES_KEY, &raw)
    }

    pub fn items(&self) -> Vec<WallpaperItem> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Adds or removes `item`; returns whether it is a favorite afterwards.
    pub fn toggle(&mut self, item: &WallpaperItem) -> bool {
        if self.remove(&item.id) {
            false
        } else {
            self.items.push(WallpaperItem { is_favorite: true, ..item.clone() });
            true
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        before != self.items.len()
    }

    /// Marks the flags of `items` to match the shelf.
    pub fn mark(&self, items: &mut [WallpaperItem]) {
        for item in items.iter_mut() {
            item.is_favorite = self.is_favorite(&item.id);
        }
    }
}
