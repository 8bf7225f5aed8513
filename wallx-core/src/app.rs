use anyhow::{anyhow, Context, Result};
use log::{error, info};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::{AuthClient, AuthState, SupabaseAuth, UnconfiguredAuth};
use crate::catalog::{self, Category};
use crate::collection::{PageSizes, Source, WallpaperCollection};
use crate::favorites::FavoriteShelf;
use crate::gateway::{Gateway, PhotoGateway};
use crate::request::UnsplashApi;
use crate::storage::{Config, FileKvStore, KvStore};
use crate::theme::{self, Theme};
use crate::wallpaper::WallpaperItem;

/// Everything a front end needs: configuration, storage, the photo gateway,
/// the signed-in session and the favorites shelf.
pub struct WallxApp {
    config: Config,
    storage: Arc<dyn KvStore>,
    gateway: Arc<dyn PhotoGateway>,
    auth: AuthState,
    shelf: Arc<Mutex<FavoriteShelf>>,
    theme: Theme,
}

impl WallxApp {
    pub fn new(config: Config) -> Result<Self> {
        let storage: Arc<dyn KvStore> = Arc::new(FileKvStore::new(&config.storage_dir)?);
        let secure: Arc<dyn KvStore> = Arc::new(FileKvStore::secure(&config.secure_dir)?);

        let api = UnsplashApi::new(
            config.unsplash_api_url.clone(),
            config.unsplash_access_key.clone(),
            config.http_timeout,
        );
        let gateway: Arc<dyn PhotoGateway> = Arc::new(Gateway::new(api));

        let auth_client: Arc<dyn AuthClient> = match (&config.supabase_url, &config.supabase_anon_key) {
            (Some(url), Some(key)) => Arc::new(SupabaseAuth::new(url, key, config.http_timeout, secure)),
            _ => {
                info!("Auth service not configured, sign-in disabled");
                Arc::new(UnconfiguredAuth)
            }
        };

        let mut app = Self {
            config,
            storage: storage.clone(),
            gateway,
            auth: AuthState::new(auth_client),
            shelf: Arc::new(Mutex::new(FavoriteShelf::new())),
            theme: Theme::default(),
        };
        app = app.with_storage(storage);
        Ok(app)
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PhotoGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_auth_client(mut self, client: Arc<dyn AuthClient>) -> Self {
        self.auth = AuthState::new(client);
        self
    }

    /// Swaps the general key-value store and reloads favorites and theme
    /// from it.
    pub fn with_storage(mut self, storage: Arc<dyn KvStore>) -> Self {
        let shelf = FavoriteShelf::load(storage.as_ref()).unwrap_or_else(|e| {
            error!("Failed to load favorites: {:#}", e);
            FavoriteShelf::new()
        });
        self.theme = theme::load_theme(storage.as_ref(), Theme::default());
        self.shelf = Arc::new(Mutex::new(shelf));
        self.storage = storage;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> Arc<dyn PhotoGateway> {
        self.gateway.clone()
    }

    pub fn storage(&self) -> &dyn KvStore {
        self.storage.as_ref()
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthState {
        &mut self.auth
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = theme::toggle_theme(self.storage.as_ref(), self.theme);
        self.theme
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        catalog::load_categories(self.storage.as_ref()).context("Failed to load categories")
    }

    /// Random listing for the home screen. Saved favorites come in marked.
    pub fn home_collection(&self) -> WallpaperCollection {
        WallpaperCollection::new(self.gateway.clone(), Source::Random, PageSizes::HOME)
            .with_favorites(self.favorite_ids())
    }

    pub fn category_collection(&self, category: &str) -> WallpaperCollection {
        WallpaperCollection::new(
            self.gateway.clone(),
            Source::Category(category.to_string()),
            PageSizes::CATEGORY,
        )
        .with_favorites(self.favorite_ids())
    }

    /// Parent-managed list of the saved favorites. Toggling an entry takes
    /// it off the shelf.
    pub fn favorites_collection(&self) -> WallpaperCollection {
        let shelf = self.shelf.clone();
        let storage = self.storage.clone();
        let items = self.favorites();
        WallpaperCollection::provided(self.gateway.clone(), items).with_favorite_handler(move |id| {
            let Ok(mut shelf) = shelf.lock() else {
                error!("Favorites shelf lock poisoned");
                return;
            };
            if shelf.remove(id) {
                if let Err(e) = shelf.save(storage.as_ref()) {
                    error!("Failed to save favorites: {:#}", e);
                }
            }
        })
    }

    pub fn favorites(&self) -> Vec<WallpaperItem> {
        self.shelf().map(|shelf| shelf.items()).unwrap_or_default()
    }

    fn favorite_ids(&self) -> Vec<String> {
        self.favorites().into_iter().map(|item| item.id).collect()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.shelf().map(|shelf| shelf.is_favorite(id)).unwrap_or(false)
    }

    /// Brings the shelf in line with `item.is_favorite` and persists it.
    pub fn record_favorite(&self, item: &WallpaperItem) -> Result<()> {
        let mut shelf = self.shelf()?;
        if shelf.is_favorite(&item.id) != item.is_favorite {
            shelf.toggle(item);
            shelf.save(self.storage.as_ref())?;
        }
        Ok(())
    }

    fn shelf(&self) -> Result<MutexGuard<'_, FavoriteShelf>> {
        self.shelf.lock().map_err(|_| anyhow!("favorites shelf lock poisoned"))
    }
}
