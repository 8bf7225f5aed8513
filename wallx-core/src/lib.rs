//! Core of the wallx wallpaper browser: photo provider access with offline
//! fallbacks, paginated wallpaper collections, favorites, categories, theme
//! and sign-in state.

pub mod app;
pub mod auth;
pub mod catalog;
pub mod collection;
pub mod fallback;
pub mod favorites;
pub mod gateway;
pub mod photo_id;
pub mod request;
pub mod storage;
pub mod theme;
pub mod wallpaper;

pub use app::WallxApp;
pub use auth::{AuthClient, AuthError, AuthSession, AuthState, AuthUser, SupabaseAuth};
pub use catalog::Category;
pub use collection::{LoadState, PageSizes, RequestKind, Source, WallpaperCollection};
pub use favorites::{FavoriteBridge, FavoriteRoute, FavoriteShelf};
pub use gateway::{Gateway, PhotoGateway, SearchPage};
pub use photo_id::PhotoId;
pub use request::{GatewayError, PhotoApi, UnsplashApi};
pub use storage::{Config, FileKvStore, KvStore, MemoryKvStore};
pub use theme::Theme;
pub use wallpaper::WallpaperItem;
