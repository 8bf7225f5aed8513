//! Static data substituted when the photo service is unreachable.

use crate::photo_id::PhotoId;
use crate::wallpaper::WallpaperItem;

const FALLBACK_AUTHOR: &str = "Unsplash";

const ABSTRACT_WAVE: &str = "https://images.unsplash.com/photo-1579546929518-9e396f3cc809?w=400&q=80";
const NATURE_LANDSCAPE: &str = "https://images.unsplash.com/photo-1518531933037-91b2f5f229cc?w=400&q=80";
const MINIMAL_DARK: &str = "https://images.unsplash.com/photo-1516617442634-75371039cb3a?w=400&q=80";
const URBAN_SCENE: &str = "https://images.unsplash.com/photo-1604076913837-52ab5629fba9?w=400&q=80";
const SPACE_GALAXY: &str = "https://images.unsplash.com/photo-1614850523296-d8c1af93d400?w=400&q=80";
const NEON_LIGHTS: &str = "https://images.unsplash.com/photo-1557682250-33bd709cbe85?w=400&q=80";
const ABSTRACT_GEOMETRY: &str = "https://images.unsplash.com/photo-1618005198919-d3d4b5a92ead?w=400&q=80";
const FOREST_PATH: &str = "https://images.unsplash.com/photo-1501854140801-50d01698950b?w=400&q=80";

// (title, category, image)
const RANDOM_SET: [(&str, &str, &str); 6] = [
    ("Abstract Wave", "Abstract", ABSTRACT_WAVE),
    ("Nature Landscape", "Nature", NATURE_LANDSCAPE),
    ("Minimal Dark", "Minimal", MINIMAL_DARK),
    ("Urban Scene", "Urban", URBAN_SCENE),
    ("Space Galaxy", "Space", SPACE_GALAXY),
    ("Neon Lights", "Neon", NEON_LIGHTS),
];

const SEARCH_IMAGES: [&str; 3] = [ABSTRACT_WAVE, NATURE_LANDSCAPE, MINIMAL_DARK];

// keyed by lowercased category name: (title, image)
const CATEGORY_TABLE: &[(&str, &str, &[(&str, &str)])] = &[
    ("abstract", "Abstract", &[("Abstract Wave", ABSTRACT_WAVE), ("Abstract Geometry", ABSTRACT_GEOMETRY)]),
    ("nature", "Nature", &[("Mountain View", NATURE_LANDSCAPE), ("Forest Path", FOREST_PATH)]),
    ("minimal", "Minimal", &[("Minimal Dark", MINIMAL_DARK)]),
    ("space", "Space", &[("Galaxy", SPACE_GALAXY)]),
];

fn placeholder(id: String, image_url: &str, title: String, category: &str) -> WallpaperItem {
    WallpaperItem {
        id,
        image_url: image_url.to_string(),
        title,
        is_favorite: false,
        category: Some(category.to_string()),
        author: Some(FALLBACK_AUTHOR.to_string()),
        download_url: None,
    }
}

/// The fixed six-item set, ids `photo-1` through `photo-6`.
pub fn random_photos() -> Vec<WallpaperItem> {
    RANDOM_SET
        .iter()
        .enumerate()
        .map(|(i, (title, category, image))| {
            let id = PhotoId::Placeholder { index: i as u64 + 1 };
            placeholder(id.to_string(), image, title.to_string(), category)
        })
        .collect()
}

/// Up to three results derived from the query text.
pub fn search_results(query: &str) -> Vec<WallpaperItem> {
    SEARCH_IMAGES
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let n = i as u64 + 1;
            placeholder(
                PhotoId::search(query, n).to_string(),
                image,
                format!("{} Wallpaper {}", query, n),
                query,
            )
        })
        .collect()
}

/// Table entries for a category, case-insensitive. Unknown categories yield nothing.
pub fn category_photos(category: &str) -> Vec<WallpaperItem> {
    let key = category.to_lowercase();
    CATEGORY_TABLE
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(name, display, entries)| {
            entries
                .iter()
                .enumerate()
                .map(|(i, (title, image))| {
                    let id = PhotoId::category_fallback(name, i as u64 + 1);
                    placeholder(id.to_string(), image, title.to_string(), display)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Last resort for a lookup by id; keeps the requested id.
pub fn generic(id: &str) -> WallpaperItem {
    placeholder(id.to_string(), ABSTRACT_WAVE, "Wallpaper".to_string(), "Abstract")
}
