use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::photo_id::capitalize;
use crate::storage::KvStore;

pub const CATEGORIES_KEY: &str = "wallx_categories";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image_url: String,
}

const DEFAULT_CATEGORIES: [(&str, &str, &str); 8] = [
    ("abstract", "Abstract", "https://images.unsplash.com/photo-1579546929518-9e396f3cc809?w=400&q=80"),
    ("nature", "Nature", "https://images.unsplash.com/photo-1518531933037-91b2f5f229cc?w=400&q=80"),
    ("minimal", "Minimal", "https://images.unsplash.com/photo-1516617442634-75371039cb3a?w=400&q=80"),
    ("urban", "Urban", "https://images.unsplash.com/photo-1604076913837-52ab5629fba9?w=400&q=80"),
    ("space", "Space", "https://images.unsplash.com/photo-1614850523296-d8c1af93d400?w=400&q=80"),
    ("neon", "Neon", "https://images.unsplash.com/photo-1557682250-33bd709cbe85?w=400&q=80"),
    ("geometric", "Geometric", "https://images.unsplash.com/photo-1618005198919-d3d4b5a92ead?w=400&q=80"),
    ("gradient", "Gradient", "https://images.unsplash.com/photo-1558591710-4b4a1ae0f04d?w=400&q=80"),
];

pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(id, name, image_url)| Category {
            id: id.to_string(),
            name: name.to_string(),
            image_url: image_url.to_string(),
        })
        .collect()
}

/// Reads the stored catalog, seeding it with the defaults on first use.
pub fn load_categories(kv: &dyn KvStore) -> Result<Vec<Category>> {
    if let Some(raw) = kv.get_item(CATEGORIES_KEY)? {
        match serde_json::from_str::<Vec<Category>>(&raw) {
            Ok(categories) => {
                info!("load_categories: Loaded {} categories from storage", categories.len());
                return Ok(categories);
            }
            Err(e) => warn!("load_categories: Stored categories unreadable, reseeding: {}", e),
        }
    }

    let categories = default_categories();
    save_categories(kv, &categories)?;
    info!("load_categories: Seeded {} default categories", categories.len());
    Ok(categories)
}

pub fn save_categories(kv: &dyn KvStore, categories: &[Category]) -> Result<()> {
    let raw = serde_json::to_string(categories).context("Failed to encode categories")?;
    kv.set_item(CATEGORIES_KEY, &raw)
}

pub fn find_category<'a>(categories: &'a [Category], id: &str) -> Option<&'a Category> {
    categories.iter().find(|category| category.id.eq_ignore_ascii_case(id))
}

/// Title for a category screen: the id with its first letter upper-cased.
pub fn display_name(id: &str) -> String {
    capitalize(id)
}
