use chrono::Utc;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::fallback;
use crate::photo_id::{capitalize, PhotoId};
use crate::request::{GatewayError, PhotoApi};
use crate::wallpaper::{from_unsplash, WallpaperItem};

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub results: Vec<WallpaperItem>,
    pub total: usize,
}

/// Wallpaper listings as the screens consume them.
///
/// Every operation resolves to data: implementations substitute fallback
/// content instead of reporting failures.
pub trait PhotoGateway: Send + Sync {
    fn random_photos(&self, count: usize) -> Vec<WallpaperItem>;
    fn search_photos(&self, query: &str, page: u32, per_page: u32) -> SearchPage;
    fn photos_by_category(&self, category: &str, page: u32, per_page: u32) -> Vec<WallpaperItem>;
    fn photo_by_id(&self, id: &str) -> WallpaperItem;
}

/// [`PhotoGateway`] over a [`PhotoApi`], with a live -> table -> placeholder
/// resolution order on every path.
pub struct Gateway<A> {
    api: A,
    last_cache_buster: AtomicI64,
}

impl<A: PhotoApi> Gateway<A> {
    pub fn new(api: A) -> Self {
        Self { api, last_cache_buster: AtomicI64::new(0) }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // Millisecond timestamp, strictly increasing across calls.
    fn next_cache_buster(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_cache_buster.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_cache_buster.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    fn try_search(&self, query: &str, page: u32, per_page: u32) -> Result<SearchPage, GatewayError> {
        let response = self.api.search(query, page, per_page)?;
        Ok(SearchPage {
            results: response.results.into_iter().map(from_unsplash).collect(),
            total: response.total,
        })
    }

    fn try_photo(&self, id: &str) -> Result<WallpaperItem, GatewayError> {
        self.api.photo(id).map(from_unsplash)
    }
}

impl<A: PhotoApi> PhotoGateway for Gateway<A> {
    fn random_photos(&self, count: usize) -> Vec<WallpaperItem> {
        match self.api.random(count, self.next_cache_buster()) {
            Ok(photos) => {
                debug!("Fetched {} random photos", photos.len());
                photos.into_iter().map(from_unsplash).collect()
            }
            Err(e) => {
                warn!("Error fetching from API, using fallback data: {}", e);
                fallback::random_photos()
            }
        }
    }

    fn search_photos(&self, query: &str, page: u32, per_page: u32) -> SearchPage {
        match self.try_search(query, page, per_page) {
            Ok(page) => page,
            Err(e) => {
                warn!("Error searching from API, using fallback data: {}", e);
                let results = fallback::search_results(query);
                SearchPage { total: results.len(), results }
            }
        }
    }

    fn photos_by_category(&self, category: &str, page: u32, per_page: u32) -> Vec<WallpaperItem> {
        match self.try_search(category, page, per_page) {
            Ok(page) => page
                .results
                .into_iter()
                .map(|item| item.with_category(category))
                .collect(),
            Err(e) => {
                warn!("Error fetching photos for category {}: {}", category, e);
                fallback::category_photos(category)
            }
        }
    }

    fn photo_by_id(&self, id: &str) -> WallpaperItem {
        let parsed = PhotoId::parse(id);

        if let PhotoId::Search { .. } = parsed {
            // only the leading slug word is searched and shown
            let query = parsed.search_token().unwrap_or_default().to_string();
            let title = capitalize(&query);
            return match self.search_photos(&query, 1, 1).results.into_iter().next() {
                Some(found) => WallpaperItem { id: id.to_string(), title, ..found },
                None => {
                    warn!("Search result not found for {}", id);
                    fallback::generic(id)
                }
            };
        }

        if let PhotoId::CategoryFallback { category, .. } = &parsed {
            if let Some(found) = fallback::category_photos(category).into_iter().find(|item| item.id == id) {
                return found;
            }
        }

        match self.try_photo(id) {
            Ok(item) => item,
            Err(e) => {
                warn!("API error fetching photo with ID {}: {}", id, e);
                if let PhotoId::Placeholder { index } = parsed {
                    let batch = self.random_photos(fallback::random_photos().len());
                    if let Some(found) = usize::try_from(index)
                        .ok()
                        .and_then(|i| i.checked_sub(1))
                        .and_then(|i| batch.into_iter().nth(i))
                    {
                        return found;
                    }
                }
                info!("Using generic placeholder for {}", id);
                fallback::generic(id)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::request::{sample_photo, SearchResponse, UnsplashPhoto};
    use std::sync::Mutex;

    /// Scripted `PhotoApi`; `None` fields fail with a 503.
    #[derive(Default)]
    pub struct ScriptedApi {
        pub random: Option<Vec<UnsplashPhoto>>,
        pub search: Option<SearchResponse>,
        pub photo: Option<UnsplashPhoto>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        pub fn failing() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn record(&self, call: String) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }
    }

    impl PhotoApi for ScriptedApi {
        fn random(&self, count: usize, cache_buster: i64) -> Result<Vec<UnsplashPhoto>, GatewayError> {
            self.record(format!("random {} {}", count, cache_buster));
            self.random.clone().ok_or(GatewayError::Network { status: 503 })
        }

        fn search(&self, query: &str, page: u32, per_page: u32) -> Result<SearchResponse, GatewayError> {
            self.record(format!("search {} {} {}", query, page, per_page));
            self.search.clone().ok_or(GatewayError::Network { status: 503 })
        }

        fn photo(&self, id: &str) -> Result<UnsplashPhoto, GatewayError> {
            self.record(format!("photo {}", id));
            match &self.photo {
                Some(photo) if photo.id == id => Ok(photo.clone()),
                Some(_) => Err(GatewayError::NotFound(id.to_string())),
                None => Err(GatewayError::Network { status: 503 }),
            }
        }
    }

    pub fn photos(ids: &[&str]) -> Vec<UnsplashPhoto> {
        ids.iter().map(|id| sample_photo(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{photos, ScriptedApi};
    use super::*;
    use crate::request::{sample_photo, SearchResponse};

    fn live_search(ids: &[&str], total: usize) -> SearchResponse {
        SearchResponse { total, results: photos(ids) }
    }

    #[test]
    fn random_failure_returns_fixed_set() {
        let gateway = Gateway::new(ScriptedApi::failing());
        assert_eq!(gateway.random_photos(20), fallback::random_photos());
    }

    #[test]
    fn random_success_normalizes_records() {
        let api = ScriptedApi { random: Some(photos(&["a", "b"])), ..Default::default() };
        let gateway = Gateway::new(api);
        let items = gateway.random_photos(2);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(items[0].title, crate::wallpaper::DEFAULT_TITLE);
    }

    #[test]
    fn cache_buster_differs_between_calls() {
        let gateway = Gateway::new(ScriptedApi::failing());
        gateway.random_photos(3);
        gateway.random_photos(3);
        let calls = gateway.api().calls();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0], calls[1]);
    }

    #[test]
    fn search_failure_synthesizes_from_query() {
        let gateway = Gateway::new(ScriptedApi::failing());
        let page = gateway.search_photos("Nature Sky", 1, 20);
        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.results.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["search-nature-sky-1", "search-nature-sky-2", "search-nature-sky-3"]);
        assert!(page.results.iter().all(|i| i.category.as_deref() == Some("Nature Sky")));
    }

    #[test]
    fn search_success_passes_total_through() {
        let api = ScriptedApi { search: Some(live_search(&["x", "y"], 240)), ..Default::default() };
        let page = Gateway::new(api).search_photos("sky", 2, 2);
        assert_eq!(page.total, 240);
        assert_eq!(page.results.len(), 2);
    }

    #[test]
    fn category_success_stamps_category() {
        let api = ScriptedApi { search: Some(live_search(&["x", "y"], 2)), ..Default::default() };
        let gateway = Gateway::new(api);
        let items = gateway.photos_by_category("Neon", 1, 20);
        assert!(items.iter().all(|i| i.category.as_deref() == Some("Neon")));
        assert_eq!(gateway.api().calls(), ["search Neon 1 20"]);
    }

    #[test]
    fn category_failure_uses_table_or_nothing() {
        let gateway = Gateway::new(ScriptedApi::failing());
        let minimal = gateway.photos_by_category("Minimal", 1, 20);
        assert_eq!(minimal.len(), 1);
        assert_eq!(minimal[0].id, "minimal-1");
        assert!(gateway.photos_by_category("Unknown", 1, 20).is_empty());
    }

    #[test]
    fn photo_by_id_never_comes_back_empty_handed() {
        let gateway = Gateway::new(ScriptedApi::failing());
        for id in ["search-nature-sky-1", "search-x", "abstract-2", "unknown-7", "photo-4", "photo-99", "Dwu85P9SOIk", ""] {
            let item = gateway.photo_by_id(id);
            assert!(!item.image_url.is_empty(), "empty item for {id:?}");
        }
    }

    #[test]
    fn photo_by_id_search_keeps_id_and_relabels_from_leading_word() {
        let gateway = Gateway::new(ScriptedApi::failing());
        let item = gateway.photo_by_id("search-nature-sky-2");
        assert_eq!(item.id, "search-nature-sky-2");
        assert_eq!(item.title, "Nature");
        assert_eq!(gateway.api().calls(), ["search nature 1 1"]);
    }

    #[test]
    fn photo_by_id_search_with_no_live_results_is_generic() {
        let api = ScriptedApi { search: Some(live_search(&[], 0)), ..Default::default() };
        let item = Gateway::new(api).photo_by_id("search-void-1");
        assert_eq!(item, fallback::generic("search-void-1"));
    }

    #[test]
    fn photo_by_id_category_fallback_resolves_from_table() {
        let gateway = Gateway::new(ScriptedApi::failing());
        let item = gateway.photo_by_id("nature-2");
        assert_eq!(item.title, "Forest Path");
        assert!(gateway.api().calls().is_empty());
    }

    #[test]
    fn photo_by_id_placeholder_indexes_random_batch() {
        let gateway = Gateway::new(ScriptedApi::failing());
        let item = gateway.photo_by_id("photo-5");
        assert_eq!(item.id, "photo-5");
        assert_eq!(item.title, "Space Galaxy");

        let out_of_range = gateway.photo_by_id("photo-9");
        assert_eq!(out_of_range, fallback::generic("photo-9"));
    }

    #[test]
    fn photo_by_id_native_prefers_live_record() {
        let mut photo = sample_photo("Dwu85P9SOIk");
        photo.alt_description = Some("city at night".to_string());
        let api = ScriptedApi { photo: Some(photo), ..Default::default() };
        let item = Gateway::new(api).photo_by_id("Dwu85P9SOIk");
        assert_eq!(item.title, "city at night");
    }

    #[test]
    fn photo_by_id_not_found_is_generic() {
        let api = ScriptedApi { photo: Some(sample_photo("other")), ..Default::default() };
        let item = Gateway::new(api).photo_by_id("missing");
        assert_eq!(item, fallback::generic("missing"));
    }
}
