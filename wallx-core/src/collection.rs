//! Per-screen wallpaper list with loading, error and favorite state.
//!
//! A collection is either parent-managed (the screen hands it a list and owns
//! the truth) or self-managed (it fetches through a [`PhotoGateway`]). Fetches
//! are split into [`WallpaperCollection::begin`], [`PageRequest::execute`] and
//! [`WallpaperCollection::commit`] so the network call can run elsewhere; only
//! the most recently issued request is allowed to commit.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::favorites::{FavoriteBridge, FavoriteRoute};
use crate::gateway::PhotoGateway;
use crate::wallpaper::{append_unique, dedupe_by_id, WallpaperItem};

pub const GENERATED_CATEGORY: &str = "AI Generated";
const GENERATED_TITLE_LEN: usize = 20;

/// What a self-managed collection lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Random,
    Category(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Initial,
    Refresh,
    LoadMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading(RequestKind),
    Ready,
    /// `retry` names the request [`WallpaperCollection::retry`] re-issues.
    Error { message: String, retry: RequestKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub initial: u32,
    pub more: u32,
}

impl PageSizes {
    pub const HOME: PageSizes = PageSizes { initial: 20, more: 10 };
    pub const CATEGORY: PageSizes = PageSizes { initial: 20, more: 20 };
}

/// A fetch issued by a collection, runnable against any gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    seq: u64,
    pub kind: RequestKind,
    pub source: Source,
    pub page: u32,
    pub count: u32,
}

impl PageRequest {
    pub fn execute(&self, gateway: &dyn PhotoGateway) -> Vec<WallpaperItem> {
        match &self.source {
            Source::Random => gateway.random_photos(self.count as usize),
            Source::Category(category) => gateway.photos_by_category(category, self.page, self.count),
        }
    }
}

pub struct WallpaperCollection {
    gateway: Arc<dyn PhotoGateway>,
    source: Option<Source>,
    sizes: PageSizes,
    items: Vec<WallpaperItem>,
    favorites: HashMap<String, bool>,
    state: LoadState,
    bridge: FavoriteBridge,
    last_issued: u64,
    page: u32,
    active: bool,
}

impl WallpaperCollection {
    /// Self-managed collection; nothing is fetched until [`load`](Self::load).
    pub fn new(gateway: Arc<dyn PhotoGateway>, source: Source, sizes: PageSizes) -> Self {
        Self {
            gateway,
            source: Some(source),
            sizes,
            items: Vec::new(),
            favorites: HashMap::new(),
            state: LoadState::Idle,
            bridge: FavoriteBridge::local(),
            last_issued: 0,
            page: 0,
            active: true,
        }
    }

    /// Parent-managed collection over `items`.
    pub fn provided(gateway: Arc<dyn PhotoGateway>, items: Vec<WallpaperItem>) -> Self {
        let mut collection = Self::new(gateway, Source::Random, PageSizes::HOME);
        collection.source = None;
        collection.set_wallpapers(items);
        collection
    }

    /// Seeds ids already saved as favorites; fetched items with these ids
    /// come in marked.
    pub fn with_favorites<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.favorites.insert(id.into(), true);
        }
        self
    }

    pub fn with_favorite_handler(mut self, handler: impl FnMut(&str) + Send + 'static) -> Self {
        self.bridge = FavoriteBridge::external(handler);
        self
    }

    pub fn items(&self) -> &[WallpaperItem] {
        &self.items
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn is_parent_managed(&self) -> bool {
        self.source.is_none()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.get(id).copied().unwrap_or(false)
    }

    pub fn find(&self, id: &str) -> Option<&WallpaperItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Replaces the list with a parent-supplied one, which becomes authoritative.
    pub fn set_wallpapers(&mut self, items: Vec<WallpaperItem>) {
        self.items = dedupe_by_id(items);
        self.favorites = self
            .items
            .iter()
            .map(|item| (item.id.clone(), item.is_favorite))
            .collect();
        self.source = None;
        self.state = LoadState::Ready;
        // in-flight fetches from a previous mode must not land
        self.last_issued += 1;
    }

    /// Marks the owning screen as gone; later commits are dropped.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Issues a fetch and moves to `Loading`. `None` for parent-managed or
    /// inactive collections.
    pub fn begin(&mut self, kind: RequestKind) -> Option<PageRequest> {
        if !self.active {
            return None;
        }
        let source = self.source.clone()?;
        let (page, count) = match kind {
            RequestKind::LoadMore => (self.page + 1, self.sizes.more),
            RequestKind::Initial | RequestKind::Refresh => (1, self.sizes.initial),
        };
        self.last_issued += 1;
        self.state = LoadState::Loading(kind);
        debug!("Issued {:?} request #{} for {:?} page {}", kind, self.last_issued, source, page);
        Some(PageRequest { seq: self.last_issued, kind, source, page, count })
    }

    /// Applies the result of `request`. Returns false when the response was
    /// stale (a newer request was issued) or the collection is inactive.
    pub fn commit(&mut self, request: &PageRequest, fetched: Vec<WallpaperItem>) -> bool {
        if !self.active || request.seq != self.last_issued {
            debug!(
                "Discarding stale {:?} response #{} (latest #{})",
                request.kind, request.seq, self.last_issued
            );
            return false;
        }

        let fetched = dedupe_by_id(fetched);
        match request.kind {
            RequestKind::Initial | RequestKind::Refresh if fetched.is_empty() => {
                let message = self.empty_message(request.kind);
                warn!("{}", message);
                self.state = LoadState::Error { message, retry: request.kind };
            }
            RequestKind::Initial | RequestKind::Refresh => {
                self.items = self.merge_favorites(fetched);
                for item in &self.items {
                    self.favorites.insert(item.id.clone(), item.is_favorite);
                }
                self.page = request.page;
                self.state = LoadState::Ready;
                info!("Loaded {} wallpapers", self.items.len());
            }
            RequestKind::LoadMore => {
                let page = self.merge_favorites(fetched);
                let added = append_unique(&mut self.items, page);
                for item in &self.items[self.items.len() - added..] {
                    self.favorites.insert(item.id.clone(), item.is_favorite);
                }
                self.page = request.page;
                self.state = LoadState::Ready;
                info!("Appended {} wallpapers (page {})", added, self.page);
            }
        }
        true
    }

    /// Runs `kind` against the collection's own gateway.
    pub fn run(&mut self, kind: RequestKind) -> bool {
        let Some(request) = self.begin(kind) else {
            return false;
        };
        let fetched = request.execute(self.gateway.as_ref());
        self.commit(&request, fetched)
    }

    pub fn load(&mut self) -> bool {
        self.run(RequestKind::Initial)
    }

    pub fn refresh(&mut self) -> bool {
        self.run(RequestKind::Refresh)
    }

    pub fn load_more(&mut self) -> bool {
        self.run(RequestKind::LoadMore)
    }

    /// Re-issues the request that failed. No-op unless in `Error`.
    pub fn retry(&mut self) -> bool {
        let LoadState::Error { retry, .. } = self.state.clone() else {
            return false;
        };
        self.run(retry)
    }

    /// Delivers a toggle to the external handler, or flips it locally.
    /// Returns `None` for local toggles of ids not in the list.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<FavoriteRoute> {
        let position = self.items.iter().position(|item| item.id == id);
        if position.is_none() && !self.bridge.is_external() {
            return None;
        }

        let items = &mut self.items;
        let favorites = &mut self.favorites;
        let route = self.bridge.route(id, |id| {
            if let Some(position) = position {
                let now = !favorites.get(id).copied().unwrap_or(false);
                favorites.insert(id.to_string(), now);
                items[position].is_favorite = now;
            }
        });
        Some(route)
    }

    /// Searches with `prompt` and puts the first hit at the top of the list,
    /// retitled after the prompt. Returns the new item.
    pub fn generate_from_prompt(&mut self, prompt: &str) -> Option<WallpaperItem> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        let first = self.gateway.search_photos(prompt, 1, 20).results.into_iter().next()?;
        let generated = WallpaperItem {
            title: truncate_title(prompt),
            category: Some(GENERATED_CATEGORY.to_string()),
            is_favorite: self.is_favorite(&first.id),
            ..first
        };

        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.push(generated.clone());
        items.append(&mut self.items);
        self.items = dedupe_by_id(items);
        self.favorites.insert(generated.id.clone(), generated.is_favorite);
        // a fetch still in flight would replace the list and drop the new item
        self.last_issued += 1;
        if matches!(self.state, LoadState::Loading(_)) {
            self.state = LoadState::Ready;
        }
        info!("Generated wallpaper {} from prompt", generated.id);
        Some(generated)
    }

    // Local favorite flips survive a reload of the same ids.
    fn merge_favorites(&self, items: Vec<WallpaperItem>) -> Vec<WallpaperItem> {
        items
            .into_iter()
            .map(|item| match self.favorites.get(&item.id) {
                Some(&is_favorite) => WallpaperItem { is_favorite, ..item },
                None => item,
            })
            .collect()
    }

    fn empty_message(&self, kind: RequestKind) -> String {
        match (kind, &self.source) {
            (RequestKind::Refresh, _) => "Failed to refresh. Please try again later.".to_string(),
            (_, Some(Source::Category(category))) => {
                format!("No wallpapers found in {}. Pull down to try again.", category)
            }
            _ => "Failed to load wallpapers. Pull down to try again.".to_string(),
        }
    }
}

fn truncate_title(prompt: &str) -> String {
    if prompt.chars().count() > GENERATED_TITLE_LEN {
        let head: String = prompt.chars().take(GENERATED_TITLE_LEN).collect();
        format!("{}...", head)
    } else {
        prompt.to_string()
    }
}

impl std::fmt::Debug for WallpaperCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallpaperCollection")
            .field("source", &self.source)
            .field("items", &self.items.len())
            .field("state", &self.state)
            .field("page", &self.page)
            .field("bridge", &self.bridge)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SearchPage;
    use crate::wallpaper::item;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves queued pages to listing calls, in order; empty once drained.
    #[derive(Default)]
    struct QueuedGateway {
        pages: Mutex<VecDeque<Vec<WallpaperItem>>>,
        search: Vec<WallpaperItem>,
        calls: Mutex<Vec<String>>,
    }

    impl QueuedGateway {
        fn with_pages(pages: Vec<Vec<WallpaperItem>>) -> Arc<Self> {
            Arc::new(Self { pages: Mutex::new(pages.into()), ..Default::default() })
        }

        fn next_page(&self, call: String) -> Vec<WallpaperItem> {
            self.calls.lock().unwrap().push(call);
            self.pages.lock().unwrap().pop_front().unwrap_or_default()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PhotoGateway for QueuedGateway {
        fn random_photos(&self, count: usize) -> Vec<WallpaperItem> {
            self.next_page(format!("random {}", count))
        }

        fn search_photos(&self, query: &str, _page: u32, _per_page: u32) -> SearchPage {
            self.calls.lock().unwrap().push(format!("search {}", query));
            SearchPage { results: self.search.clone(), total: self.search.len() }
        }

        fn photos_by_category(&self, category: &str, page: u32, per_page: u32) -> Vec<WallpaperItem> {
            self.next_page(format!("category {} {} {}", category, page, per_page))
        }

        fn photo_by_id(&self, id: &str) -> WallpaperItem {
            item(id)
        }
    }

    fn items(ids: &[&str]) -> Vec<WallpaperItem> {
        ids.iter().map(|id| item(id)).collect()
    }

    fn ids(collection: &WallpaperCollection) -> Vec<&str> {
        collection.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn starts_idle_and_loads_deduplicated() {
        let gateway = QueuedGateway::with_pages(vec![items(&["a", "b", "a", "c"])]);
        let mut collection = WallpaperCollection::new(gateway.clone(), Source::Random, PageSizes::HOME);
        assert_eq!(collection.state(), &LoadState::Idle);

        assert!(collection.load());
        assert_eq!(collection.state(), &LoadState::Ready);
        assert_eq!(ids(&collection), ["a", "b", "c"]);
        assert_eq!(gateway.calls(), ["random 20"]);
    }

    #[test]
    fn provided_list_is_deduplicated_and_never_fetched() {
        let gateway = QueuedGateway::with_pages(vec![items(&["z"])]);
        let mut first_b = item("b");
        first_b.is_favorite = true;
        let list = vec![item("a"), first_b, item("b"), item("a")];
        let mut collection = WallpaperCollection::provided(gateway.clone(), list);

        assert!(collection.is_parent_managed());
        assert_eq!(ids(&collection), ["a", "b"]);
        assert!(collection.is_favorite("b"));
        assert!(!collection.is_favorite("a"));

        assert!(!collection.load());
        assert!(!collection.load_more());
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn local_toggle_twice_restores_and_leaves_others_alone() {
        let gateway = QueuedGateway::with_pages(vec![]);
        let mut list = items(&["a", "b", "c"]);
        list[2].is_favorite = true;
        let mut collection = WallpaperCollection::provided(gateway, list);

        assert_eq!(collection.toggle_favorite("a"), Some(FavoriteRoute::Local));
        assert!(collection.is_favorite("a"));
        assert!(collection.find("a").unwrap().is_favorite);

        collection.toggle_favorite("a");
        assert!(!collection.is_favorite("a"));
        assert!(!collection.find("a").unwrap().is_favorite);
        assert!(!collection.find("b").unwrap().is_favorite);
        assert!(collection.find("c").unwrap().is_favorite);

        for item in collection.items() {
            assert_eq!(item.is_favorite, collection.is_favorite(&item.id));
        }
    }

    #[test]
    fn toggle_of_unknown_id_is_ignored_locally() {
        let gateway = QueuedGateway::with_pages(vec![]);
        let mut collection = WallpaperCollection::provided(gateway, items(&["a"]));
        assert_eq!(collection.toggle_favorite("nope"), None);
        assert!(!collection.is_favorite("nope"));
    }

    #[test]
    fn external_handler_owns_the_toggle() {
        let gateway = QueuedGateway::with_pages(vec![]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut collection = WallpaperCollection::provided(gateway, items(&["a", "b"]))
            .with_favorite_handler(move |id| sink.lock().unwrap().push(id.to_string()));

        assert_eq!(collection.toggle_favorite("a"), Some(FavoriteRoute::External));
        assert!(!collection.is_favorite("a"));
        assert!(!collection.find("a").unwrap().is_favorite);
        assert_eq!(*seen.lock().unwrap(), ["a"]);

        let mut updated = items(&["a", "b"]);
        updated[0].is_favorite = true;
        collection.set_wallpapers(updated);
        assert!(collection.is_favorite("a"));
    }

    #[test]
    fn load_more_appends_only_new_ids() {
        let gateway = QueuedGateway::with_pages(vec![items(&["a", "b", "c"]), items(&["b", "d", "c", "e"])]);
        let mut collection = WallpaperCollection::new(gateway.clone(), Source::Random, PageSizes::HOME);
        collection.load();
        collection.toggle_favorite("b");

        assert!(collection.load_more());
        assert_eq!(collection.items().len(), 3 + 2);
        assert_eq!(ids(&collection), ["a", "b", "c", "d", "e"]);
        assert!(collection.is_favorite("b"));
        assert_eq!(collection.page(), 2);
        assert_eq!(gateway.calls(), ["random 20", "random 10"]);
    }

    #[test]
    fn category_pages_advance() {
        let gateway = QueuedGateway::with_pages(vec![items(&["n1"]), items(&["n2"])]);
        let mut collection = WallpaperCollection::new(
            gateway.clone(),
            Source::Category("Nature".to_string()),
            PageSizes::CATEGORY,
        );
        collection.load();
        collection.load_more();
        assert_eq!(gateway.calls(), ["category Nature 1 20", "category Nature 2 20"]);
    }

    #[test]
    fn refresh_replaces_list_but_keeps_local_flips() {
        let gateway = QueuedGateway::with_pages(vec![items(&["a", "b"]), items(&["b", "x"])]);
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);
        collection.load();
        collection.toggle_favorite("b");

        assert!(collection.refresh());
        assert_eq!(ids(&collection), ["b", "x"]);
        assert!(collection.find("b").unwrap().is_favorite);
        assert!(!collection.is_favorite("x"));
    }

    #[test]
    fn failed_refresh_keeps_content_and_offers_retry() {
        let gateway = QueuedGateway::with_pages(vec![items(&["a", "b"]), vec![], items(&["c"])]);
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);
        collection.load();

        collection.refresh();
        assert_eq!(ids(&collection), ["a", "b"]);
        assert_eq!(
            collection.state(),
            &LoadState::Error {
                message: "Failed to refresh. Please try again later.".to_string(),
                retry: RequestKind::Refresh,
            }
        );

        assert!(collection.retry());
        assert_eq!(collection.state(), &LoadState::Ready);
        assert_eq!(ids(&collection), ["c"]);
        assert!(!collection.retry());
    }

    #[test]
    fn empty_category_surfaces_error() {
        let gateway = QueuedGateway::with_pages(vec![vec![]]);
        let mut collection = WallpaperCollection::new(
            gateway,
            Source::Category("Unknown".to_string()),
            PageSizes::CATEGORY,
        );
        collection.load();
        assert!(collection.items().is_empty());
        assert_eq!(collection.error(), Some("No wallpapers found in Unknown. Pull down to try again."));
        assert!(matches!(collection.state(), LoadState::Error { retry: RequestKind::Initial, .. }));
    }

    #[test]
    fn only_the_latest_request_commits() {
        let gateway = QueuedGateway::with_pages(vec![]);
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);

        let initial = collection.begin(RequestKind::Initial).unwrap();
        let refresh = collection.begin(RequestKind::Refresh).unwrap();
        assert_eq!(collection.state(), &LoadState::Loading(RequestKind::Refresh));

        assert!(collection.commit(&refresh, items(&["fresh"])));
        assert!(!collection.commit(&initial, items(&["stale"])));
        assert_eq!(ids(&collection), ["fresh"]);
        assert_eq!(collection.state(), &LoadState::Ready);
    }

    #[test]
    fn deactivated_collection_drops_responses() {
        let gateway = QueuedGateway::with_pages(vec![]);
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);
        let request = collection.begin(RequestKind::Initial).unwrap();
        collection.deactivate();
        assert!(!collection.commit(&request, items(&["a"])));
        assert!(collection.items().is_empty());
        assert!(collection.begin(RequestKind::Refresh).is_none());
    }

    #[test]
    fn switching_to_provided_list_invalidates_in_flight_fetch() {
        let gateway = QueuedGateway::with_pages(vec![]);
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);
        let request = collection.begin(RequestKind::Initial).unwrap();
        collection.set_wallpapers(items(&["parent"]));
        assert!(!collection.commit(&request, items(&["fetched"])));
        assert_eq!(ids(&collection), ["parent"]);
    }

    #[test]
    fn generated_wallpaper_goes_first() {
        let gateway = Arc::new(QueuedGateway {
            pages: Mutex::new(VecDeque::from(vec![items(&["a", "s1"])])),
            search: items(&["s1", "s2"]),
            ..Default::default()
        });
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);
        collection.load();

        let generated = collection
            .generate_from_prompt("a calm sunset over the northern sea")
            .unwrap();
        assert_eq!(generated.title, "a calm sunset over t...");
        assert_eq!(generated.category.as_deref(), Some(GENERATED_CATEGORY));
        assert_eq!(ids(&collection), ["s1", "a"]);
        assert_eq!(collection.items()[0].title, "a calm sunset over t...");

        assert!(collection.generate_from_prompt("   ").is_none());
    }

    #[test]
    fn generated_wallpaper_survives_a_refresh_in_flight() {
        let gateway = Arc::new(QueuedGateway {
            pages: Mutex::new(VecDeque::from(vec![items(&["a"])])),
            search: items(&["s1"]),
            ..Default::default()
        });
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME);
        collection.load();

        let refresh = collection.begin(RequestKind::Refresh).unwrap();
        collection.generate_from_prompt("aurora").unwrap();
        assert_eq!(collection.state(), &LoadState::Ready);

        assert!(!collection.commit(&refresh, items(&["b"])));
        assert_eq!(ids(&collection), ["s1", "a"]);
        assert!(collection.refresh());
    }

    #[test]
    fn saved_favorites_mark_fetched_items() {
        let gateway = QueuedGateway::with_pages(vec![items(&["a", "b"]), items(&["c", "b"])]);
        let mut collection = WallpaperCollection::new(gateway, Source::Random, PageSizes::HOME)
            .with_favorites(["b", "c"]);
        collection.load();
        assert!(collection.find("b").unwrap().is_favorite);
        assert!(!collection.find("a").unwrap().is_favorite);

        collection.load_more();
        assert!(collection.find("c").unwrap().is_favorite);

        // one toggle clears a saved favorite
        collection.toggle_favorite("b");
        assert!(!collection.is_favorite("b"));
        assert!(!collection.find("b").unwrap().is_favorite);
    }

    #[test]
    fn short_prompts_are_not_truncated() {
        assert_eq!(truncate_title("neon city"), "neon city");
        assert_eq!(truncate_title("exactly twenty chars"), "exactly twenty chars");
    }
}
