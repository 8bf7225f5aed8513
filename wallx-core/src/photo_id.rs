use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const SEARCH_PREFIX: &str = "search-";
const PLACEHOLDER_PREFIX: &str = "photo-";

fn category_fallback_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([a-z]+)-(\d+)$").ok()).as_ref()
}

/// Structured form of a wallpaper id.
///
/// The string representation is what travels through routes and lists;
/// `parse` and `Display` convert between the two without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhotoId {
    /// Provider-issued id.
    Native(String),
    /// `search-<slug>[-<n>]`, synthesized for search fallbacks.
    Search { slug: String, index: Option<u64> },
    /// `<category>-<n>`, an entry of the static category table.
    CategoryFallback { category: String, index: u64 },
    /// `photo-<n>`, a position in the random fallback set.
    Placeholder { index: u64 },
}

impl PhotoId {
    pub fn parse(id: &str) -> Self {
        if let Some(rest) = id.strip_prefix(SEARCH_PREFIX) {
            return match rest.rsplit_once('-') {
                Some((slug, n)) if !slug.is_empty() => match parse_index(n) {
                    Some(index) => PhotoId::Search { slug: slug.to_string(), index: Some(index) },
                    None => PhotoId::Search { slug: rest.to_string(), index: None },
                },
                _ => PhotoId::Search { slug: rest.to_string(), index: None },
            };
        }

        if let Some(index) = id.strip_prefix(PLACEHOLDER_PREFIX).and_then(parse_index) {
            return PhotoId::Placeholder { index };
        }

        if let Some(caps) = category_fallback_pattern().and_then(|pattern| pattern.captures(id)) {
            if let Some(index) = parse_index(&caps[2]) {
                return PhotoId::CategoryFallback { category: caps[1].to_string(), index };
            }
        }

        PhotoId::Native(id.to_string())
    }

    pub fn search(query: &str, index: u64) -> Self {
        PhotoId::Search { slug: slugify(query), index: Some(index) }
    }

    pub fn category_fallback(category: &str, index: u64) -> Self {
        PhotoId::CategoryFallback { category: category.to_lowercase(), index }
    }

    /// Query text recovered from a search id ("nature-sky" -> "nature sky").
    pub fn search_query(&self) -> Option<String> {
        match self {
            PhotoId::Search { slug, .. } => Some(slug.replace('-', " ")),
            _ => None,
        }
    }

    /// Label shown for a search id: the query with its first letter upper-cased.
    pub fn search_label(&self) -> Option<String> {
        self.search_query().map(|query| capitalize(&query))
    }

    /// Leading word of a search id's slug ("nature-sky" -> "nature").
    pub fn search_token(&self) -> Option<&str> {
        match self {
            PhotoId::Search { slug, .. } => slug.split('-').next(),
            _ => None,
        }
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoId::Native(id) => f.write_str(id),
            PhotoId::Search { slug, index: Some(n) } => write!(f, "{}{}-{}", SEARCH_PREFIX, slug, n),
            PhotoId::Search { slug, index: None } => write!(f, "{}{}", SEARCH_PREFIX, slug),
            PhotoId::CategoryFallback { category, index } => write!(f, "{}-{}", category, index),
            PhotoId::Placeholder { index } => write!(f, "{}{}", PLACEHOLDER_PREFIX, index),
        }
    }
}

impl From<&str> for PhotoId {
    fn from(id: &str) -> Self {
        PhotoId::parse(id)
    }
}

// Canonical decimal only, so the id prints back unchanged.
fn parse_index(n: &str) -> Option<u64> {
    let canonical = !n.is_empty()
        && n.bytes().all(|b| b.is_ascii_digit())
        && (n == "0" || !n.starts_with('0'));
    if canonical {
        n.parse().ok()
    } else {
        None
    }
}

/// Lowercases and turns each run of whitespace into one hyphen.
pub fn slugify(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
