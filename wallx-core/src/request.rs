use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub const UNSPLASH_API_URL: &str = "https://api.unsplash.com";

/// Failures of the photo transport. The gateway absorbs all of them.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unsplash API error: {status}")]
    Network { status: u16 },
    #[error("transport error: {0}")]
    Transport(#[from] attohttpc::Error),
    #[error("no photo found for id {0}")]
    NotFound(String),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no API key configured")]
    MissingKey,
    #[error("invalid photo id {0:?}")]
    InvalidId(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoUrls {
    pub raw: String,
    pub full: String,
    pub regular: String,
    pub small: String,
    pub thumb: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhotoUser {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnsplashPhoto {
    pub id: String,
    pub urls: PhotoUrls,
    #[serde(default)]
    pub alt_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user: PhotoUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub results: Vec<UnsplashPhoto>,
}

/// Raw access to the remote photo service.
pub trait PhotoApi: Send + Sync {
    fn random(&self, count: usize, cache_buster: i64) -> Result<Vec<UnsplashPhoto>, GatewayError>;
    fn search(&self, query: &str, page: u32, per_page: u32) -> Result<SearchResponse, GatewayError>;
    fn photo(&self, id: &str) -> Result<UnsplashPhoto, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct UnsplashApi {
    base_url: String,
    access_key: Option<String>,
    timeout: Duration,
}

impl UnsplashApi {
    pub fn new(base_url: impl Into<String>, access_key: Option<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, access_key, timeout }
    }

    fn get(&self, path: &str) -> Result<attohttpc::RequestBuilder, GatewayError> {
        let key = self.access_key.as_deref().ok_or(GatewayError::MissingKey)?;
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        Ok(attohttpc::get(url)
            .header("Authorization", format!("Client-ID {}", key))
            .header("Accept-Version", "v1")
            .timeout(self.timeout))
    }
}

fn read_body(response: attohttpc::Response) -> Result<String, GatewayError> {
    if !response.is_success() {
        return Err(GatewayError::Network { status: response.status().as_u16() });
    }
    Ok(response.text()?)
}

impl PhotoApi for UnsplashApi {
    fn random(&self, count: usize, cache_buster: i64) -> Result<Vec<UnsplashPhoto>, GatewayError> {
        let response = self.get("/photos/random")?
            .param("count", count)
            .param("_t", cache_buster)
            .send()?;
        let text = read_body(response)?;
        let photos: Vec<UnsplashPhoto> = serde_json::from_str(&text)?;
        Ok(unique_photos(photos))
    }

    fn search(&self, query: &str, page: u32, per_page: u32) -> Result<SearchResponse, GatewayError> {
        let response = self.get("/search/photos")?
            .param("query", query)
            .param("page", page)
            .param("per_page", per_page)
            .send()?;
        let text = read_body(response)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn photo(&self, id: &str) -> Result<UnsplashPhoto, GatewayError> {
        if !is_path_safe(id) {
            return Err(GatewayError::InvalidId(id.to_string()));
        }
        let response = self.get(&format!("/photos/{}", id))?.send()?;
        if response.status().as_u16() == 404 {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        let text = read_body(response)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// Provider ids are URL-safe tokens; anything else could leave `/photos/`.
fn is_path_safe(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Drops repeated provider ids, keeping the first occurrence.
pub fn unique_photos(photos: Vec<UnsplashPhoto>) -> Vec<UnsplashPhoto> {
    let mut seen = HashSet::new();
    photos
        .into_iter()
        .filter(|photo| seen.insert(photo.id.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_photo(id: &str) -> UnsplashPhoto {
    UnsplashPhoto {
        id: id.to_string(),
        urls: PhotoUrls {
            raw: format!("https://images.example/{id}?raw"),
            full: format!("https://images.example/{id}?full"),
            regular: format!("https://images.example/{id}?regular"),
            small: format!("https://images.example/{id}?small"),
            thumb: format!("https://images.example/{id}?thumb"),
        },
        alt_description: None,
        description: None,
        user: PhotoUser { name: "Jane Doe".to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_record_with_missing_descriptions() {
        let json = r#"{
            "id": "abc123",
            "urls": {"raw": "r", "full": "f", "regular": "g", "small": "s", "thumb": "t"},
            "alt_description": null,
            "user": {"name": "Ansel"}
        }"#;
        let photo: UnsplashPhoto = serde_json::from_str(json).unwrap();
        assert_eq!(photo.id, "abc123");
        assert_eq!(photo.alt_description, None);
        assert_eq!(photo.description, None);
        assert_eq!(photo.user.name, "Ansel");
    }

    #[test]
    fn parses_search_envelope() {
        let json = r#"{"total": 120, "total_pages": 6, "results": []}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total, 120);
        assert!(response.results.is_empty());
    }

    #[test]
    fn unique_photos_keeps_first_occurrence() {
        let mut second_a = sample_photo("a");
        second_a.description = Some("later".to_string());
        let photos = vec![sample_photo("a"), sample_photo("b"), second_a];
        let unique = unique_photos(photos);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].id, "a");
        assert_eq!(unique[0].description, None);
        assert_eq!(unique[1].id, "b");
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let api = UnsplashApi::new(UNSPLASH_API_URL, None, Duration::from_secs(1));
        assert!(matches!(api.random(3, 0), Err(GatewayError::MissingKey)));
        assert!(matches!(api.photo("x"), Err(GatewayError::MissingKey)));
    }

    #[test]
    fn photo_ids_cannot_escape_the_photos_path() {
        let api = UnsplashApi::new("http://127.0.0.1:1", Some("key".to_string()), Duration::from_secs(2));
        for id in ["../search/photos", "a/b", "x?query=y", "%2e%2e", ""] {
            assert!(matches!(api.photo(id), Err(GatewayError::InvalidId(_))), "accepted {id:?}");
        }
        assert!(matches!(api.photo("Dwu85P9SOIk"), Err(GatewayError::Transport(_))));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let api = UnsplashApi::new("http://127.0.0.1:1", Some("key".to_string()), Duration::from_secs(2));
        assert!(matches!(api.search("sky", 1, 5), Err(GatewayError::Transport(_))));
    }
}
