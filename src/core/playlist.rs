use crate::core::driver::VideoSource;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""videoId":"([0-9A-Za-z_-]{11})""#).unwrap());
static CONTINUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""continuationCommand":\{"token":"([^"]+)""#).unwrap());
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":"([^"]+)""#).unwrap());
static CLIENT_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_(?:CONTEXT_)?CLIENT_VERSION":"([^"]+)""#).unwrap()
});

const MAX_PLAYLIST_ID_LEN: usize = 64;
/// Each continuation page holds about 100 videos.
const MAX_CONTINUATION_PAGES: usize = 200;
const FALLBACK_CLIENT_VERSION: &str = "2.20240101.00.00";

#[derive(Clone, Default)]
pub struct PlaylistService {
    client: reqwest::Client,
}

impl PlaylistService {
    const PLAYLIST_URL: &str = "https://www.youtube.com/playlist";
    const WATCH_URL: &str = "https://www.youtube.com/watch";
    const BROWSE_URL: &str = "https://www.youtube.com/youtubei/v1/browse";

    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_video_urls(&self, playlist_url: &str) -> Result<Vec<String>> {
        let playlist_id = extract_playlist_id(playlist_url)?;

        let html = self
            .client
            .get(format!("{}?list={playlist_id}", Self::PLAYLIST_URL))
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut ids = VideoIds::default();
        ids.extend_from(&html);

        let innertube = InnertubeConfig::from_page(&html);
        let mut token = continuation_token(&html);
        let mut pages = 0;

        while let Some(current) = token.take() {
            if pages == MAX_CONTINUATION_PAGES {
                tracing::warn!(%playlist_id, count = ids.len(), "Playlist page limit reached, list is truncated");
                break;
            }
            pages += 1;

            let page = match self.fetch_continuation(&innertube, &current).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(%playlist_id, count = ids.len(), error = %e, "Failed to load more playlist videos, list is truncated");
                    break;
                }
            };

            if ids.extend_from(&page) == 0 {
                break;
            }
            token = continuation_token(&page).filter(|next| *next != current);
        }

        let urls: Vec<String> = ids
            .into_vec()
            .into_iter()
            .map(|id| format!("{}?v={id}", Self::WATCH_URL))
            .collect();
        tracing::info!(%playlist_id, count = urls.len(), pages = pages + 1, "Found playlist videos");

        Ok(urls)
    }

    async fn fetch_continuation(&self, innertube: &InnertubeConfig, token: &str) -> Result<String> {
        let url = match &innertube.api_key {
            Some(key) => format!("{}?key={key}", Self::BROWSE_URL),
            None => Self::BROWSE_URL.to_string(),
        };
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "WEB",
                    "clientVersion": innertube.client_version,
                    "hl": "en",
                }
            },
            "continuation": token,
        });

        let page = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(page)
    }
}

impl VideoSource for PlaylistService {
    /// Watch URLs of every video in the playlist, in playlist order.
    ///
    /// Failures are logged and produce an empty list.
    #[tracing::instrument(skip(self))]
    async fn video_urls(&self, playlist_url: &str) -> Vec<String> {
        match self.fetch_video_urls(playlist_url).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching playlist");
                Vec::new()
            }
        }
    }
}

/// Client settings the playlist page hands to its own browse requests.
#[derive(Debug, Clone, PartialEq)]
pub struct InnertubeConfig {
    pub api_key: Option<String>,
    pub client_version: String,
}

impl InnertubeConfig {
    pub fn from_page(html: &str) -> Self {
        let capture = |re: &Regex| {
            re.captures(html)
                .and_then(|cap| cap.get(1))
                .map(|m| m.as_str().to_string())
        };

        Self {
            api_key: capture(&API_KEY_RE),
            client_version: capture(&CLIENT_VERSION_RE)
                .unwrap_or_else(|| FALLBACK_CLIENT_VERSION.to_string()),
        }
    }
}

/// Ordered, de-duplicated ids collected across pages.
#[derive(Default)]
struct VideoIds {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl VideoIds {
    /// Returns how many new ids the page contributed.
    fn extend_from(&mut self, page: &str) -> usize {
        let before = self.ordered.len();
        for cap in VIDEO_ID_RE.captures_iter(page) {
            if let Some(m) = cap.get(1) {
                if self.seen.insert(m.as_str().to_string()) {
                    self.ordered.push(m.as_str().to_string());
                }
            }
        }
        self.ordered.len() - before
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Reads the `list=` parameter, or accepts a bare playlist id.
pub fn extract_playlist_id(url: &str) -> Result<String> {
    let raw = match url.split("list=").nth(1) {
        Some(rest) => rest.split(['&', '#']).next().unwrap_or(rest),
        None if !url.contains('/') => url,
        None => return Err(Error::custom("Playlist URL has no list= parameter")),
    };

    validate_playlist_id(raw.trim())
}

/// Playlist ids are URL-safe base64 (`PL...`, `UU...`, `OLAK5uy_...`).
fn validate_playlist_id(id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(Error::custom("Playlist id is empty"));
    }
    if id.len() > MAX_PLAYLIST_ID_LEN {
        return Err(Error::custom(format!(
            "Playlist id is longer than {MAX_PLAYLIST_ID_LEN} characters"
        )));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
    {
        return Err(Error::custom(format!("Playlist id contains '{bad}'")));
    }

    Ok(id.to_string())
}

/// Unique video ids in page order.
pub fn scrape_video_ids(html: &str) -> Vec<String> {
    let mut ids = VideoIds::default();
    ids.extend_from(html);
    ids.into_vec()
}

/// Token for the next batch of playlist entries, if the page has more.
pub fn continuation_token(page: &str) -> Option<String> {
    CONTINUATION_RE
        .captures_iter(page)
        .last()
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
