use crate::core::driver::MetadataSource;
use crate::core::transcript::extract_video_id;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""title":"([^"]+)""#).unwrap());
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""description":\{"simpleText":"([^"]+)""#).unwrap());

const UNKNOWN_TITLE: &str = "Unknown Title";
const NO_DESCRIPTION: &str = "No description available";
const WATCH_URL: &str = "https://youtube.com/watch";

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Default)]
pub struct MetadataService {
    client: reqwest::Client,
}

impl MetadataService {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl MetadataSource for MetadataService {
    /// Loads the watch page and reads the title and description out of it.
    #[tracing::instrument(skip(self))]
    async fn fetch_metadata(&self, video_url: &str) -> Result<VideoMetadata> {
        let video_id =
            extract_video_id(video_url).ok_or_else(|| Error::custom("Invalid YouTube URL"))?;

        let html = self
            .client
            .get(format!("{WATCH_URL}?v={video_id}"))
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_watch_page(&html))
    }
}

pub fn parse_watch_page(html: &str) -> VideoMetadata {
    let capture = |re: &Regex| {
        re.captures(html)
            .and_then(|cap| cap.get(1))
            .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
    };

    VideoMetadata {
        title: capture(&TITLE_RE).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        description: capture(&DESCRIPTION_RE).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_title_and_description() {
        let html = r#"<script>var ytInitialPlayerResponse = {"videoDetails":{"title":"Ep 3 &amp; Finale","lengthSeconds":"2400"},"microformat":{"description":{"simpleText":"The end of season one"}}};</script>"#;
        let meta = parse_watch_page(html);
        assert_eq!(meta.title, "Ep 3 & Finale");
        assert_eq!(meta.description, "The end of season one");
    }

    #[test]
    fn falls_back_when_fields_missing() {
        let meta = parse_watch_page("<html><body>nothing here</body></html>");
        assert_eq!(meta.title, UNKNOWN_TITLE);
        assert_eq!(meta.description, NO_DESCRIPTION);
    }
}
