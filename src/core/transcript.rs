use crate::core::chunking::{TokenCounter, Tokenizer};
use crate::core::driver::TranscriptSource;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use yt_transcript_rs::api::YouTubeTranscriptApi;

static VIDEO_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11}).*").unwrap(),
        Regex::new(r"(?:embed/)([0-9A-Za-z_-]{11})").unwrap(),
        Regex::new(r"(?:youtu\.be/)([0-9A-Za-z_-]{11})").unwrap(),
    ]
});

/// Full transcript text plus its token count.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFetch {
    pub text: String,
    pub token_count: usize,
}

impl TranscriptFetch {
    pub fn is_usable(&self) -> bool {
        self.token_count > 0 && !self.text.starts_with("Error")
    }
}

#[derive(Clone)]
pub struct TranscriptService {
    api: YouTubeTranscriptApi,
    client: reqwest::Client,
    tokenizer: Tokenizer,
    languages: Vec<String>,
}

impl TranscriptService {
    /// An empty `languages` list accepts a transcript in any language.
    pub fn new(client: reqwest::Client, tokenizer: Tokenizer, languages: Vec<String>) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::custom(format!("Failed to create transcript client: {e}")))?;
        Ok(Self {
            api,
            client,
            tokenizer,
            languages,
        })
    }
}

impl TranscriptSource for TranscriptService {
    #[tracing::instrument(skip(self))]
    async fn fetch_transcript(&self, video_url: &str) -> Result<TranscriptFetch> {
        let video_id =
            extract_video_id(video_url).ok_or_else(|| Error::custom("Invalid YouTube URL"))?;

        let list = self
            .api
            .list_transcripts(&video_id)
            .await
            .map_err(|e| Error::custom(format!("Failed to list transcripts: {e}")))?;

        // The list is backed by hash maps; sort for a stable pick.
        let mut available: Vec<_> = list.transcripts().collect();
        available.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        let tracks: Vec<CaptionTrack> = available
            .iter()
            .map(|t| CaptionTrack {
                language_code: t.language_code.clone(),
                is_generated: t.is_generated,
            })
            .collect();

        let chosen = pick_track(&tracks, &self.languages)
            .map(|idx| available[idx])
            .ok_or_else(|| Error::custom("No transcript available"))?;

        let transcript = chosen
            .fetch(&self.client, false)
            .await
            .map_err(|e| Error::custom(format!("Failed to fetch transcript: {e}")))?;

        let text = transcript
            .snippets
            .iter()
            .map(|snippet| snippet.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let token_count = self.tokenizer.count(&text);

        tracing::debug!(
            %video_id,
            language = %chosen.language_code,
            generated = chosen.is_generated,
            snippets = transcript.snippets.len(),
            token_count,
            "Fetched transcript"
        );

        Ok(TranscriptFetch { text, token_count })
    }
}

/// What is known about a caption track before fetching it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub is_generated: bool,
}

/// Index of the track to fetch.
///
/// Each preferred language is tried in order, manual before generated. When no
/// preference matches (or none is given) the first manual track wins, then the
/// first generated one.
pub fn pick_track(tracks: &[CaptionTrack], languages: &[String]) -> Option<usize> {
    let find = |generated: bool, lang: Option<&str>| {
        tracks.iter().position(|t| {
            t.is_generated == generated && lang.is_none_or(|lang| t.language_code == lang)
        })
    };

    languages
        .iter()
        .find_map(|lang| find(false, Some(lang)).or_else(|| find(true, Some(lang))))
        .or_else(|| find(false, None))
        .or_else(|| find(true, None))
}

/// Pulls the 11-character video id out of a watch, embed, short or bare path URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).and_then(|cap| cap.get(1)))
        .map(|m| m.as_str().to_string())
}
