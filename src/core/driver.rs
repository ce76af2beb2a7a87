//! Sequential playlist pipeline: enumerate, fetch, summarize, parse, export.

use crate::config::Settings;
use crate::core::chunking::Tokenizer;
use crate::core::export::write_xlsx;
use crate::core::keypoints::parse_key_points;
use crate::core::metadata::{MetadataService, VideoMetadata};
use crate::core::playlist::PlaylistService;
use crate::core::record::{OutcomeKind, PlaylistReport, VideoOutcome, VideoRecord};
use crate::core::summarize::{ChainSummarizer, CompletionBackend, Summarizer};
use crate::core::transcript::{TranscriptFetch, TranscriptService};
use crate::error::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub trait VideoSource {
    fn video_urls(&self, playlist_url: &str) -> impl Future<Output = Vec<String>> + Send;
}

pub trait MetadataSource {
    fn fetch_metadata(&self, video_url: &str)
    -> impl Future<Output = Result<VideoMetadata>> + Send;
}

pub trait TranscriptSource {
    fn fetch_transcript(
        &self,
        video_url: &str,
    ) -> impl Future<Output = Result<TranscriptFetch>> + Send;
}

/// Progress notifications for whoever is presenting the run.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Started {
        total: usize,
    },
    VideoStarted {
        index: usize,
        total: usize,
        video_url: String,
    },
    Log(String),
    VideoFinished {
        index: usize,
        kind: OutcomeKind,
    },
    Exported {
        path: PathBuf,
    },
    Completed {
        summarized: usize,
        skipped: usize,
        failed: usize,
    },
    Aborted(String),
}

pub struct PlaylistDriver<V, M, T, S> {
    videos: V,
    metadata: M,
    transcripts: T,
    summarizer: S,
    events: Option<mpsc::UnboundedSender<DriverEvent>>,
}

impl<V, M, T, S> PlaylistDriver<V, M, T, S>
where
    V: VideoSource + Sync,
    M: MetadataSource + Sync,
    T: TranscriptSource + Sync,
    S: Summarizer + Sync,
{
    pub fn new(videos: V, metadata: M, transcripts: T, summarizer: S) -> Self {
        Self {
            videos,
            metadata,
            transcripts,
            summarizer,
            events: None,
        }
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: DriverEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is watching anymore.
            let _ = tx.send(event);
        }
    }

    /// Processes every playlist entry one at a time. Per-video problems are
    /// recorded as outcomes and never stop the loop.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, playlist_url: &str) -> PlaylistReport {
        let video_urls = self.videos.video_urls(playlist_url).await;
        let total = video_urls.len();
        tracing::info!(total, "Summarizing playlist");
        self.emit(DriverEvent::Started { total });

        let mut report = PlaylistReport::default();
        for (idx, video_url) in video_urls.iter().enumerate() {
            let index = idx + 1;
            self.emit(DriverEvent::VideoStarted {
                index,
                total,
                video_url: video_url.clone(),
            });

            let outcome = self.process_video(video_url).await;
            let video_url = outcome.video_url();
            match &outcome {
                VideoOutcome::Success(record) => {
                    tracing::info!(%video_url, key_points = record.key_points.len(), "Summarized video");
                    self.emit(DriverEvent::Log(format!(
                        "Summarized '{}' ({} key points)",
                        record.title,
                        record.key_points.len()
                    )));
                }
                VideoOutcome::Skipped { reason, .. } => {
                    tracing::warn!(%video_url, %reason, "Skipping video");
                    self.emit(DriverEvent::Log(format!("Skipping {video_url}: {reason}")));
                }
                VideoOutcome::Failed { reason, .. } => {
                    tracing::error!(%video_url, %reason, "Failed to summarize video");
                    self.emit(DriverEvent::Log(format!("Error on {video_url}: {reason}")));
                }
            }
            self.emit(DriverEvent::VideoFinished {
                index,
                kind: outcome.kind(),
            });
            report.outcomes.push(outcome);
        }

        report
    }

    /// Runs the playlist, then writes every successful record to `output`.
    /// Only an export failure makes this return an error.
    pub async fn run_and_export(&self, playlist_url: &str, output: &Path) -> Result<PlaylistReport> {
        let report = self.run(playlist_url).await;

        if let Err(e) = write_xlsx(&report.records(), output) {
            self.emit(DriverEvent::Aborted(e.to_string()));
            return Err(e);
        }
        tracing::info!(path = %output.display(), "Structured summary exported");
        self.emit(DriverEvent::Exported {
            path: output.to_path_buf(),
        });
        self.emit(DriverEvent::Completed {
            summarized: report.count(OutcomeKind::Success),
            skipped: report.count(OutcomeKind::Skipped),
            failed: report.count(OutcomeKind::Failed),
        });

        Ok(report)
    }

    #[tracing::instrument(skip(self))]
    pub async fn process_video(&self, video_url: &str) -> VideoOutcome {
        let failed = |reason: String| VideoOutcome::Failed {
            video_url: video_url.to_string(),
            reason,
        };
        let skipped = |reason: String| VideoOutcome::Skipped {
            video_url: video_url.to_string(),
            reason,
        };

        let metadata = match self.metadata.fetch_metadata(video_url).await {
            Ok(metadata) => metadata,
            Err(e) => return failed(format!("metadata: {e}")),
        };
        tracing::debug!(title = %metadata.title, description = %metadata.description, "Fetched metadata");

        let transcript = match self.transcripts.fetch_transcript(video_url).await {
            Ok(transcript) if transcript.is_usable() => transcript,
            Ok(_) => {
                return skipped(format!(
                    "transcript issue for '{}' (empty transcript)",
                    metadata.title
                ));
            }
            Err(e) => return skipped(format!("transcript issue for '{}': {e}", metadata.title)),
        };

        let summary = match self.summarizer.summarize(&transcript.text).await {
            Ok(summary) => summary,
            Err(e) => return failed(format!("summary: {e}")),
        };

        let key_points = parse_key_points(&summary);
        VideoOutcome::Success(VideoRecord::build(
            key_points,
            &metadata.title,
            video_url,
            &summary,
        ))
    }
}

/// The driver wired to YouTube and the configured model provider.
pub type LiveDriver = PlaylistDriver<
    PlaylistService,
    MetadataService,
    TranscriptService,
    ChainSummarizer<CompletionBackend>,
>;

pub fn live_driver(settings: Settings) -> Result<LiveDriver> {
    let client = reqwest::Client::new();
    let tokenizer = Tokenizer::cl100k()?;

    let transcripts = TranscriptService::new(
        client.clone(),
        tokenizer.clone(),
        settings.languages.clone(),
    )?;
    let completion = CompletionBackend::from_settings(&settings, client.clone());
    let summarizer = ChainSummarizer::new(completion, tokenizer, settings);

    Ok(PlaylistDriver::new(
        PlaylistService::new(client.clone()),
        MetadataService::new(client),
        transcripts,
        summarizer,
    ))
}
