use crate::core::keypoints::KeyPoint;
use serde::Serialize;

pub const VIDEO_URL_FIELD: &str = "Video URL";
pub const TITLE_FIELD: &str = "Title";
pub const COMPLETE_FIELD: &str = "Complete";

/// One summarized video, ready for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    pub video_url: String,
    pub title: String,
    pub complete_summary: String,
    pub key_points: Vec<KeyPoint>,
}

impl VideoRecord {
    pub fn build(
        key_points: Vec<KeyPoint>,
        video_title: &str,
        video_url: &str,
        raw_summary: &str,
    ) -> Self {
        Self {
            video_url: video_url.to_string(),
            title: video_title.to_string(),
            complete_summary: raw_summary.trim().to_string(),
            key_points,
        }
    }

    /// Flat field list: the three fixed fields, then a numbered title and
    /// summary field per key point starting at 1.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::with_capacity(3 + self.key_points.len() * 2);
        fields.push((VIDEO_URL_FIELD.to_string(), self.video_url.clone()));
        fields.push((TITLE_FIELD.to_string(), self.title.clone()));
        fields.push((COMPLETE_FIELD.to_string(), self.complete_summary.clone()));

        for (idx, kp) in self.key_points.iter().enumerate() {
            let n = idx + 1;
            fields.push((format!("KeyPoint {n} - Title"), kp.title.clone()));
            fields.push((format!("KeyPoint {n} - Summary"), kp.summary.replace('\n', " ")));
        }

        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Skipped,
    Failed,
}

/// What happened to a single playlist entry.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    Success(VideoRecord),
    Skipped { video_url: String, reason: String },
    Failed { video_url: String, reason: String },
}

impl VideoOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            VideoOutcome::Success(_) => OutcomeKind::Success,
            VideoOutcome::Skipped { .. } => OutcomeKind::Skipped,
            VideoOutcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    pub fn video_url(&self) -> &str {
        match self {
            VideoOutcome::Success(record) => &record.video_url,
            VideoOutcome::Skipped { video_url, .. } | VideoOutcome::Failed { video_url, .. } => {
                video_url
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistReport {
    pub outcomes: Vec<VideoOutcome>,
}

impl PlaylistReport {
    /// Successful records in playlist order.
    pub fn records(&self) -> Vec<&VideoRecord> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                VideoOutcome::Success(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes.iter().filter(|o| o.kind() == kind).count()
    }
}
