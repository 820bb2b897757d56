use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::{UploadDraft, UploadRequest, UploadSource};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide a file or a link.")]
    MissingSource,
    #[error("Provide either a file or a link, not both.")]
    ConflictingSources,
    #[error("Song title is required.")]
    MissingSongName,
    #[error("Artist name is required.")]
    MissingArtist,
    #[error("Please enter a valid URL.")]
    InvalidLink,
    #[error("Please enter a valid YouTube URL.")]
    NotYoutube,
}

/// 링크 검증 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    pub youtube_only: bool,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self { youtube_only: true }
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?(?::\d+)?(?:[/?#]\S*)?$")
            .expect("static url pattern")
    })
}

fn youtube_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:(?:www\.|m\.|music\.)?youtube\.com|youtu\.be)/\S+$")
            .expect("static youtube pattern")
    })
}

/// Checks the shape of a link before it is sent anywhere.
///
/// Links must be absolute http(s) URLs; with `youtube_only` they must also
/// point at youtube.com or youtu.be.
pub fn validate_link(url: &str, policy: LinkPolicy) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::MissingSource);
    }
    if !url_pattern().is_match(url) {
        return Err(ValidationError::InvalidLink);
    }
    if policy.youtube_only && !youtube_pattern().is_match(url) {
        return Err(ValidationError::NotYoutube);
    }
    Ok(())
}

/// 폼 내용을 검증하여 전송 가능한 요청으로 바꾼다.
/// 파일과 링크 중 정확히 하나, 곡명과 아티스트가 모두 있어야 한다.
pub fn validate_draft(
    draft: &UploadDraft,
    policy: LinkPolicy,
) -> Result<UploadRequest, ValidationError> {
    let url = draft
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    let source = match (&draft.file, url) {
        (Some(_), Some(_)) => return Err(ValidationError::ConflictingSources),
        (None, None) => return Err(ValidationError::MissingSource),
        (Some(path), None) => UploadSource::File(path.clone()),
        (None, Some(url)) => {
            validate_link(url, policy)?;
            UploadSource::Link(url.to_string())
        }
    };

    let song_name = draft.song_name.trim();
    if song_name.is_empty() {
        return Err(ValidationError::MissingSongName);
    }
    let artist = draft.artist.trim();
    if artist.is_empty() {
        return Err(ValidationError::MissingArtist);
    }

    Ok(UploadRequest {
        source,
        song_name: song_name.to_string(),
        artist: artist.to_string(),
    })
}

/// Whether the submit action should be enabled for this draft.
pub fn can_submit(draft: &UploadDraft, policy: LinkPolicy) -> bool {
    validate_draft(draft, policy).is_ok()
}
