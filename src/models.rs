use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 업로드 폼의 편집 중인 내용. 어떤 상태든 될 수 있다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadDraft {
    pub file: Option<PathBuf>,
    pub url: Option<String>,
    pub song_name: String,
    pub artist: String,
}

impl UploadDraft {
    pub fn with_file(path: impl Into<PathBuf>, song_name: &str, artist: &str) -> Self {
        Self {
            file: Some(path.into()),
            url: None,
            song_name: song_name.to_string(),
            artist: artist.to_string(),
        }
    }

    pub fn with_link(url: &str, song_name: &str, artist: &str) -> Self {
        Self {
            file: None,
            url: Some(url.to_string()),
            song_name: song_name.to_string(),
            artist: artist.to_string(),
        }
    }

    pub fn file_label(&self) -> &str {
        self.file
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("Choose Music File")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadSource {
    File(PathBuf),
    Link(String),
}

/// Validated draft: exactly one source, non-empty text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub source: UploadSource,
    pub song_name: String,
    pub artist: String,
}

impl UploadRequest {
    pub fn describe(&self) -> String {
        match &self.source {
            UploadSource::File(path) => format!("file {}", path.display()),
            UploadSource::Link(url) => format!("link {}", url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub song_name: String,
    pub artist: String,
    #[serde(default)]
    pub cover_image_url: String,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub filename: String,
}

impl ClassificationResult {
    pub fn summary(&self) -> String {
        let top = self
            .genres
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|g| g.name.as_str())
            .unwrap_or("no genre");
        format!("{} - {} [{}]", self.artist, self.song_name, top)
    }
}

/// `{ "error": "..." }` 형태의 서버 오류 본문.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

pub const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// 확장자가 서버가 받는 오디오 형식인지 확인한다 (대소문자 무시).
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

pub fn audio_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
