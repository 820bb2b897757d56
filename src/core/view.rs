use crate::client::file_url;
use crate::models::ClassificationResult;

pub const UNKNOWN_SONG: &str = "Unknown Song";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq)]
pub struct GenreRow {
    pub rank: usize,
    pub name: String,
    pub confidence: f64,
    pub label: String,
    /// Bar length, 0.0 ..= 1.0.
    pub fraction: f32,
}

/// Everything the results panel shows, derived from one result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub title: String,
    pub byline: String,
    pub cover_url: Option<String>,
    pub genres: Vec<GenreRow>,
    pub filename: String,
    pub audio_url: Option<String>,
}

impl ResultView {
    /// `base_url` is the classification service root used for `/uploads/{filename}`.
    pub fn new(result: &ClassificationResult, base_url: &str) -> Self {
        let title = non_blank(&result.song_name).unwrap_or(UNKNOWN_SONG);
        let artist = non_blank(&result.artist).unwrap_or(UNKNOWN_ARTIST);

        let mut ranked: Vec<_> = result.genres.iter().collect();
        // 안정 정렬: 같은 신뢰도면 서버 순서를 유지한다
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let genres = ranked
            .into_iter()
            .enumerate()
            .map(|(i, g)| GenreRow {
                rank: i + 1,
                name: g.name.clone(),
                confidence: g.confidence,
                label: genre_label(&g.name, g.confidence),
                fraction: (g.confidence / 100.0).clamp(0.0, 1.0) as f32,
            })
            .collect();

        let audio_url = non_blank(&result.filename).map(|f| audio_url(base_url, f));

        Self {
            title: title.to_string(),
            byline: format!("by {}", artist),
            cover_url: non_blank(&result.cover_image_url).map(str::to_string),
            genres,
            filename: result.filename.clone(),
            audio_url,
        }
    }
}

pub fn audio_url(base_url: &str, filename: &str) -> String {
    match file_url(base_url, "uploads", filename) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}/uploads/{}", base_url.trim_end_matches('/'), filename),
    }
}

/// "Rock (80%)". A zero confidence shows only the name.
pub fn genre_label(name: &str, confidence: f64) -> String {
    if confidence == 0.0 || !confidence.is_finite() {
        return name.to_string();
    }
    format!("{} ({})", name, format_percent(confidence))
}

pub fn format_percent(confidence: f64) -> String {
    if confidence.fract() == 0.0 {
        format!("{:.0}%", confidence)
    } else {
        let text = format!("{:.2}", confidence);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        format!("{}%", text)
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;

    fn genre(name: &str, confidence: f64) -> Genre {
        Genre {
            name: name.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_rendered_example() {
        let result = ClassificationResult {
            song_name: "Test".to_string(),
            artist: "Tester".to_string(),
            cover_image_url: "http://x/img.png".to_string(),
            genres: vec![genre("Rock", 80.0)],
            filename: "abc.mp3".to_string(),
        };
        let view = ResultView::new(&result, "http://127.0.0.1:5001/");
        assert_eq!(view.title, "Test");
        assert_eq!(view.byline, "by Tester");
        assert_eq!(view.genres.len(), 1);
        assert_eq!(view.genres[0].label, "Rock (80%)");
        assert_eq!(view.cover_url.as_deref(), Some("http://x/img.png"));
        assert_eq!(
            view.audio_url.as_deref(),
            Some("http://127.0.0.1:5001/uploads/abc.mp3")
        );
    }

    #[test]
    fn test_genres_are_ranked() {
        let result = ClassificationResult {
            song_name: "S".to_string(),
            artist: "A".to_string(),
            cover_image_url: String::new(),
            genres: vec![genre("Jazz", 10.0), genre("Pop", 55.5), genre("Folk", 10.0)],
            filename: String::new(),
        };
        let view = ResultView::new(&result, "http://h");
        let names: Vec<_> = view.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Pop", "Jazz", "Folk"]);
        assert_eq!(view.genres[0].rank, 1);
        assert_eq!(view.genres[0].label, "Pop (55.5%)");
        assert!((view.genres[0].fraction - 0.555).abs() < 1e-6);
        assert!(view.cover_url.is_none());
        assert!(view.audio_url.is_none());
    }

    #[test]
    fn test_audio_url_encodes_filename() {
        assert_eq!(
            audio_url("http://127.0.0.1:5001", "mix #2?.mp3"),
            "http://127.0.0.1:5001/uploads/mix%20%232%3F.mp3"
        );
    }

    #[test]
    fn test_fallback_metadata() {
        let result = ClassificationResult {
            song_name: "  ".to_string(),
            artist: String::new(),
            cover_image_url: String::new(),
            genres: Vec::new(),
            filename: "f.ogg".to_string(),
        };
        let view = ResultView::new(&result, "http://h");
        assert_eq!(view.title, UNKNOWN_SONG);
        assert_eq!(view.byline, "by Unknown Artist");
    }

    #[test]
    fn test_labels_and_fractions() {
        assert_eq!(genre_label("Rock", 0.0), "Rock");
        assert_eq!(genre_label("Rock", 33.333), "Rock (33.33%)");
        assert_eq!(genre_label("Rock", 12.10), "Rock (12.1%)");
        assert_eq!(format_percent(100.0), "100%");

        let result = ClassificationResult {
            song_name: "S".to_string(),
            artist: "A".to_string(),
            cover_image_url: String::new(),
            genres: vec![genre("Odd", 140.0), genre("Neg", -3.0)],
            filename: String::new(),
        };
        let view = ResultView::new(&result, "http://h");
        assert_eq!(view.genres[0].fraction, 1.0);
        assert_eq!(view.genres[1].fraction, 0.0);
    }
}
