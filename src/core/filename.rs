use std::path::Path;

/// Song name and artist guessed from an audio file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameGuess {
    pub song_name: Option<String>,
    pub artist: Option<String>,
}

/// Guess metadata from a file name so the upload form can be prefilled.
///
/// Supported patterns:
/// - "Artist - Title.mp3"
/// - "01. Title.mp3"
/// - "01 Artist - Title.mp3"
/// - "Title.mp3" (fallback)
pub fn guess_from_path(path: &Path) -> NameGuess {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return NameGuess::default();
    };
    let stem = stem.trim();
    if stem.is_empty() {
        return NameGuess::default();
    }

    let rest = strip_track_number(stem).unwrap_or(stem);
    if let Some((artist, title)) = split_artist_title(rest) {
        return NameGuess {
            song_name: Some(title.to_string()),
            artist: Some(artist.to_string()),
        };
    }

    NameGuess {
        song_name: Some(rest.trim().to_string()),
        artist: None,
    }
}

/// 비어 있는 필드만 추측값으로 채운다.
pub fn fill_missing(song_name: &mut String, artist: &mut String, guess: NameGuess) {
    if song_name.trim().is_empty() {
        if let Some(title) = guess.song_name {
            *song_name = title;
        }
    }
    if artist.trim().is_empty() {
        if let Some(a) = guess.artist {
            *artist = a;
        }
    }
}

fn split_artist_title(stem: &str) -> Option<(&str, &str)> {
    let (artist, title) = stem.split_once(" - ")?;
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() {
        return None;
    }
    Some((artist, title))
}

fn strip_track_number(stem: &str) -> Option<&str> {
    let digits = stem.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &stem[digits..];
    // "01. Title", "01 Title". "2Pac" is a name, not a track number.
    let rest = match rest.strip_prefix('.') {
        Some(after_dot) => after_dot,
        None if rest.starts_with(char::is_whitespace) => rest,
        None => return None,
    };
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }
    Some(rest)
}
