use levenshtein::levenshtein;

use crate::{config::MatchConfig, track::Track};

use super::normalize::{normalize, simplify, split_artists, version_keywords};

/// Levenshtein distance scaled into `[0, 1]`, 1.0 meaning identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// True when one title is the other followed by more words,
/// e.g. "yesterday" and "yesterday remastered 2009".
fn word_prefix(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    !short.is_empty() && (long == short || long.starts_with(&format!("{short} ")))
}

pub fn title_similarity(source: &str, candidate: &str) -> f64 {
    let full = similarity(&normalize(source), &normalize(candidate));
    let simple_source = simplify(source);
    let simple_candidate = simplify(candidate);
    let mut best = full.max(similarity(&simple_source, &simple_candidate));
    if word_prefix(&simple_source, &simple_candidate) {
        best = best.max(0.9);
    }
    best
}

fn artist_forms(artist: &str) -> Vec<String> {
    let mut forms = vec![normalize(artist)];
    forms.extend(split_artists(artist));
    forms.retain(|f| !f.is_empty());
    forms
}

/// Best similarity between the source's primary artist and any of the
/// candidate's artists.
pub fn artist_similarity(source: &Track, candidate: &Track) -> f64 {
    let Some(primary) = source.primary_artist() else {
        return 0.0;
    };
    let source_forms = artist_forms(primary);
    candidate
        .artists
        .iter()
        .flat_map(|artist| artist_forms(artist))
        .flat_map(|candidate_form| {
            source_forms
                .iter()
                .map(move |source_form| similarity(source_form, &candidate_form))
        })
        .fold(0.0, f64::max)
}

/// `None` means the durations are too far apart for the tracks to be the
/// same recording.
pub fn duration_score(source: u32, candidate: u32, config: &MatchConfig) -> Option<f64> {
    if source == 0 || candidate == 0 {
        return Some(0.5);
    }
    let diff = source.abs_diff(candidate);
    if diff <= config.strong_duration_secs {
        return Some(1.0);
    }
    if diff > config.max_duration_secs {
        return None;
    }
    let span = (config.max_duration_secs - config.strong_duration_secs).max(1) as f64;
    Some(1.0 - (diff - config.strong_duration_secs) as f64 / span)
}

pub fn album_matches(source: &Track, candidate: &Track) -> bool {
    let source_album = simplify(&source.album);
    !source_album.is_empty() && source_album == simplify(&candidate.album)
}

/// Combined confidence of `candidate` being the same recording as `source`.
pub fn score(source: &Track, candidate: &Track, config: &MatchConfig) -> Option<f64> {
    if version_keywords(&source.title) != version_keywords(&candidate.title) {
        return None;
    }
    let duration = duration_score(source.duration, candidate.duration, config)?;
    let title = title_similarity(&source.title, &candidate.title);
    let artist = artist_similarity(source, candidate);

    let total_weight = config.title_weight + config.artist_weight + config.duration_weight;
    if total_weight <= 0.0 {
        return None;
    }
    let combined = (config.title_weight * title
        + config.artist_weight * artist
        + config.duration_weight * duration)
        / total_weight;
    Some(combined.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, artist: &str, album: &str, duration: u32) -> Track {
        Track {
            title: title.to_string(),
            artists: vec![artist.to_string()],
            album: album.to_string(),
            duration,
            isrc: None,
        }
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn remaster_suffix_counts_as_strong_title_match() {
        assert!(title_similarity("Yesterday", "Yesterday - Remastered 2009") >= 0.9);
        assert!(title_similarity("Yesterday", "Yesterday (Remastered 2009)") >= 0.9);
        assert!(title_similarity("Yesterday", "Tomorrow") < 0.5);
    }

    #[test]
    fn artist_similarity_checks_every_credited_artist() {
        let source = track("Get Lucky", "Pharrell Williams", "", 0);
        let candidate = track("Get Lucky", "Daft Punk feat. Pharrell Williams", "", 0);
        assert_eq!(artist_similarity(&source, &candidate), 1.0);
    }

    #[test]
    fn duration_tolerance() {
        let config = MatchConfig::default();
        assert_eq!(duration_score(200, 202, &config), Some(1.0));
        assert_eq!(duration_score(200, 211, &config), None);
        assert_eq!(duration_score(200, 210, &config), Some(0.0));
        assert_eq!(duration_score(200, 206, &config), Some(0.5));
        assert_eq!(duration_score(0, 300, &config), Some(0.5));
    }

    #[test]
    fn version_mismatch_disqualifies() {
        let config = MatchConfig::default();
        let source = track("Levels", "Avicii", "Levels", 200);
        let remix = track("Levels (Skrillex Remix)", "Avicii", "Levels", 200);
        assert_eq!(score(&source, &remix, &config), None);
    }

    #[test]
    fn identical_metadata_scores_one() {
        let config = MatchConfig::default();
        let source = track("Levels", "Avicii", "Levels", 200);
        assert_eq!(score(&source, &source.clone(), &config), Some(1.0));
    }
}
