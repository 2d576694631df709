use std::fmt;

/// Track metadata as either service describes it. Nothing in here is a
/// cross-service identifier except the optional ISRC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    /// Seconds; 0 when the service did not report a duration.
    pub duration: u32,
    pub isrc: Option<String>,
}

impl Track {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty())
    }

    /// A track without a title or an artist can't be searched for.
    pub fn has_usable_metadata(&self) -> bool {
        !self.title.trim().is_empty() && self.primary_artist().is_some()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artists.join(", "), self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry of the destination catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTrack {
    pub id: TrackId,
    pub track: Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Isrc,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub track: DestinationTrack,
    /// In `[0, 1]`; always 1.0 for [`MatchMethod::Isrc`].
    pub confidence: f64,
    pub method: MatchMethod,
}

impl MatchCandidate {
    pub fn id(&self) -> &TrackId {
        &self.track.id
    }
}
