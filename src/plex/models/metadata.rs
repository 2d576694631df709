use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MetadataMediaContainer {
    pub total_size: Option<i32>,
    #[serde(default)]
    pub size: i32,
    #[serde(rename = "Metadata")]
    pub metadata: Option<Vec<Metadata>>,
}

/// A library item, playlist, or playlist entry. Which optional fields are
/// present depends on the endpoint.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub key: String,
    pub rating_key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub rtype: String,
    /// Track artist, when it differs from the album artist.
    pub original_title: Option<String>,
    /// Album artist, on tracks.
    pub grandparent_title: Option<String>,
    /// Album, on tracks.
    pub parent_title: Option<String>,
    /// Milliseconds.
    pub duration: Option<u64>,
    #[serde(rename = "playlistItemID")]
    pub playlist_item_id: Option<i64>,
    pub smart: Option<bool>,
    pub user_rating: Option<f32>,
}
