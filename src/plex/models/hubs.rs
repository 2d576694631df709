use serde::Deserialize;

use super::metadata::Metadata;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HubMediaContainer {
    #[serde(default)]
    pub size: i32,
    #[serde(rename = "Hub", default)]
    pub hub: Vec<Hub>,
}

/// One group of search results; Plex returns a hub per item type.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Hub {
    #[serde(default)]
    pub size: i32,
    pub title: String,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(rename = "Metadata")]
    pub metadata: Option<Vec<Metadata>>,
}

impl HubMediaContainer {
    /// Every track across the hubs, in the order Plex ranked them.
    pub fn tracks(self) -> Vec<Metadata> {
        self.hub
            .into_iter()
            .filter(|hub| hub.rtype == "track")
            .flat_map(|hub| hub.metadata.unwrap_or_default())
            .filter(|m| m.rtype == "track")
            .collect()
    }
}
