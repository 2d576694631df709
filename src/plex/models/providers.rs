use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMediaContainer {
    pub friendly_name: String,
    pub machine_identifier: String,
    #[serde(rename = "MediaProvider")]
    pub media_provider: Vec<MediaProvider>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaProvider {
    pub title: String,
    pub identifier: String,
    #[serde(rename = "Feature")]
    pub features: Vec<Feature>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Feature {
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(rename = "Directory")]
    pub directories: Option<Vec<Directory>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Directory {
    pub agent: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub rtype: Option<String>,
}

impl ProviderMediaContainer {
    /// Provider identifier and section id of the music library: the section
    /// titled "Music", else the first artist section.
    pub fn music_section(&self) -> Option<(String, String)> {
        let sections = || {
            self.media_provider.iter().flat_map(|provider| {
                provider
                    .features
                    .iter()
                    .filter_map(|feature| feature.directories.as_ref())
                    .flatten()
                    .filter_map(move |directory| {
                        let id = directory.id.clone()?;
                        Some((provider, directory, id))
                    })
            })
        };

        sections()
            .find(|(_, directory, _)| directory.title.as_deref() == Some("Music"))
            .or_else(|| {
                sections().find(|(_, directory, _)| directory.rtype.as_deref() == Some("artist"))
            })
            .map(|(provider, _, id)| (provider.identifier.clone(), id))
    }
}
