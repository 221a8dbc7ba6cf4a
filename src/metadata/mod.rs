use md5::Digest;

use crate::error::ServeError;

/// The subset of `www/data/System.json` needed to name the server
#[derive(Debug, PartialEq, serde::Deserialize)]
pub struct GameMetadata {
    #[serde(rename = "gameTitle")]
    pub title: String,
}

pub fn get_system_json_path(directory: &std::path::Path) -> std::path::PathBuf {
    directory.join("www").join("data").join("System.json")
}

impl GameMetadata {
    pub fn read(directory: &std::path::Path) -> Result<GameMetadata, ServeError> {
        let path = get_system_json_path(directory);
        let content = std::fs::read(&path).map_err(|e| ServeError::MetadataUnavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&content).map_err(|e| ServeError::MetadataUnavailable {
            path,
            reason: e.to_string(),
        })
    }
}

pub fn read_title(directory: &std::path::Path) -> Result<String, ServeError> {
    GameMetadata::read(directory).map(|metadata| metadata.title)
}

/// Lowercase hex MD5 of the label, 32 characters
pub fn hash_label(label: &str) -> String {
    format!("{:x}", md5::Md5::digest(label.as_bytes()))
}

/// `<md5(subdomain or game title)>.<domain>`
///
/// The game metadata is only read when no subdomain is configured.
pub fn get_hostname(options: &crate::configuration::Options) -> Result<String, ServeError> {
    let label = if options.subdomain.is_empty() {
        read_title(&options.directory)?
    } else {
        options.subdomain.clone()
    };
    Ok(format!("{}.{}", hash_label(&label), options.domain))
}
