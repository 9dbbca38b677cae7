use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("showreel")
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Where the site lives and how the contact desk is set up.
/// Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL the data documents and media references resolve against.
    /// `file://` URLs read a local checkout of the site.
    pub site_url: String,
    pub mixes_path: String,
    pub gallery_path: String,
    pub contact_endpoint: String,
    pub contact_email: String,
    pub contact_subjects: Vec<String>,
    /// Rows shown before the first "Load more".
    pub page_size: usize,
    pub page_step: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "https://localhost/".to_string(),
            mixes_path: "data/mixes.json".to_string(),
            gallery_path: "data/gallery.json".to_string(),
            contact_endpoint: "https://formsubmit.co/ajax/booking@example.com".to_string(),
            contact_email: "booking@example.com".to_string(),
            contact_subjects: vec![
                "Booking".to_string(),
                "Private event".to_string(),
                "Collaboration".to_string(),
                "Other".to_string(),
            ],
            page_size: 6,
            page_step: 3,
        }
    }
}

impl SiteConfig {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<SiteConfig>(&contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config");
                config.normalized()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    fn normalized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = Self::default().page_size;
        }
        if self.page_step == 0 {
            self.page_step = Self::default().page_step;
        }
        // Url::join drops the last path segment unless it ends in a slash.
        if !self.site_url.ends_with('/') {
            self.site_url.push('/');
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("showreel-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = SiteConfig::load_from(Path::new("/nonexistent/showreel/config.json"));
        assert_eq!(config.page_size, 6);
        assert_eq!(config.page_step, 3);
        assert_eq!(config.mixes_path, "data/mixes.json");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let path = temp_file(
            "partial.json",
            r#"{ "site_url": "https://dj.example.org", "page_size": 0 }"#,
        );
        let config = SiteConfig::load_from(&path);
        assert_eq!(config.site_url, "https://dj.example.org/");
        assert_eq!(config.page_size, 6);
        assert_eq!(config.gallery_path, "data/gallery.json");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_garbage_file_gives_defaults() {
        let path = temp_file("garbage.json", "{ not json");
        let config = SiteConfig::load_from(&path);
        assert_eq!(config.contact_subjects.len(), 4);
        fs::remove_file(path).ok();
    }
}
