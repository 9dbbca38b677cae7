use reqwest::Url;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    /// Display string, e.g. "58:12". Never parsed.
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub artwork: String,
    #[serde(default)]
    pub preview_url: String,
    #[serde(default)]
    pub full_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    /// Unknown kinds render as stills.
    #[default]
    #[serde(other)]
    Image,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GalleryItem {
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub src: String,
    /// Older documents name the source `image`; used when `src` is empty.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl GalleryItem {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn source(&self) -> &str {
        match self.image.as_deref() {
            Some(image) if self.src.is_empty() => image,
            _ => &self.src,
        }
    }

    /// Thumbnail for the carousel; videos usually ship a still.
    pub fn preview_src(&self) -> &str {
        match self.preview.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => self.source(),
        }
    }

    pub fn caption(&self) -> String {
        match self.venue.as_deref() {
            Some(venue) if !venue.is_empty() => format!("{} - {}", self.title, venue),
            _ => self.title.clone(),
        }
    }
}

/// Everything the site serves at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub mixes: Vec<Track>,
    pub gallery: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MixesDocument {
    #[serde(default)]
    pub mixes: Vec<Track>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GalleryDocument {
    #[serde(default)]
    pub gallery: Vec<GalleryItem>,
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Resolve a reference from the documents against the site root, the way the
/// page would. Absolute URLs pass through; unparseable input is kept as is.
pub fn resolve(base: &Url, reference: &str) -> String {
    if reference.is_empty() {
        return String::new();
    }
    base.join(reference)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| reference.to_string())
}

impl Track {
    pub(super) fn resolved(mut self, base: &Url) -> Self {
        self.artwork = resolve(base, &self.artwork);
        self.preview_url = resolve(base, &self.preview_url);
        self.full_link = resolve(base, &self.full_link);
        self
    }
}

impl GalleryItem {
    pub(super) fn resolved(mut self, base: &Url) -> Self {
        self.src = resolve(base, self.source());
        self.image = None;
        self.preview = self.preview.map(|p| resolve(base, &p));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_from_site_json() {
        let doc: MixesDocument = serde_json::from_str(
            r#"{ "mixes": [{
                "id": 7,
                "title": "Sunset at Galata",
                "description": "Live from the rooftop",
                "genre": "deep-house",
                "duration": "1:02:10",
                "artwork": "./images/galata.jpg",
                "previewUrl": "./audio/galata.mp3",
                "fullLink": "https://soundcloud.com/x/galata"
            }]}"#,
        )
        .unwrap();
        let track = &doc.mixes[0];
        assert_eq!(track.id, "7");
        assert_eq!(track.genre, "deep-house");
        assert_eq!(track.preview_url, "./audio/galata.mp3");
        assert_eq!(track.full_link, "https://soundcloud.com/x/galata");
    }

    #[test]
    fn test_missing_top_level_key_is_empty() {
        let doc: MixesDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.mixes.is_empty());
        let doc: GalleryDocument = serde_json::from_str(r#"{ "items": [] }"#).unwrap();
        assert!(doc.gallery.is_empty());
    }

    #[test]
    fn test_gallery_item_kinds() {
        let doc: GalleryDocument = serde_json::from_str(
            r#"{ "gallery": [
                { "type": "image", "src": "a.jpg", "title": "Crowd", "venue": "Babylon", "date": "2024-05-01" },
                { "type": "video", "src": "b.mp4", "preview": "b.jpg", "title": "Drop" },
                { "type": "panorama", "image": "c.jpg", "title": "Legacy" }
            ]}"#,
        )
        .unwrap();
        let [image, video, legacy] = &doc.gallery[..] else {
            panic!("expected three items");
        };
        assert!(!image.is_video());
        assert_eq!(image.preview_src(), "a.jpg");
        assert_eq!(image.caption(), "Crowd - Babylon");

        assert!(video.is_video());
        assert_eq!(video.preview_src(), "b.jpg");
        assert_eq!(video.caption(), "Drop");
        assert_eq!(video.date, None);

        assert_eq!(legacy.kind, MediaKind::Image);
        assert_eq!(legacy.source(), "c.jpg");
        assert_eq!(legacy.preview_src(), "c.jpg");
    }

    #[test]
    fn test_unknown_media_kind_is_image() {
        let item: GalleryItem =
            serde_json::from_str(r#"{ "type": "panorama", "src": "p.jpg" }"#).unwrap();
        assert_eq!(item.kind, MediaKind::Image);
        let item: GalleryItem = serde_json::from_str(r#"{ "src": "p.jpg" }"#).unwrap();
        assert_eq!(item.kind, MediaKind::Image);
        let item: GalleryItem = serde_json::from_str(r#"{ "type": "video", "src": "v.mp4" }"#).unwrap();
        assert_eq!(item.kind, MediaKind::Video);
    }

    #[test]
    fn test_src_and_image_together() {
        let doc: GalleryDocument = serde_json::from_str(
            r#"{ "gallery": [
                { "type": "image", "src": "a.jpg", "image": "old-a.jpg", "title": "Crowd" },
                { "type": "image", "src": "", "image": "b.jpg", "title": "Booth" }
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.gallery[0].source(), "a.jpg");
        assert_eq!(doc.gallery[1].source(), "b.jpg");

        let base = Url::parse("https://dj.example.org/").unwrap();
        let booth = doc.gallery[1].clone().resolved(&base);
        assert_eq!(booth.src, "https://dj.example.org/b.jpg");
        assert_eq!(booth.source(), booth.src);
    }

    #[test]
    fn test_track_without_title_keeps_document() {
        let doc: MixesDocument = serde_json::from_str(
            r#"{ "mixes": [{ "id": 1, "title": "A" }, { "id": 2, "genre": "house" }] }"#,
        )
        .unwrap();
        assert_eq!(doc.mixes.len(), 2);
        assert_eq!(doc.mixes[1].title, "");
        assert_eq!(doc.mixes[1].genre, "house");
    }

    #[test]
    fn test_resolve_against_site_root() {
        let base = Url::parse("https://dj.example.org/site/").unwrap();
        assert_eq!(resolve(&base, "./audio/a.mp3"), "https://dj.example.org/site/audio/a.mp3");
        assert_eq!(resolve(&base, "/img/b.jpg"), "https://dj.example.org/img/b.jpg");
        assert_eq!(resolve(&base, "https://cdn.example.com/c.jpg"), "https://cdn.example.com/c.jpg");
        assert_eq!(resolve(&base, ""), "");
    }
}
