use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::sync::{Arc, LazyLock};

use super::types::*;
use crate::config::SiteConfig;
use crate::contact::ContactForm;
use crate::error::SiteError;

/// One connection pool for documents, artwork and the contact form.
static HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .user_agent(concat!("showreel/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "custom http client unavailable, using defaults");
            Client::new()
        })
});

#[derive(Debug)]
struct ClientInner {
    client: Client,
    site_url: Url,
    mixes_url: Url,
    gallery_url: Url,
}

/// Read-only access to the site's documents. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SiteClient {
    inner: Arc<ClientInner>,
}

fn parse_url(raw: &str) -> Result<Url, SiteError> {
    Url::parse(raw).map_err(|e| SiteError::Url(format!("{}: {}", raw, e)))
}

fn join_url(base: &Url, path: &str) -> Result<Url, SiteError> {
    base.join(path)
        .map_err(|e| SiteError::Url(format!("{}{}: {}", base, path, e)))
}

async fn read_url(client: &Client, url: &Url) -> Result<Vec<u8>, SiteError> {
    if url.scheme() == "file" {
        let path = url
            .to_file_path()
            .map_err(|_| SiteError::Url(url.to_string()))?;
        return Ok(tokio::fs::read(path).await?);
    }

    let resp = client.get(url.clone()).send().await?;
    if !resp.status().is_success() {
        return Err(SiteError::Status(resp.status()));
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Fetch an arbitrary media reference (artwork, gallery stills).
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, SiteError> {
    let url = parse_url(url)?;
    read_url(&HTTP, &url).await
}

impl SiteClient {
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {
        let site_url = parse_url(&config.site_url)?;
        let mixes_url = join_url(&site_url, &config.mixes_path)?;
        let gallery_url = join_url(&site_url, &config.gallery_path)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                client: HTTP.clone(),
                site_url,
                mixes_url,
                gallery_url,
            }),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, SiteError> {
        let bytes = read_url(&self.inner.client, url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn fetch_mixes(&self) -> Result<Vec<Track>, SiteError> {
        let doc: MixesDocument = self.fetch_json(&self.inner.mixes_url).await?;
        let base = &self.inner.site_url;
        Ok(doc.mixes.into_iter().map(|t| t.resolved(base)).collect())
    }

    pub async fn fetch_gallery(&self) -> Result<Vec<GalleryItem>, SiteError> {
        let doc: GalleryDocument = self.fetch_json(&self.inner.gallery_url).await?;
        let base = &self.inner.site_url;
        Ok(doc.gallery.into_iter().map(|g| g.resolved(base)).collect())
    }

    /// Load both documents. A document that cannot be fetched or parsed is
    /// logged and left empty; the other one still loads.
    pub async fn load_catalog(&self) -> Catalog {
        let (mixes, gallery) = futures::join!(self.fetch_mixes(), self.fetch_gallery());

        let mixes = mixes.unwrap_or_else(|e| {
            tracing::error!(url = %self.inner.mixes_url, error = %e, "failed to load mixes");
            Vec::new()
        });
        let gallery = gallery.unwrap_or_else(|e| {
            tracing::error!(url = %self.inner.gallery_url, error = %e, "failed to load gallery");
            Vec::new()
        });

        tracing::info!(mixes = mixes.len(), gallery = gallery.len(), "catalog loaded");
        Catalog { mixes, gallery }
    }
}

/// Where the contact form posts. Independent of the site URL, so a broken
/// document location does not take the form down with it.
#[derive(Clone, Debug)]
pub struct ContactEndpoint {
    client: Client,
    url: Url,
}

impl ContactEndpoint {
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {
        Ok(Self {
            client: HTTP.clone(),
            url: parse_url(&config.contact_endpoint)?,
        })
    }

    /// One form-encoded POST. Anything but a 2xx answer is a failure; there is
    /// no retry.
    pub async fn submit(&self, form: &ContactForm) -> Result<(), SiteError> {
        let resp = self
            .client
            .post(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, "contact endpoint rejected submission");
            return Err(SiteError::Status(status));
        }
        tracing::info!(%status, "contact form submitted");
        Ok(())
    }
}
