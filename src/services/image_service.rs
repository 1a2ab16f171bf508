// ==================== IMAGE HOSTING ====================
// Family photos live on Cloudinary. Uploads and deletions run detached from
// the request that triggered them; their failures only reach the log.

use crate::{
    config::CloudinaryConfig,
    database::{MongoDB, FAMILIES},
    models::Family,
    utils::AppError,
};
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// `source` is a remote URL or a `data:` URI.
    async fn upload(&self, source: &str) -> Result<UploadedImage, AppError>;
    async fn destroy(&self, public_id: &str) -> Result<(), AppError>;
}

pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
    api_base: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            api_base: CLOUDINARY_API_BASE.to_string(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.config.cloud_name, action)
    }

    /// Adds `api_key`, `timestamp` and `signature` to the signed params.
    fn signed_form(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        params.push(("timestamp".to_string(), chrono::Utc::now().timestamp().to_string()));

        let signature = sign_params(&params, &self.config.api_secret);
        params.push(("api_key".to_string(), self.config.api_key.clone()));
        params.push(("signature".to_string(), signature));
        params
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, source: &str) -> Result<UploadedImage, AppError> {
        let mut params = Vec::new();
        if let Some(folder) = &self.config.folder {
            params.push(("folder".to_string(), folder.clone()));
        }
        let mut form = self.signed_form(params);
        // `file` is not part of the signature
        form.push(("file".to_string(), source.to_string()));

        let response = self.http.post(self.endpoint("upload")).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Cloudinary upload failed ({}): {}",
                status, body
            )));
        }

        response.json::<UploadedImage>().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Cloudinary response: {}", e))
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        let form = self.signed_form(vec![("public_id".to_string(), public_id.to_string())]);

        let response = self.http.post(self.endpoint("destroy")).form(&form).send().await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Cloudinary destroy failed: {}",
                response.status()
            )));
        }

        let body: DestroyResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Cloudinary response: {}", e))
        })?;

        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(AppError::ExternalService(format!(
                "Cloudinary destroy returned '{}'",
                other
            ))),
        }
    }
}

/// Cloudinary request signature: params sorted by key, joined as
/// `k=v&k=v`, secret appended, SHA-1, hex encoded.
pub fn sign_params(params: &[(String, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recovers the public id from a delivery URL such as
/// `https://res.cloudinary.com/<cloud>/image/upload/v1700000000/family/abc.jpg`
/// (gives `family/abc`).
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/upload/")?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(first) = segments.first() {
        let is_version = first.len() > 1
            && first.starts_with('v')
            && first[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            segments.remove(0);
        }
    }

    let last = segments.pop()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => last,
    };
    segments.push(stem);

    Some(segments.join("/"))
}

/// Hosted image to remove once `family` has been deleted, if any.
pub fn cleanup_target(family: &Family) -> Option<String> {
    family
        .image_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string)
}

/// Uploads the image in the background and patches `image_url` onto the
/// family once the host answers. The HTTP response has already gone out.
pub fn spawn_image_enrichment(
    db: MongoDB,
    host: Arc<dyn ImageHost>,
    family_id: ObjectId,
    source: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!("🖼️  Uploading image for family {}", family_id);

        let uploaded = match host.upload(&source).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                log::error!("❌ Image upload failed for family {}: {}", family_id, e);
                return;
            }
        };

        let result = db
            .collection::<Family>(FAMILIES)
            .update_one(
                doc! { "_id": family_id },
                doc! { "$set": {
                    "image_url": &uploaded.secure_url,
                    "updated_at": chrono::Utc::now().timestamp(),
                } },
            )
            .await;

        match result {
            Ok(r) if r.matched_count == 0 => {
                // Family was deleted while the upload ran
                log::warn!("⚠️  Family {} vanished before image could be attached", family_id);
                if let Err(e) = host.destroy(&uploaded.public_id).await {
                    log::error!("❌ Failed to remove orphaned image {}: {}", uploaded.public_id, e);
                }
            }
            Ok(_) => log::info!("✅ Image attached to family {}", family_id),
            Err(e) => log::error!("❌ Failed to save image URL for family {}: {}", family_id, e),
        }
    })
}

/// Deletes a hosted image in the background.
pub fn spawn_image_cleanup(host: Arc<dyn ImageHost>, image_url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(public_id) = public_id_from_url(&image_url) else {
            log::warn!("⚠️  Cannot derive public id from image URL {}", image_url);
            return;
        };

        match host.destroy(&public_id).await {
            Ok(()) => log::info!("🗑️  Removed hosted image {}", public_id),
            Err(e) => log::error!("❌ Failed to remove hosted image {}: {}", public_id, e),
        }
    })
}
