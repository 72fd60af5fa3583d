use anyhow::{anyhow, Result};
use base64::Engine;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use rand::Rng;

use crate::providers::image::strip_data_url_prefix;

#[derive(Clone)]
pub struct StorageClient {
    gcs_client: Client,
    bucket: String,
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

fn object_name(mime_type: &str, purpose: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!(
        "{}-{}-{}.{}",
        timestamp,
        suffix,
        purpose,
        extension_for_mime(mime_type)
    )
}

impl StorageClient {
    pub async fn new() -> Result<Self> {
        let bucket = dotenvy::var("BLOG_IMAGE_BUCKET")
            .map_err(|_| anyhow!("BLOG_IMAGE_BUCKET is not set"))?;
        let config = ClientConfig::default().with_auth().await?;
        Ok(Self {
            gcs_client: Client::new(config),
            bucket,
        })
    }

    /// Decode a base64 image payload, upload it to the bucket, and return
    /// the public URL.
    pub async fn upload_image(
        &self,
        base64_data: &str,
        mime_type: &str,
        purpose: &str,
    ) -> Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(strip_data_url_prefix(base64_data))?;
        let object = format!("blog-images/{}", object_name(mime_type, purpose));
        let mut media = Media::new(object.clone());
        media.content_type = mime_type.to_string().into();
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };
        self.gcs_client
            .upload_object(&request, bytes, &UploadType::Simple(media))
            .await?;
        Ok(format!(
            "https://storage.googleapis.com/{}/{}",
            self.bucket, object
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_carry_purpose_and_mapped_extension() {
        let name = object_name("image/webp", "sub2");
        assert!(name.ends_with("-sub2.webp"), "got {}", name);

        // Unrecognized MIME types fall back to png.
        let name = object_name("image/unknown", "main");
        assert!(name.ends_with("-main.png"), "got {}", name);
    }

    #[test]
    fn consecutive_object_names_differ() {
        assert_ne!(object_name("image/png", "main"), object_name("image/png", "main"));
    }
}
