//! Image generation against the Gemini `generateContent` API, plus the
//! concurrent fan-out used when a request asks for several image purposes at
//! once.

use anyhow::{anyhow, bail, Context, Result};
use blogsmith::basic_models::{ImagePurpose, ReferenceImage};
use blogsmith::image_prompt::{self, ImageOptions};
use serde::Serialize;
use serde_json::json;

use crate::database::Database;
use crate::models::ImagePrompt;

pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

lazy_static::lazy_static! {
    static ref GOOGLE_AI_API_KEY: Result<String, String> =
        dotenvy::var("GOOGLE_AI_API_KEY").map_err(|_| "GOOGLE_AI_API_KEY is not set".to_string());

    static ref REQWEST_CLIENT: reqwest::Client = reqwest::Client::new();
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes, as delivered by the provider.
    pub image_data: String,
    pub mime_type: String,
}

/// Drop a `data:image/...;base64,` prefix if the caller left one on.
pub(crate) fn strip_data_url_prefix(data: &str) -> &str {
    match data.find("base64,") {
        Some(idx) => &data[idx + "base64,".len()..],
        None => data,
    }
}

/// Call the image model with a composed prompt and an optional inline
/// reference image. `Ok(None)` means the provider answered but produced no
/// image, which is distinct from a transport error.
pub async fn generate_image(
    prompt: &str,
    reference: Option<&ReferenceImage>,
) -> Result<Option<GeneratedImage>> {
    let api_key = GOOGLE_AI_API_KEY.as_ref().map_err(|e| anyhow!("{}", e))?;

    // The text part always comes first; the reference image travels as a
    // separate inline part, never embedded in the text.
    let mut parts = vec![json!({ "text": prompt })];
    if let Some(reference) = reference {
        parts.push(json!({
            "inline_data": {
                "mime_type": reference.mime_type,
                "data": strip_data_url_prefix(&reference.data),
            }
        }));
    }

    let response: serde_json::Value = REQWEST_CLIENT
        .post(format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            IMAGE_MODEL
        ))
        .header("x-goog-api-key", api_key)
        .json(&json!({ "contents": [{ "role": "user", "parts": parts }] }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("Decoding image generation payload")?;

    Ok(first_inline_image(&response))
}

/// Scan the first candidate's content parts for the first one carrying
/// inline binary data.
fn first_inline_image(response: &serde_json::Value) -> Option<GeneratedImage> {
    let parts = response
        .pointer("/candidates/0/content/parts")?
        .as_array()?;
    parts.iter().find_map(|part| {
        let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
        let data = inline
            .get("data")
            .and_then(|d| d.as_str())
            .filter(|d| !d.is_empty())?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(|m| m.as_str())?;
        Some(GeneratedImage {
            image_data: data.to_string(),
            mime_type: mime_type.to_string(),
        })
    })
}

/// One requested image: composition options plus the reference image that
/// applies to it (per-image override or the batch default).
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub options: ImageOptions,
    pub reference: Option<ReferenceImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPurposeImage {
    pub purpose: ImagePurpose,
    pub image_data: String,
    pub mime_type: String,
}

/// Generate every requested image concurrently. Each job is isolated: it
/// re-reads the fragment snapshot, composes its own prompt, and calls the
/// provider on its own; one failure never cancels the others. Results come
/// back in completion order.
pub async fn generate_many(
    db: &Database,
    title: &str,
    content: &str,
    jobs: Vec<ImageJob>,
) -> Result<Vec<GeneratedPurposeImage>> {
    let mut set = tokio::task::JoinSet::new();
    for job in jobs {
        let db = db.clone();
        let title = title.to_string();
        let content = content.to_string();
        set.spawn(async move {
            let purpose = job.options.purpose;
            let snapshot = ImagePrompt::fragment_snapshot(&db)?;
            let prompt = image_prompt::compose(&title, &content, &job.options, &snapshot);
            let image = generate_image(&prompt, job.reference.as_ref())
                .await?
                .ok_or_else(|| anyhow!("provider produced no image for {}", purpose))?;
            Ok::<_, anyhow::Error>(GeneratedPurposeImage {
                purpose,
                image_data: image.image_data,
                mime_type: image.mime_type,
            })
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => outcomes.push(Err(anyhow!("image generation task failed: {}", error))),
        }
    }
    aggregate_successes(outcomes)
}

/// At-least-one-success aggregation: failed jobs are dropped with a log
/// line; the call only fails when nothing succeeded.
fn aggregate_successes<T>(outcomes: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut fulfilled = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => fulfilled.push(value),
            Err(error) => tracing::warn!(%error, "image generation failed"),
        }
    }
    if fulfilled.is_empty() {
        bail!("no images could be generated");
    }
    Ok(fulfilled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_success_keeps_only_fulfilled_results() {
        let outcomes: Vec<Result<i32>> =
            vec![Ok(1), Err(anyhow!("boom")), Ok(3), Err(anyhow!("boom"))];
        let fulfilled = aggregate_successes(outcomes).unwrap();
        assert_eq!(fulfilled, vec![1, 3]);
    }

    #[test]
    fn zero_successes_fail_the_whole_call() {
        let outcomes: Vec<Result<i32>> = vec![Err(anyhow!("a")), Err(anyhow!("b"))];
        assert!(aggregate_successes(outcomes).is_err());
    }

    #[test]
    fn inline_image_extraction_takes_the_first_binary_part() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": "QUJD" } },
                        { "inlineData": { "mimeType": "image/webp", "data": "WFla" } }
                    ]
                }
            }]
        });
        let image = first_inline_image(&response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.image_data, "QUJD");
    }

    #[test]
    fn text_only_response_means_no_image_produced() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }]
        });
        assert!(first_inline_image(&response).is_none());
    }

    #[test]
    fn data_url_prefixes_are_stripped_before_upload() {
        assert_eq!(
            strip_data_url_prefix("data:image/png;base64,QUJD"),
            "QUJD"
        );
        assert_eq!(strip_data_url_prefix("QUJD"), "QUJD");
    }
}
