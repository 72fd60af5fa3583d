use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use blogsmith::basic_models::{ContentType, ImagePurpose, ReferenceImage};
use blogsmith::blog_prompt;
use blogsmith::image_prompt::{self, ImageOptions};

use crate::database::Database;
use crate::errors::{WebError, WebResult};
use crate::ingestion;
use crate::models::{
    GeneratedPost, ImagePrompt, ImagePromptUpdate, PostFilter, PostForUpload, PostUpdate, Prompt,
    PromptForUpload, SourceData, SourceDataFilter,
};
use crate::providers::{self, ImageJob};
use crate::storage::StorageClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    // The storage client authenticates lazily, on the first upload that
    // needs it.
    storage: Arc<tokio::sync::OnceCell<StorageClient>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            storage: Arc::new(tokio::sync::OnceCell::new()),
        }
    }

    async fn storage(&self) -> anyhow::Result<&StorageClient> {
        self.storage.get_or_try_init(StorageClient::new).await
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate_post))
        .route("/api/generate-image", post(generate_image))
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/:post_id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/source-data", get(list_source_data).post(create_source_data))
        .route("/api/source-data/:source_data_id", axum::routing::delete(delete_source_data))
        .route("/api/source-data/upload", post(upload_source_data_csv))
        .route("/api/source-data/by-number/:number", get(get_source_data_by_number))
        .route("/api/source-data/generated-status", get(generated_status))
        .route("/api/prompts", get(list_prompts).post(create_prompt))
        .route("/api/image-prompts", get(list_image_prompts))
        .route("/api/image-prompts/:image_prompt_id", put(update_image_prompt))
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    source_data_id: i64,
    content_type: ContentType,
    additional_request: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    content: String,
    title: String,
    source_data_id: i64,
    content_type: ContentType,
    additional_request: Option<String>,
    prompt_used: String,
    model_used: String,
    tokens_used: i64,
}

/// Draft a blog post from a source-data row. The result is returned for
/// review, not saved; `POST /api/posts` persists it.
async fn generate_post(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> WebResult<Json<GenerateResponse>> {
    // The source row must exist before any provider call is attempted.
    let source =
        SourceData::get_by_id(&state.db, request.source_data_id)?.ok_or(WebError::NotFound)?;

    let prompt = blog_prompt::build_prompt(
        &source.to_upload(),
        request.content_type,
        request.additional_request.as_deref(),
    );
    let model = request
        .model
        .unwrap_or_else(|| providers::DEFAULT_TEXT_MODEL.to_string());

    let draft = providers::generate_text(&prompt, &model).await.map_err(|error| {
        tracing::error!(%error, model, "text generation failed");
        WebError::Provider("Failed to generate blog post".into())
    })?;
    let title = providers::extract_title(&draft.content, &source.blog_topic);

    Ok(Json(GenerateResponse {
        content: draft.content,
        title,
        source_data_id: request.source_data_id,
        content_type: request.content_type,
        additional_request: request.additional_request,
        prompt_used: prompt,
        model_used: model,
        tokens_used: draft.tokens_used,
    }))
}

#[derive(Debug, Deserialize)]
struct ImageRequestItem {
    purpose: ImagePurpose,
    style: Option<String>,
    mood: Option<String>,
    #[serde(default, rename = "includeText")]
    include_text: bool,
    #[serde(rename = "textContent")]
    text_content: Option<String>,
    #[serde(rename = "additionalRequest")]
    additional_request: Option<String>,
    #[serde(rename = "referenceImage")]
    reference_image: Option<ReferenceImage>,
}

#[derive(Debug, Deserialize)]
struct MultiImageRequest {
    title: String,
    content: String,
    #[serde(rename = "referenceImage")]
    reference_image: Option<ReferenceImage>,
    images: Vec<ImageRequestItem>,
}

#[derive(Debug, Deserialize)]
struct SingleImageRequest {
    title: String,
    content: String,
    style: Option<String>,
    mood: Option<String>,
    #[serde(default, rename = "includeText")]
    include_text: bool,
    #[serde(rename = "textContent")]
    text_content: Option<String>,
    #[serde(rename = "additionalRequest")]
    additional_request: Option<String>,
    #[serde(rename = "referenceImage")]
    reference_image: Option<ReferenceImage>,
}

/// The two request shapes are decided once at the boundary: an `images`
/// field means the multi shape, and a body that then fails to parse is a
/// validation error, never a fallback into the single shape.
async fn generate_image(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> WebResult<axum::response::Response> {
    if body.get("images").is_some() {
        let request: MultiImageRequest = serde_json::from_value(body)
            .map_err(|_| WebError::Validation("Malformed image generation request".into()))?;
        generate_multiple_images(&state, request).await
    } else {
        let request: SingleImageRequest = serde_json::from_value(body)
            .map_err(|_| WebError::Validation("Malformed image generation request".into()))?;
        generate_single_image(&state, request).await
    }
}

async fn generate_single_image(
    state: &AppState,
    request: SingleImageRequest,
) -> WebResult<axum::response::Response> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(WebError::Validation("Content and title are required".into()));
    }
    let options = ImageOptions {
        purpose: ImagePurpose::Main,
        style: request.style,
        mood: request.mood,
        include_text: request.include_text,
        text_content: request.text_content,
        additional_request: request.additional_request,
        has_reference_image: request.reference_image.is_some(),
    };
    let snapshot = ImagePrompt::fragment_snapshot(&state.db)?;
    let prompt = image_prompt::compose(&request.title, &request.content, &options, &snapshot);
    let image = providers::generate_image(&prompt, request.reference_image.as_ref())
        .await
        .map_err(|error| {
            tracing::error!(%error, "image generation failed");
            WebError::Provider("Failed to generate image".into())
        })?
        .ok_or_else(|| WebError::Provider("Failed to generate image".into()))?;
    Ok(Json(image).into_response())
}

async fn generate_multiple_images(
    state: &AppState,
    request: MultiImageRequest,
) -> WebResult<axum::response::Response> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(WebError::Validation("Content and title are required".into()));
    }
    if request.images.is_empty() {
        return Err(WebError::Validation("At least one image must be requested".into()));
    }
    let jobs = request
        .images
        .into_iter()
        .map(|item| {
            // A per-image reference overrides the batch-wide default.
            let reference = item.reference_image.or_else(|| request.reference_image.clone());
            ImageJob {
                options: ImageOptions {
                    purpose: item.purpose,
                    style: item.style,
                    mood: item.mood,
                    include_text: item.include_text,
                    text_content: item.text_content,
                    additional_request: item.additional_request,
                    has_reference_image: reference.is_some(),
                },
                reference,
            }
        })
        .collect();
    let images = providers::generate_many(&state.db, &request.title, &request.content, jobs)
        .await
        .map_err(|error| {
            tracing::error!(%error, "multi-image generation failed");
            WebError::Provider("Failed to generate images".into())
        })?;
    Ok(Json(json!({ "images": images })).into_response())
}

#[derive(Debug, Serialize)]
struct PageEnvelope<T: Serialize> {
    data: Vec<T>,
    total: i64,
    page: i64,
    limit: i64,
    #[serde(rename = "totalPages")]
    total_pages: i64,
}

impl<T: Serialize> PageEnvelope<T> {
    fn new(data: Vec<T>, total: i64, page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(10).clamp(1, 100);
        Self {
            data,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> WebResult<impl IntoResponse> {
    let (posts, total) = GeneratedPost::list(&state.db, &filter)?;
    Ok(Json(PageEnvelope::new(posts, total, filter.page, filter.limit)))
}

#[derive(Debug, Deserialize)]
struct SubImagePayload {
    image_data: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PostCreateRequest {
    source_data_id: Option<i64>,
    title: String,
    content: String,
    content_type: Option<ContentType>,
    additional_request: Option<String>,
    prompt_used: Option<String>,
    model_used: String,
    tokens_used: Option<i64>,
    // Pre-uploaded URLs, the recommended path.
    image_url: Option<String>,
    sub_image_urls: Option<Vec<String>>,
    // Raw base64 payloads for server-side upload.
    image_data: Option<String>,
    image_mime_type: Option<String>,
    sub_images: Option<Vec<SubImagePayload>>,
}

/// Upload a base64 payload, degrading to `None` on failure: a lost image
/// never blocks saving the text content.
async fn upload_or_skip(
    state: &AppState,
    image_data: &str,
    mime_type: &str,
    purpose: &str,
) -> Option<String> {
    let storage = match state.storage().await {
        Ok(storage) => storage,
        Err(error) => {
            tracing::warn!(%error, purpose, "storage client unavailable, saving post without image");
            return None;
        }
    };
    match storage.upload_image(image_data, mime_type, purpose).await {
        Ok(url) => Some(url),
        Err(error) => {
            tracing::warn!(%error, purpose, "image upload failed, saving post without image");
            None
        }
    }
}

async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<PostCreateRequest>,
) -> WebResult<impl IntoResponse> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(WebError::Validation("Content and title are required".into()));
    }

    let mut image_url = request.image_url;
    if image_url.is_none() {
        if let (Some(data), Some(mime)) = (&request.image_data, &request.image_mime_type) {
            image_url = upload_or_skip(&state, data, mime, "main").await;
        }
    }

    let mut sub_image_urls = request.sub_image_urls.unwrap_or_default();
    if sub_image_urls.is_empty() {
        for (index, sub) in request.sub_images.unwrap_or_default().iter().enumerate() {
            let purpose = format!("sub{}", index + 1);
            if let Some(url) =
                upload_or_skip(&state, &sub.image_data, &sub.mime_type, &purpose).await
            {
                sub_image_urls.push(url);
            }
        }
    }

    let post_id = GeneratedPost::push(
        &state.db,
        &PostForUpload {
            source_data_id: request.source_data_id,
            title: request.title,
            content: request.content,
            content_type: request.content_type,
            additional_request: request.additional_request,
            prompt_used: request.prompt_used,
            model_used: request.model_used,
            tokens_used: request.tokens_used,
            image_url,
            sub_image_urls,
        },
    )?;
    let post = GeneratedPost::get_by_id(&state.db, post_id)?.ok_or(WebError::NotFound)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> WebResult<Json<GeneratedPost>> {
    let post = GeneratedPost::get_by_id(&state.db, post_id)?.ok_or(WebError::NotFound)?;
    Ok(Json(post))
}

async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(update): Json<PostUpdate>,
) -> WebResult<Json<GeneratedPost>> {
    let post = GeneratedPost::update(&state.db, post_id, &update)?.ok_or(WebError::NotFound)?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> WebResult<StatusCode> {
    if GeneratedPost::delete(&state.db, post_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(WebError::NotFound)
    }
}

async fn list_source_data(
    State(state): State<AppState>,
    Query(filter): Query<SourceDataFilter>,
) -> WebResult<impl IntoResponse> {
    let (rows, total) = SourceData::list(&state.db, &filter)?;
    Ok(Json(PageEnvelope::new(rows, total, filter.page, filter.limit)))
}

async fn create_source_data(
    State(state): State<AppState>,
    Json(upload): Json<blogsmith::basic_models::SourceDataForUpload>,
) -> WebResult<impl IntoResponse> {
    if upload.number <= 0 {
        return Err(WebError::Validation("number must be positive".into()));
    }
    let id = SourceData::push(&state.db, &upload)?;
    let row = SourceData::get_by_id(&state.db, id)?.ok_or(WebError::NotFound)?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn delete_source_data(
    State(state): State<AppState>,
    Path(source_data_id): Path<i64>,
) -> WebResult<StatusCode> {
    if SourceData::delete(&state.db, source_data_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(WebError::NotFound)
    }
}

/// Bulk-import source data from an uploaded CSV file. Invalid rows are
/// dropped; the response only carries the imported/total accounting.
async fn upload_source_data_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> WebResult<impl IntoResponse> {
    let mut file_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| WebError::Validation("Malformed multipart body".into()))?
    {
        if field.name() == Some("file") {
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|_| WebError::Validation("Could not read uploaded file".into()))?,
            );
        }
    }
    let file_bytes = file_bytes.ok_or(WebError::Validation("No file uploaded".into()))?;

    let (valid, total) = ingestion::parse_source_data_csv(&file_bytes);
    if valid.is_empty() {
        return Err(WebError::Validation("No valid data found in CSV".into()));
    }
    let imported = valid.len();
    for upload in &valid {
        SourceData::push(&state.db, upload)?;
    }
    Ok(Json(json!({
        "success": true,
        "imported": imported,
        "total": total,
    })))
}

async fn get_source_data_by_number(
    State(state): State<AppState>,
    Path(number): Path<i64>,
) -> WebResult<Json<SourceData>> {
    let row = SourceData::get_by_number(&state.db, number)?.ok_or(WebError::NotFound)?;
    Ok(Json(row))
}

/// The distinct set of source-data ids that already have a generated post.
async fn generated_status(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    let ids = SourceData::generated_ids(&state.db)?;
    Ok(Json(json!({
        "count": ids.len(),
        "generated_ids": ids,
    })))
}

async fn list_prompts(State(state): State<AppState>) -> WebResult<Json<Vec<Prompt>>> {
    Ok(Json(Prompt::list(&state.db)?))
}

async fn create_prompt(
    State(state): State<AppState>,
    Json(upload): Json<PromptForUpload>,
) -> WebResult<impl IntoResponse> {
    if upload.name.trim().is_empty() {
        return Err(WebError::Validation("name is required".into()));
    }
    let id = Prompt::push(&state.db, &upload)?;
    let prompt = Prompt::get_by_id(&state.db, id)?.ok_or(WebError::NotFound)?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

async fn list_image_prompts(State(state): State<AppState>) -> WebResult<Json<Vec<ImagePrompt>>> {
    Ok(Json(ImagePrompt::list(&state.db)?))
}

async fn update_image_prompt(
    State(state): State<AppState>,
    Path(image_prompt_id): Path<i64>,
    Json(update): Json<ImagePromptUpdate>,
) -> WebResult<Json<ImagePrompt>> {
    let row =
        ImagePrompt::update(&state.db, image_prompt_id, &update)?.ok_or(WebError::NotFound)?;
    Ok(Json(row))
}
