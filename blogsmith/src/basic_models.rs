use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// The kind of blog article to generate. The prompt composer maps each
/// variant to a one-line Korean description.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentType {
    Informational,
    Review,
    Tutorial,
    Comparison,
    Listicle,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

/// Which slot a generated image fills: the main thumbnail or one of up to
/// three in-article sub images.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImagePurpose {
    Main,
    Sub1,
    Sub2,
    Sub3,
}

impl ImagePurpose {
    pub fn is_main(&self) -> bool {
        matches!(self, ImagePurpose::Main)
    }
}

/// A caller-supplied reference image. It only lives for the duration of one
/// generation call and is never persisted.
#[derive(Deserialize, Serialize, Clone)]
pub struct ReferenceImage {
    /// Base64-encoded image bytes, optionally with a data-URL prefix.
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl std::fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("data", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A source-data row as it arrives from manual entry or CSV import, before
/// it has an id or timestamps.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceDataForUpload {
    pub number: i64,
    pub category_large: String,
    pub category_medium: String,
    pub category_small: Option<String>,
    pub core_keyword: String,
    pub seo_keywords: Vec<String>,
    pub blog_topic: String,
}
