//! Resolves prompt fragments for image generation and composes the full
//! natural-language prompt sent to the image model.
//!
//! Fragments live in the `image_prompts` table so editors can tune them
//! without a deploy; every fragment the composer needs also has a hardcoded
//! default, so resolution never fails even against an empty snapshot. The
//! snapshot is re-read per request on purpose: edits must take effect on the
//! very next generation call.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::basic_models::ImagePurpose;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImagePromptCategory {
    Style,
    Mood,
    Purpose,
    Text,
    Template,
}

/// One row of the `image_prompts` table, as the composer sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptFragmentRow {
    pub category: ImagePromptCategory,
    pub key: String,
    pub prompt: String,
    pub is_active: bool,
}

/// The `purpose` category stores its fragment as JSON with these two fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposePrompt {
    pub role: String,
    #[serde(rename = "focusDescription")]
    pub focus_description: String,
}

pub const DEFAULT_STYLE_KEY: &str = "realistic";
pub const DEFAULT_MOOD_KEY: &str = "professional";

pub const STYLE_KEYS: [&str; 5] = ["realistic", "illustration", "minimal", "3d", "watercolor"];
pub const MOOD_KEYS: [&str; 5] = [
    "professional",
    "friendly",
    "creative",
    "luxurious",
    "bright",
];
pub const TEXT_KEYS: [&str; 2] = ["include", "exclude"];

fn default_style_fragment(key: &str) -> &'static str {
    match key {
        "illustration" => "a flat, hand-drawn illustration style with clean linework",
        "minimal" => "a minimal, uncluttered style with generous negative space",
        "3d" => "a polished 3D-rendered style with soft global lighting",
        "watercolor" => "a soft watercolor painting style with gentle color bleeds",
        // "realistic" and any unknown key share the base default
        _ => "a realistic, photographic style with natural lighting",
    }
}

fn default_mood_fragment(key: &str) -> &'static str {
    match key {
        "friendly" => "a warm, friendly and approachable mood",
        "creative" => "a playful, imaginative and creative mood",
        "luxurious" => "an elegant, premium and luxurious mood",
        "bright" => "a bright, energetic and optimistic mood",
        _ => "a clean, modern and professional mood",
    }
}

fn default_purpose_prompt(purpose: ImagePurpose) -> PurposePrompt {
    let (role, focus) = match purpose {
        ImagePurpose::Main => (
            "thumbnail or header image",
            "the core topic of the entire blog post",
        ),
        ImagePurpose::Sub1 => (
            "supporting in-article illustration",
            "the first key point developed in the body",
        ),
        ImagePurpose::Sub2 => (
            "supporting in-article illustration",
            "the second key point developed in the body",
        ),
        ImagePurpose::Sub3 => (
            "supporting in-article illustration",
            "the closing takeaway of the post",
        ),
    };
    PurposePrompt {
        role: role.to_string(),
        focus_description: focus.to_string(),
    }
}

fn default_text_fragment(key: &str) -> &'static str {
    match key {
        "include" => "Render the following text prominently and legibly in the image: \"{TEXT}\"",
        _ => "Include minimal or no text in the image itself",
    }
}

const REFERENCE_IMAGE_INSTRUCTIONS: &str = "\
A reference image is attached to this request. Use it as follows:
- Take style and composition inspiration from the reference image
- If the reference shows a product, incorporate that product naturally into the scene
- Keep the final image cohesive with the reference's overall look and feel";

/// Find the first active snapshot row matching `(category, key)`, falling
/// back to the hardcoded default fragment. Always returns a non-empty
/// fragment.
pub fn resolve(category: ImagePromptCategory, key: &str, rows: &[PromptFragmentRow]) -> String {
    if let Some(row) = find_active(category, key, rows) {
        return row.prompt.clone();
    }
    match category {
        ImagePromptCategory::Style => default_style_fragment(key).to_string(),
        ImagePromptCategory::Mood => default_mood_fragment(key).to_string(),
        ImagePromptCategory::Text => default_text_fragment(key).to_string(),
        // Purpose fragments are JSON; callers use resolve_purpose instead,
        // but the raw form still has total coverage.
        ImagePromptCategory::Purpose => {
            serde_json::to_string(&default_purpose_prompt(purpose_from_key(key))).unwrap_or_default()
        }
        // The template category has no hardcoded body: its absence selects
        // the fixed composition path instead.
        ImagePromptCategory::Template => String::new(),
    }
}

fn find_active<'a>(
    category: ImagePromptCategory,
    key: &str,
    rows: &'a [PromptFragmentRow],
) -> Option<&'a PromptFragmentRow> {
    rows.iter()
        .find(|r| r.is_active && r.category == category && r.key == key && !r.prompt.trim().is_empty())
}

fn purpose_from_key(key: &str) -> ImagePurpose {
    key.parse().unwrap_or(ImagePurpose::Main)
}

/// Resolve the purpose fragment, parsing a database override as JSON. A
/// malformed or incomplete override falls back to the hardcoded default and
/// is only logged, never surfaced.
pub fn resolve_purpose(purpose: ImagePurpose, rows: &[PromptFragmentRow]) -> PurposePrompt {
    let key: &'static str = purpose.into();
    if let Some(row) = find_active(ImagePromptCategory::Purpose, key, rows) {
        match serde_json::from_str::<PurposePrompt>(&row.prompt) {
            Ok(parsed) if !parsed.role.is_empty() && !parsed.focus_description.is_empty() => {
                return parsed;
            }
            Ok(_) => {
                tracing::warn!(key, "purpose prompt override has empty fields, using default");
            }
            Err(error) => {
                tracing::warn!(key, %error, "purpose prompt override is not valid JSON, using default");
            }
        }
    }
    default_purpose_prompt(purpose)
}

/// Caller-tunable knobs for one image generation.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub purpose: ImagePurpose,
    pub style: Option<String>,
    pub mood: Option<String>,
    pub include_text: bool,
    pub text_content: Option<String>,
    pub additional_request: Option<String>,
    pub has_reference_image: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            purpose: ImagePurpose::Main,
            style: None,
            mood: None,
            include_text: false,
            text_content: None,
            additional_request: None,
            has_reference_image: false,
        }
    }
}

/// Hard cap on how much of the blog body reaches the image prompt.
const EXCERPT_CHARS: usize = 500;

/// Assemble the full image-generation prompt. A `template/default` row in
/// the snapshot acts as a mail-merge template; otherwise the fixed
/// composition is used. Either way the result is whitespace-trimmed.
pub fn compose(
    title: &str,
    content: &str,
    options: &ImageOptions,
    rows: &[PromptFragmentRow],
) -> String {
    let excerpt: String = content.chars().take(EXCERPT_CHARS).collect();

    let style_key = options.style.as_deref().unwrap_or(DEFAULT_STYLE_KEY);
    let mood_key = options.mood.as_deref().unwrap_or(DEFAULT_MOOD_KEY);
    let style = resolve(ImagePromptCategory::Style, style_key, rows);
    let mood = resolve(ImagePromptCategory::Mood, mood_key, rows);
    let purpose = resolve_purpose(options.purpose, rows);

    let text_content = options.text_content.as_deref().unwrap_or("").trim();
    let text_prompt = if options.include_text && !text_content.is_empty() {
        resolve(ImagePromptCategory::Text, "include", rows).replace("{TEXT}", text_content)
    } else {
        resolve(ImagePromptCategory::Text, "exclude", rows)
    };

    let reference = if options.has_reference_image {
        REFERENCE_IMAGE_INSTRUCTIONS
    } else {
        ""
    };
    let additional = options.additional_request.as_deref().unwrap_or("").trim();

    if let Some(template) = find_active(ImagePromptCategory::Template, "default", rows) {
        return template
            .prompt
            .replace("{{STYLE}}", &style)
            .replace("{{MOOD}}", &mood)
            .replace("{{PURPOSE_ROLE}}", &purpose.role)
            .replace("{{PURPOSE_FOCUS}}", &purpose.focus_description)
            .replace("{{TEXT_PROMPT}}", &text_prompt)
            .replace("{{TITLE}}", title)
            .replace("{{EXCERPT}}", &excerpt)
            .replace("{{ADDITIONAL}}", additional)
            .replace("{{REFERENCE_IMAGE}}", reference)
            .replace("{{IS_MAIN}}", if options.purpose.is_main() { "true" } else { "false" })
            .trim()
            .to_string();
    }

    let mut prompt = format!(
        "Create a professional, high-quality blog {} based on the following Korean blog content.\n\
         Focus on: {}\n\n\
         Title: {}\n\n\
         Content Summary:\n{}\n\n\
         Style: {}\n\
         Mood: {}\n",
        purpose.role, purpose.focus_description, title, excerpt, style, mood
    );
    if !reference.is_empty() {
        prompt.push('\n');
        prompt.push_str(reference);
        prompt.push('\n');
    }
    prompt.push('\n');
    prompt.push_str(&text_prompt);
    prompt.push('\n');
    if !additional.is_empty() {
        prompt.push_str(&format!("\nAdditional request: {}\n", additional));
    }
    prompt.push_str(
        "\nRequirements:\n\
         - The image should visually represent the main topic of the blog post\n\
         - Use a color palette that is pleasing and professional\n\
         - The style should be suitable for Korean blog audiences\n\
         - Focus on visual elements that convey the blog's subject matter\n\
         - Maintain high visual quality and clarity\n\
         - Avoid cluttered or overly complex compositions\n",
    );
    prompt.push_str(&format!(
        "\nGenerate an image that would make an excellent {} for this content.",
        purpose.role
    ));

    prompt.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        category: ImagePromptCategory,
        key: &str,
        prompt: &str,
        is_active: bool,
    ) -> PromptFragmentRow {
        PromptFragmentRow {
            category,
            key: key.to_string(),
            prompt: prompt.to_string(),
            is_active,
        }
    }

    #[test]
    fn fallback_coverage_is_total_on_empty_snapshot() {
        for key in STYLE_KEYS {
            assert!(!resolve(ImagePromptCategory::Style, key, &[]).is_empty());
        }
        for key in MOOD_KEYS {
            assert!(!resolve(ImagePromptCategory::Mood, key, &[]).is_empty());
        }
        for key in TEXT_KEYS {
            assert!(!resolve(ImagePromptCategory::Text, key, &[]).is_empty());
        }
        for purpose in [
            ImagePurpose::Main,
            ImagePurpose::Sub1,
            ImagePurpose::Sub2,
            ImagePurpose::Sub3,
        ] {
            let resolved = resolve_purpose(purpose, &[]);
            assert!(!resolved.role.is_empty());
            assert!(!resolved.focus_description.is_empty());
        }
        // Unknown keys still resolve to the category base default.
        assert!(!resolve(ImagePromptCategory::Style, "vaporwave", &[]).is_empty());
    }

    #[test]
    fn active_db_row_overrides_default() {
        let rows = vec![
            row(ImagePromptCategory::Style, "realistic", "shot on 35mm film", true),
            row(ImagePromptCategory::Mood, "professional", "boardroom calm", false),
        ];
        assert_eq!(
            resolve(ImagePromptCategory::Style, "realistic", &rows),
            "shot on 35mm film"
        );
        // Inactive rows do not participate in resolution.
        assert_ne!(
            resolve(ImagePromptCategory::Mood, "professional", &rows),
            "boardroom calm"
        );
    }

    #[test]
    fn purpose_override_round_trips_valid_json() {
        let rows = vec![row(
            ImagePromptCategory::Purpose,
            "main",
            r#"{"role":"hero banner","focusDescription":"the product itself"}"#,
            true,
        )];
        let purpose = resolve_purpose(ImagePurpose::Main, &rows);
        assert_eq!(purpose.role, "hero banner");
        assert_eq!(purpose.focus_description, "the product itself");
    }

    #[test]
    fn malformed_purpose_override_falls_back_without_panicking() {
        let rows = vec![
            row(ImagePromptCategory::Purpose, "main", "not json at all", true),
            row(ImagePromptCategory::Purpose, "sub1", r#"{"role":"x"}"#, true),
        ];
        assert_eq!(
            resolve_purpose(ImagePurpose::Main, &rows),
            default_purpose_prompt(ImagePurpose::Main)
        );
        // Missing focusDescription is just as invalid as broken JSON.
        assert_eq!(
            resolve_purpose(ImagePurpose::Sub1, &rows),
            default_purpose_prompt(ImagePurpose::Sub1)
        );
    }

    #[test]
    fn excerpt_is_hard_truncated_at_500_chars() {
        let content: String = "가".repeat(480) + &"b".repeat(100);
        let prompt = compose("제목", &content, &ImageOptions::default(), &[]);
        let expected: String = content.chars().take(500).collect();
        assert!(prompt.contains(&expected));
        let too_long: String = content.chars().take(501).collect();
        assert!(!prompt.contains(&too_long));
    }

    #[test]
    fn short_content_is_used_verbatim() {
        let prompt = compose("제목", "짧은 본문", &ImageOptions::default(), &[]);
        assert!(prompt.contains("짧은 본문"));
    }

    #[test]
    fn template_override_substitutes_every_occurrence() {
        let rows = vec![row(
            ImagePromptCategory::Template,
            "default",
            "{{TITLE}} / {{STYLE}} / again {{TITLE}} (main={{IS_MAIN}})",
            true,
        )];
        let options = ImageOptions {
            purpose: ImagePurpose::Sub2,
            ..Default::default()
        };
        let prompt = compose("My Post", "body", &options, &rows);
        assert_eq!(prompt.matches("My Post").count(), 2);
        assert!(prompt.contains("(main=false)"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn reference_instructions_appear_only_when_requested() {
        let with_reference = compose(
            "t",
            "c",
            &ImageOptions {
                has_reference_image: true,
                ..Default::default()
            },
            &[],
        );
        let without = compose("t", "c", &ImageOptions::default(), &[]);
        assert!(with_reference.contains("reference image is attached"));
        assert!(!without.contains("reference image is attached"));
    }

    #[test]
    fn text_inclusion_requires_both_flag_and_content() {
        let base = ImageOptions::default();
        let with_text = compose(
            "t",
            "c",
            &ImageOptions {
                include_text: true,
                text_content: Some("SALE 50%".into()),
                ..base.clone()
            },
            &[],
        );
        assert!(with_text.contains("\"SALE 50%\""));

        let flag_without_content = compose(
            "t",
            "c",
            &ImageOptions {
                include_text: true,
                text_content: Some("   ".into()),
                ..base.clone()
            },
            &[],
        );
        assert!(flag_without_content.contains("minimal or no text"));
    }

    #[test]
    fn composed_prompt_is_trimmed() {
        let prompt = compose("t", "c", &ImageOptions::default(), &[]);
        assert_eq!(prompt, prompt.trim());
        assert!(!prompt.is_empty());
    }
}
