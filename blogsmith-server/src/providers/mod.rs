pub mod image;
pub mod text;

pub use image::{generate_image, generate_many, GeneratedImage, GeneratedPurposeImage, ImageJob};
pub use text::{extract_title, generate_text, BlogDraft, DEFAULT_TEXT_MODEL};
