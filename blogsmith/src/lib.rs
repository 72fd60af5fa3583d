pub mod basic_models;
pub mod blog_prompt;
pub mod image_prompt;
