use crate::database::{Database, FromRow};
use anyhow::Result;
use blogsmith::basic_models::{ContentType, PostStatus, SourceDataForUpload};
use blogsmith::image_prompt::{self, ImagePromptCategory, PromptFragmentRow};
use rusqlite::params;
use serde::{Deserialize, Serialize};

pub fn sqlite_current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Clamp page/limit to sane values and return (page, limit, offset).
fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).clamp(1, 100);
    (page, limit, (page - 1) * limit)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceData {
    pub source_data_id: i64,
    pub number: i64,
    pub category_large: String,
    pub category_medium: String,
    pub category_small: Option<String>,
    pub core_keyword: String,
    pub seo_keywords: Vec<String>,
    pub blog_topic: String,
    pub created_on: String,
    pub updated_on: String,
}

impl FromRow for SourceData {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let seo_keywords: String = row.get("seo_keywords")?;
        Ok(Self {
            source_data_id: row.get("source_data_id")?,
            number: row.get("number")?,
            category_large: row.get("category_large")?,
            category_medium: row.get("category_medium")?,
            category_small: row.get("category_small")?,
            core_keyword: row.get("core_keyword")?,
            seo_keywords: serde_json::from_str(&seo_keywords).unwrap_or_default(),
            blog_topic: row.get("blog_topic")?,
            created_on: row.get("created_on")?,
            updated_on: row.get("updated_on")?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceDataFilter {
    pub search: Option<String>,
    pub category_large: Option<String>,
    pub category_medium: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SourceData {
    /// The fields the blog prompt composer needs.
    pub fn to_upload(&self) -> SourceDataForUpload {
        SourceDataForUpload {
            number: self.number,
            category_large: self.category_large.clone(),
            category_medium: self.category_medium.clone(),
            category_small: self.category_small.clone(),
            core_keyword: self.core_keyword.clone(),
            seo_keywords: self.seo_keywords.clone(),
            blog_topic: self.blog_topic.clone(),
        }
    }

    pub fn list(db: &Database, filter: &SourceDataFilter) -> Result<(Vec<SourceData>, i64)> {
        let (_, limit, offset) = page_window(filter.page, filter.limit);
        let predicate = "
            (?1 IS NULL OR blog_topic LIKE '%'||?1||'%' OR core_keyword LIKE '%'||?1||'%')
            AND (?2 IS NULL OR category_large = ?2)
            AND (?3 IS NULL OR category_medium = ?3)";
        let rows = db.collect_rows(
            &format!(
                "SELECT * FROM source_data WHERE {} ORDER BY number ASC LIMIT ?4 OFFSET ?5",
                predicate
            ),
            params![
                filter.search,
                filter.category_large,
                filter.category_medium,
                limit,
                offset
            ],
        )?;
        let total = db.count_rows(
            &format!("SELECT COUNT(*) FROM source_data WHERE {}", predicate),
            params![filter.search, filter.category_large, filter.category_medium],
        )?;
        Ok((rows, total))
    }

    pub fn get_by_id(db: &Database, source_data_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows(
                "SELECT * FROM source_data WHERE source_data_id = ?",
                params![source_data_id],
            )?
            .pop())
    }

    pub fn get_by_number(db: &Database, number: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows("SELECT * FROM source_data WHERE number = ?", params![number])?
            .pop())
    }

    /// Insert or update a row keyed on its sequential number.
    pub fn push(db: &Database, upload: &SourceDataForUpload) -> Result<i64> {
        let conn = db.pool.get()?;
        let now = sqlite_current_timestamp();
        conn.execute(
            "INSERT INTO source_data
                (number, category_large, category_medium, category_small,
                 core_keyword, seo_keywords, blog_topic, created_on, updated_on)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (number) DO UPDATE SET
                category_large = excluded.category_large,
                category_medium = excluded.category_medium,
                category_small = excluded.category_small,
                core_keyword = excluded.core_keyword,
                seo_keywords = excluded.seo_keywords,
                blog_topic = excluded.blog_topic,
                updated_on = excluded.updated_on",
            params![
                upload.number,
                upload.category_large,
                upload.category_medium,
                upload.category_small,
                upload.core_keyword,
                serde_json::to_string(&upload.seo_keywords)?,
                upload.blog_topic,
                now,
                now,
            ],
        )?;
        let id: i64 = conn.query_row(
            "SELECT source_data_id FROM source_data WHERE number = ?",
            params![upload.number],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn delete(db: &Database, source_data_id: i64) -> Result<bool> {
        let conn = db.pool.get()?;
        let affected = conn.execute(
            "DELETE FROM source_data WHERE source_data_id = ?",
            params![source_data_id],
        )?;
        Ok(affected > 0)
    }

    /// The distinct set of source-data ids already referenced by a post.
    pub fn generated_ids(db: &Database) -> Result<Vec<i64>> {
        let conn = db.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT source_data_id FROM generated_posts
             WHERE source_data_id IS NOT NULL
             ORDER BY source_data_id",
        )?;
        let ids = stmt
            .query_map(params![], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratedPost {
    pub post_id: i64,
    pub source_data_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub content_type: Option<ContentType>,
    pub additional_request: Option<String>,
    pub prompt_used: Option<String>,
    pub model_used: String,
    pub tokens_used: Option<i64>,
    pub status: PostStatus,
    pub image_url: Option<String>,
    pub sub_image_urls: Option<Vec<String>>,
    pub created_on: String,
    pub updated_on: String,
}

impl FromRow for GeneratedPost {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let content_type: Option<String> = row.get("content_type")?;
        let status: String = row.get("status")?;
        let sub_image_urls: Option<String> = row.get("sub_image_urls")?;
        Ok(Self {
            post_id: row.get("post_id")?,
            source_data_id: row.get("source_data_id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            content_type: content_type.and_then(|t| t.parse().ok()),
            additional_request: row.get("additional_request")?,
            prompt_used: row.get("prompt_used")?,
            model_used: row.get("model_used")?,
            tokens_used: row.get("tokens_used")?,
            status: status.parse().unwrap_or(PostStatus::Draft),
            image_url: row.get("image_url")?,
            sub_image_urls: sub_image_urls.and_then(|s| serde_json::from_str(&s).ok()),
            created_on: row.get("created_on")?,
            updated_on: row.get("updated_on")?,
        })
    }
}

/// A post joined with the source data it was generated from.
#[derive(Debug, Serialize)]
pub struct PostWithSource {
    #[serde(flatten)]
    pub post: GeneratedPost,
    pub source_data: Option<SourceData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub content_type: Option<ContentType>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// The fields of a new post record. Image URLs are already resolved by the
/// time this reaches the database.
#[derive(Debug, Clone)]
pub struct PostForUpload {
    pub source_data_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub content_type: Option<ContentType>,
    pub additional_request: Option<String>,
    pub prompt_used: Option<String>,
    pub model_used: String,
    pub tokens_used: Option<i64>,
    pub image_url: Option<String>,
    pub sub_image_urls: Vec<String>,
}

/// Editable fields of an existing post.
#[derive(Debug, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
}

impl GeneratedPost {
    pub fn list(db: &Database, filter: &PostFilter) -> Result<(Vec<PostWithSource>, i64)> {
        let (_, limit, offset) = page_window(filter.page, filter.limit);
        let predicate = "
            (?1 IS NULL OR status = ?1)
            AND (?2 IS NULL OR content_type = ?2)
            AND (?3 IS NULL OR title LIKE '%'||?3||'%' OR content LIKE '%'||?3||'%')";
        let status = filter.status.map(|s| s.to_string());
        let content_type = filter.content_type.map(|c| c.to_string());
        let posts: Vec<GeneratedPost> = db.collect_rows(
            &format!(
                "SELECT * FROM generated_posts WHERE {}
                 ORDER BY created_on DESC, post_id DESC LIMIT ?4 OFFSET ?5",
                predicate
            ),
            params![status, content_type, filter.search, limit, offset],
        )?;
        let total = db.count_rows(
            &format!("SELECT COUNT(*) FROM generated_posts WHERE {}", predicate),
            params![status, content_type, filter.search],
        )?;
        let joined = posts
            .into_iter()
            .map(|post| {
                let source_data = match post.source_data_id {
                    Some(id) => SourceData::get_by_id(db, id)?,
                    None => None,
                };
                Ok(PostWithSource { post, source_data })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((joined, total))
    }

    pub fn get_by_id(db: &Database, post_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows(
                "SELECT * FROM generated_posts WHERE post_id = ?",
                params![post_id],
            )?
            .pop())
    }

    pub fn push(db: &Database, upload: &PostForUpload) -> Result<i64> {
        let conn = db.pool.get()?;
        let now = sqlite_current_timestamp();
        let sub_image_urls = if upload.sub_image_urls.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&upload.sub_image_urls)?)
        };
        conn.execute(
            "INSERT INTO generated_posts
                (source_data_id, title, content, content_type, additional_request,
                 prompt_used, model_used, tokens_used, status, image_url,
                 sub_image_urls, created_on, updated_on)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?, ?, ?)",
            params![
                upload.source_data_id,
                upload.title,
                upload.content,
                upload.content_type.map(|c| c.to_string()),
                upload.additional_request,
                upload.prompt_used,
                upload.model_used,
                upload.tokens_used,
                upload.image_url,
                sub_image_urls,
                now,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(db: &Database, post_id: i64, update: &PostUpdate) -> Result<Option<Self>> {
        let conn = db.pool.get()?;
        let affected = conn.execute(
            "UPDATE generated_posts SET
                title = COALESCE(?2, title),
                content = COALESCE(?3, content),
                status = COALESCE(?4, status),
                updated_on = ?5
             WHERE post_id = ?1",
            params![
                post_id,
                update.title,
                update.content,
                update.status.map(|s| s.to_string()),
                sqlite_current_timestamp(),
            ],
        )?;
        drop(conn);
        if affected == 0 {
            return Ok(None);
        }
        Self::get_by_id(db, post_id)
    }

    /// Delete a post row. Blob objects referenced by its URLs are left in
    /// place; orphaned images are an accepted limitation.
    pub fn delete(db: &Database, post_id: i64) -> Result<bool> {
        let conn = db.pool.get()?;
        let affected = conn.execute(
            "DELETE FROM generated_posts WHERE post_id = ?",
            params![post_id],
        )?;
        Ok(affected > 0)
    }
}

/// A named blog prompt template, CRUD-managed per content type.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Prompt {
    pub prompt_id: i64,
    pub name: String,
    pub content_type: ContentType,
    pub template: String,
    pub is_default: bool,
    pub created_on: String,
    pub updated_on: String,
}

impl FromRow for Prompt {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let content_type: String = row.get("content_type")?;
        Ok(Self {
            prompt_id: row.get("prompt_id")?,
            name: row.get("name")?,
            content_type: content_type
                .parse()
                .unwrap_or(ContentType::Informational),
            template: row.get("template")?,
            is_default: row.get("is_default")?,
            created_on: row.get("created_on")?,
            updated_on: row.get("updated_on")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptForUpload {
    pub name: String,
    pub content_type: ContentType,
    pub template: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Prompt {
    pub fn list(db: &Database) -> Result<Vec<Prompt>> {
        db.collect_rows(
            "SELECT * FROM prompts ORDER BY created_on DESC, prompt_id DESC",
            params![],
        )
    }

    pub fn get_by_id(db: &Database, prompt_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows("SELECT * FROM prompts WHERE prompt_id = ?", params![prompt_id])?
            .pop())
    }

    /// Insert a template. Marking it default clears any previous default for
    /// the same content type in the same transaction, so at most one default
    /// survives per type even under concurrent inserts.
    pub fn push(db: &Database, upload: &PromptForUpload) -> Result<i64> {
        let mut conn = db.pool.get()?;
        let tx = conn.transaction()?;
        if upload.is_default {
            tx.execute(
                "UPDATE prompts SET is_default = 0 WHERE content_type = ?",
                params![upload.content_type.to_string()],
            )?;
        }
        let now = sqlite_current_timestamp();
        tx.execute(
            "INSERT INTO prompts (name, content_type, template, is_default, created_on, updated_on)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                upload.name,
                upload.content_type.to_string(),
                upload.template,
                upload.is_default,
                now,
                now,
            ],
        )?;
        let prompt_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(prompt_id)
    }
}

/// An editable image prompt fragment row.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImagePrompt {
    pub image_prompt_id: i64,
    pub category: ImagePromptCategory,
    pub key: String,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    pub created_on: String,
    pub updated_on: String,
}

impl FromRow for ImagePrompt {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let category: String = row.get("category")?;
        Ok(Self {
            image_prompt_id: row.get("image_prompt_id")?,
            category: category.parse().unwrap_or(ImagePromptCategory::Style),
            key: row.get("key")?,
            name: row.get("name")?,
            prompt: row.get("prompt")?,
            is_active: row.get("is_active")?,
            created_on: row.get("created_on")?,
            updated_on: row.get("updated_on")?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImagePromptUpdate {
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub is_active: Option<bool>,
}

impl ImagePrompt {
    pub fn list(db: &Database) -> Result<Vec<ImagePrompt>> {
        db.collect_rows(
            "SELECT * FROM image_prompts ORDER BY category ASC, key ASC",
            params![],
        )
    }

    pub fn update(
        db: &Database,
        image_prompt_id: i64,
        update: &ImagePromptUpdate,
    ) -> Result<Option<Self>> {
        let conn = db.pool.get()?;
        let affected = conn.execute(
            "UPDATE image_prompts SET
                name = COALESCE(?2, name),
                prompt = COALESCE(?3, prompt),
                is_active = COALESCE(?4, is_active),
                updated_on = ?5
             WHERE image_prompt_id = ?1",
            params![
                image_prompt_id,
                update.name,
                update.prompt,
                update.is_active,
                sqlite_current_timestamp(),
            ],
        )?;
        drop(conn);
        if affected == 0 {
            return Ok(None);
        }
        Ok(db
            .collect_rows(
                "SELECT * FROM image_prompts WHERE image_prompt_id = ?",
                params![image_prompt_id],
            )?
            .pop())
    }

    /// The fragment snapshot the composer consumes. Re-read per generation
    /// request so edits take effect immediately.
    pub fn fragment_snapshot(db: &Database) -> Result<Vec<PromptFragmentRow>> {
        Ok(Self::list(db)?
            .into_iter()
            .map(|row| PromptFragmentRow {
                category: row.category,
                key: row.key,
                prompt: row.prompt,
                is_active: row.is_active,
            })
            .collect())
    }

    /// Seed one editable row per known fragment, keeping whatever an editor
    /// has already saved.
    pub fn seed_defaults(db: &Database) -> Result<()> {
        let conn = db.pool.get()?;
        let now = sqlite_current_timestamp();
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO image_prompts
                (category, key, name, prompt, is_active, created_on, updated_on)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;

        let style_names = [
            ("realistic", "사실적"),
            ("illustration", "일러스트"),
            ("minimal", "미니멀"),
            ("3d", "3D"),
            ("watercolor", "수채화"),
        ];
        let mood_names = [
            ("professional", "전문적"),
            ("friendly", "친근한"),
            ("creative", "창의적"),
            ("luxurious", "고급스러운"),
            ("bright", "밝은"),
        ];
        let purpose_names = [
            ("main", "메인 이미지"),
            ("sub1", "서브 이미지 1"),
            ("sub2", "서브 이미지 2"),
            ("sub3", "서브 이미지 3"),
        ];
        let text_names = [("include", "텍스트 포함"), ("exclude", "텍스트 최소화")];

        let mut seed = |category: ImagePromptCategory, key: &str, name: &str, prompt: &str, active: bool| {
            stmt.execute(params![category.to_string(), key, name, prompt, active, now, now])
                .map(|_| ())
        };
        for (key, name) in style_names {
            seed(
                ImagePromptCategory::Style,
                key,
                name,
                &image_prompt::resolve(ImagePromptCategory::Style, key, &[]),
                true,
            )?;
        }
        for (key, name) in mood_names {
            seed(
                ImagePromptCategory::Mood,
                key,
                name,
                &image_prompt::resolve(ImagePromptCategory::Mood, key, &[]),
                true,
            )?;
        }
        for (key, name) in purpose_names {
            seed(
                ImagePromptCategory::Purpose,
                key,
                name,
                &image_prompt::resolve(ImagePromptCategory::Purpose, key, &[]),
                true,
            )?;
        }
        for (key, name) in text_names {
            seed(
                ImagePromptCategory::Text,
                key,
                name,
                &image_prompt::resolve(ImagePromptCategory::Text, key, &[]),
                true,
            )?;
        }
        // An empty, inactive template row: filling it in switches generation
        // from the fixed composition to the mail-merge template.
        seed(ImagePromptCategory::Template, "default", "기본 템플릿", "", false)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::connect_in_memory().expect("in-memory database")
    }

    fn sample_upload(number: i64) -> SourceDataForUpload {
        SourceDataForUpload {
            number,
            category_large: "여행".into(),
            category_medium: "국내여행".into(),
            category_small: None,
            core_keyword: format!("키워드 {}", number),
            seo_keywords: vec!["a".into(), "b".into()],
            blog_topic: format!("주제 {}", number),
        }
    }

    #[test]
    fn source_data_upsert_keys_on_number() {
        let db = test_db();
        let first = SourceData::push(&db, &sample_upload(10)).unwrap();
        let mut changed = sample_upload(10);
        changed.blog_topic = "바뀐 주제".into();
        let second = SourceData::push(&db, &changed).unwrap();
        assert_eq!(first, second);

        let row = SourceData::get_by_number(&db, 10).unwrap().unwrap();
        assert_eq!(row.blog_topic, "바뀐 주제");
        assert_eq!(row.seo_keywords, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn source_data_list_paginates_and_filters() {
        let db = test_db();
        for n in 1..=15 {
            SourceData::push(&db, &sample_upload(n)).unwrap();
        }
        let (page1, total) = SourceData::list(&db, &SourceDataFilter::default()).unwrap();
        assert_eq!(total, 15);
        assert_eq!(page1.len(), 10);
        assert_eq!(page1[0].number, 1);

        let (page2, _) = SourceData::list(
            &db,
            &SourceDataFilter {
                page: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page2.len(), 5);
        assert_eq!(page2[0].number, 11);

        let (found, total) = SourceData::list(
            &db,
            &SourceDataFilter {
                search: Some("주제 7".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].number, 7);
    }

    fn sample_post(source_data_id: Option<i64>) -> PostForUpload {
        PostForUpload {
            source_data_id,
            title: "제목".into(),
            content: "본문".into(),
            content_type: Some(ContentType::Review),
            additional_request: None,
            prompt_used: Some("prompt".into()),
            model_used: "gpt-5-mini".into(),
            tokens_used: Some(1234),
            image_url: None,
            sub_image_urls: vec![],
        }
    }

    #[test]
    fn posts_round_trip_with_joined_source() {
        let db = test_db();
        let source_id = SourceData::push(&db, &sample_upload(1)).unwrap();
        let post_id = GeneratedPost::push(&db, &sample_post(Some(source_id))).unwrap();

        let (posts, total) = GeneratedPost::list(&db, &PostFilter::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].post.post_id, post_id);
        assert_eq!(posts[0].post.status, PostStatus::Draft);
        assert_eq!(
            posts[0].source_data.as_ref().map(|s| s.number),
            Some(1)
        );

        assert_eq!(SourceData::generated_ids(&db).unwrap(), vec![source_id]);
    }

    #[test]
    fn post_filters_by_status_and_search() {
        let db = test_db();
        let draft = GeneratedPost::push(&db, &sample_post(None)).unwrap();
        let mut other = sample_post(None);
        other.title = "다른 글".into();
        let published = GeneratedPost::push(&db, &other).unwrap();
        GeneratedPost::update(
            &db,
            published,
            &PostUpdate {
                status: Some(PostStatus::Published),
                ..Default::default()
            },
        )
        .unwrap();

        let (posts, total) = GeneratedPost::list(
            &db,
            &PostFilter {
                status: Some(PostStatus::Draft),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].post.post_id, draft);

        let (posts, _) = GeneratedPost::list(
            &db,
            &PostFilter {
                search: Some("다른".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.post_id, published);
    }

    #[test]
    fn post_delete_is_independent() {
        let db = test_db();
        let post_id = GeneratedPost::push(&db, &sample_post(None)).unwrap();
        assert!(GeneratedPost::delete(&db, post_id).unwrap());
        assert!(!GeneratedPost::delete(&db, post_id).unwrap());
        assert!(GeneratedPost::get_by_id(&db, post_id).unwrap().is_none());
    }

    #[test]
    fn new_default_prompt_clears_previous_default() {
        let db = test_db();
        let first = Prompt::push(
            &db,
            &PromptForUpload {
                name: "리뷰 A".into(),
                content_type: ContentType::Review,
                template: "...".into(),
                is_default: true,
            },
        )
        .unwrap();
        // A default for a different content type is unaffected.
        Prompt::push(
            &db,
            &PromptForUpload {
                name: "튜토리얼".into(),
                content_type: ContentType::Tutorial,
                template: "...".into(),
                is_default: true,
            },
        )
        .unwrap();
        Prompt::push(
            &db,
            &PromptForUpload {
                name: "리뷰 B".into(),
                content_type: ContentType::Review,
                template: "...".into(),
                is_default: true,
            },
        )
        .unwrap();

        let prompts = Prompt::list(&db).unwrap();
        let review_defaults: Vec<_> = prompts
            .iter()
            .filter(|p| p.content_type == ContentType::Review && p.is_default)
            .collect();
        assert_eq!(review_defaults.len(), 1);
        assert_eq!(review_defaults[0].name, "리뷰 B");
        assert!(!prompts
            .iter()
            .any(|p| p.prompt_id == first && p.is_default));
        assert!(prompts
            .iter()
            .any(|p| p.content_type == ContentType::Tutorial && p.is_default));
    }

    #[test]
    fn prompt_push_returns_a_fetchable_id() {
        let db = test_db();
        let id = Prompt::push(
            &db,
            &PromptForUpload {
                name: "리뷰".into(),
                content_type: ContentType::Review,
                template: "...".into(),
                is_default: true,
            },
        )
        .unwrap();
        let prompt = Prompt::get_by_id(&db, id).unwrap().unwrap();
        assert_eq!(prompt.name, "리뷰");
        assert!(prompt.is_default);
        assert!(Prompt::get_by_id(&db, id + 1).unwrap().is_none());
    }

    #[test]
    fn image_prompt_seeding_is_idempotent_and_editable() {
        let db = test_db();
        ImagePrompt::seed_defaults(&db).unwrap();
        let seeded = ImagePrompt::list(&db).unwrap();
        assert_eq!(seeded.len(), 17);

        // Editing survives a reseed.
        let realistic = seeded
            .iter()
            .find(|p| p.category == ImagePromptCategory::Style && p.key == "realistic")
            .unwrap();
        ImagePrompt::update(
            &db,
            realistic.image_prompt_id,
            &ImagePromptUpdate {
                prompt: Some("shot on 35mm film".into()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        ImagePrompt::seed_defaults(&db).unwrap();

        let snapshot = ImagePrompt::fragment_snapshot(&db).unwrap();
        assert_eq!(snapshot.len(), 17);
        assert_eq!(
            blogsmith::image_prompt::resolve(ImagePromptCategory::Style, "realistic", &snapshot),
            "shot on 35mm film"
        );
    }

    #[test]
    fn image_prompt_update_missing_row_returns_none() {
        let db = test_db();
        let updated = ImagePrompt::update(&db, 999, &ImagePromptUpdate::default()).unwrap();
        assert!(updated.is_none());
    }
}
