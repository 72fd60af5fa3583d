//! CSV import for source-data rows. The file must carry the fixed Korean
//! header row; rows missing any required field are dropped silently and only
//! show up in the imported/total accounting.

use blogsmith::basic_models::SourceDataForUpload;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "번호")]
    number: String,
    #[serde(rename = "대분류")]
    category_large: String,
    #[serde(rename = "중분류")]
    category_medium: String,
    #[serde(rename = "소분류", default)]
    category_small: Option<String>,
    #[serde(rename = "핵심 키워드")]
    core_keyword: String,
    #[serde(rename = "SEO 키워드", default)]
    seo_keywords: String,
    #[serde(rename = "블로그 콘텐츠 주제")]
    blog_topic: String,
}

impl CsvRow {
    fn into_upload(self) -> Option<SourceDataForUpload> {
        let number: i64 = self.number.trim().parse().ok()?;
        if number <= 0 {
            return None;
        }
        let required = [
            self.category_large.trim(),
            self.category_medium.trim(),
            self.core_keyword.trim(),
            self.blog_topic.trim(),
        ];
        if required.iter().any(|field| field.is_empty()) {
            return None;
        }
        Some(SourceDataForUpload {
            number,
            category_large: self.category_large.trim().to_string(),
            category_medium: self.category_medium.trim().to_string(),
            category_small: self
                .category_small
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            core_keyword: self.core_keyword.trim().to_string(),
            seo_keywords: self
                .seo_keywords
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            blog_topic: self.blog_topic.trim().to_string(),
        })
    }
}

/// Parse a CSV payload into importable rows. Returns the valid rows and the
/// total record count, valid or not.
pub fn parse_source_data_csv(bytes: &[u8]) -> (Vec<SourceDataForUpload>, usize) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);
    let mut valid = Vec::new();
    let mut total = 0;
    for record in reader.deserialize::<CsvRow>() {
        total += 1;
        match record {
            Ok(row) => {
                if let Some(upload) = row.into_upload() {
                    valid.push(upload);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "skipping unreadable CSV record");
            }
        }
    }
    (valid, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "번호,대분류,중분류,소분류,핵심 키워드,SEO 키워드,블로그 콘텐츠 주제\n";

    #[test]
    fn rows_missing_required_fields_are_dropped_from_import() {
        let mut csv = String::from(HEADER);
        for n in 1..=5 {
            csv.push_str(&format!(
                "{},여행,국내여행,제주,키워드{},\"seo1, seo2\",주제{}\n",
                n, n, n
            ));
        }
        // Missing the core keyword.
        csv.push_str("6,여행,국내여행,제주,,seo,주제6\n");

        let (valid, total) = parse_source_data_csv(csv.as_bytes());
        assert_eq!(total, 6);
        assert_eq!(valid.len(), 5);
        assert_eq!(valid[0].number, 1);
        assert_eq!(valid[0].seo_keywords, vec!["seo1".to_string(), "seo2".to_string()]);
    }

    #[test]
    fn non_numeric_or_nonpositive_numbers_are_dropped() {
        let csv = format!(
            "{}abc,여행,국내여행,,키워드,seo,주제\n0,여행,국내여행,,키워드,seo,주제\n",
            HEADER
        );
        let (valid, total) = parse_source_data_csv(csv.as_bytes());
        assert_eq!(total, 2);
        assert!(valid.is_empty());
    }

    #[test]
    fn empty_optional_columns_become_none() {
        let csv = format!("{}1,여행,국내여행,,키워드,,주제\n", HEADER);
        let (valid, _) = parse_source_data_csv(csv.as_bytes());
        assert_eq!(valid[0].category_small, None);
        assert!(valid[0].seo_keywords.is_empty());
    }
}
