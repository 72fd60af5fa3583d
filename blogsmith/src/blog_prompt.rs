//! Composes the instruction prompt sent to the text model. Pure string
//! assembly: same inputs always produce the same prompt.

use crate::basic_models::{ContentType, SourceDataForUpload};

/// One-line Korean description of each content type, interpolated into the
/// opening sentence of the prompt.
pub fn content_type_description(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Informational => "정보를 제공하는 교육적인 글",
        ContentType::Review => "제품이나 서비스에 대한 상세한 리뷰",
        ContentType::Tutorial => "단계별 가이드 또는 튜토리얼",
        ContentType::Comparison => "여러 옵션을 비교 분석하는 글",
        ContentType::Listicle => "리스트 형식의 정리된 글",
    }
}

pub fn build_prompt(
    source: &SourceDataForUpload,
    content_type: ContentType,
    additional_request: Option<&str>,
) -> String {
    let mut prompt = format!(
        "당신은 전문 블로그 콘텐츠 작가입니다. 아래 정보를 바탕으로 {}을 작성해주세요.\n\n",
        content_type_description(content_type)
    );

    prompt.push_str("## 블로그 주제 정보\n");
    prompt.push_str(&format!("- 대분류: {}\n", source.category_large));
    prompt.push_str(&format!("- 중분류: {}\n", source.category_medium));
    if let Some(small) = source
        .category_small
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        prompt.push_str(&format!("- 소분류: {}\n", small));
    }
    prompt.push_str(&format!("- 핵심 키워드: {}\n", source.core_keyword));
    prompt.push_str(&format!("- SEO 키워드: {}\n", source.seo_keywords.join(", ")));
    prompt.push_str(&format!("- 블로그 콘텐츠 주제: {}\n", source.blog_topic));

    prompt.push_str(
        "\n## 작성 가이드라인\n\
         1. SEO 키워드를 자연스럽게 본문에 포함해주세요.\n\
         2. 핵심 키워드가 제목과 본문에 적절히 배치되도록 해주세요.\n\
         3. 독자가 이해하기 쉬운 친근한 어조로 작성해주세요.\n\
         4. 블로그 글의 구조: 제목, 서론, 본론(소제목 활용), 결론으로 구성해주세요.\n\
         5. 한국어로 작성하며, 1500-2000자 정도의 분량으로 작성해주세요.\n",
    );

    if let Some(extra) = additional_request.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("\n## 추가 요청사항\n{}\n", extra));
    }

    prompt.push_str(
        "\n## 출력 형식\n\
         마크다운 형식으로 작성해주세요. 제목은 # (H1)으로 시작하고, 소제목은 ## (H2)를 사용해주세요.\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source() -> SourceDataForUpload {
        SourceDataForUpload {
            number: 7,
            category_large: "여행".into(),
            category_medium: "국내여행".into(),
            category_small: Some("제주도".into()),
            core_keyword: "제주 맛집".into(),
            seo_keywords: vec!["제주 흑돼지".into(), "제주 카페".into()],
            blog_topic: "제주도 3박 4일 맛집 코스".into(),
        }
    }

    #[test]
    fn prompt_contains_all_source_fields() {
        let prompt = build_prompt(&sample_source(), ContentType::Informational, None);
        assert!(prompt.contains("- 대분류: 여행"));
        assert!(prompt.contains("- 중분류: 국내여행"));
        assert!(prompt.contains("- 소분류: 제주도"));
        assert!(prompt.contains("- 핵심 키워드: 제주 맛집"));
        assert!(prompt.contains("- SEO 키워드: 제주 흑돼지, 제주 카페"));
        assert!(prompt.contains("- 블로그 콘텐츠 주제: 제주도 3박 4일 맛집 코스"));
        assert!(prompt.contains("정보를 제공하는 교육적인 글"));
        assert!(prompt.contains("1500-2000자"));
        assert!(prompt.contains("# (H1)"));
    }

    #[test]
    fn small_category_is_omitted_when_absent() {
        let mut source = sample_source();
        source.category_small = None;
        let prompt = build_prompt(&source, ContentType::Review, None);
        assert!(!prompt.contains("소분류"));
    }

    #[test]
    fn additional_request_gets_its_own_section() {
        let prompt = build_prompt(
            &sample_source(),
            ContentType::Listicle,
            Some("가격 정보를 포함해주세요"),
        );
        assert!(prompt.contains("## 추가 요청사항\n가격 정보를 포함해주세요"));

        let without = build_prompt(&sample_source(), ContentType::Listicle, Some("   "));
        assert!(!without.contains("추가 요청사항"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_prompt(&sample_source(), ContentType::Comparison, Some("짧게"));
        let b = build_prompt(&sample_source(), ContentType::Comparison, Some("짧게"));
        assert_eq!(a, b);
    }
}
