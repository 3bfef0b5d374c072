//! Prompts for the completion API
//!
//! Both prompts are embedded and rendered with simple mustache-style
//! `{{var}}` replacement. The completion model answers in Korean, so the
//! prompts are written in Korean too.

use std::collections::HashMap;

use crate::models::TagCategory;

/// Sampling parameters sent along with a prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A system message plus a user message template
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: &'static str,
    pub user_template: &'static str,
    pub sampling: Sampling,
}

impl Prompt {
    /// Render the user message with template variables replaced
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = self.user_template.to_string();
        for (key, value) in vars {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }
        result
    }
}

const EXTRACT_TAGS_SYSTEM: &str = "당신은 텍스트에서 중요한 주제와 키워드를 추출하는 전문가입니다.";

const EXTRACT_TAGS_USER: &str = r#"다음 일기 내용에서 중심 단어를 추출해 주세요. 다음 카테고리별로 태그를 분류해 주세요:
{{categories}}

JSON 형식으로 반환해 주세요. 예시:
[
    {"name": "등산", "category": "취미"},
    {"name": "두통", "category": "몸에 나타나는 증상"},
    {"name": "친구", "category": "인간관계"}
]

일기 내용:
{{content}}"#;

const DIARY_COMMENT_SYSTEM: &str = "당신은 공감적이고 전문적인 심리 상담사입니다. 사용자가 자신의 감정을 이해하고 정신 건강을 개선할 수 있도록 도와주세요.";

const DIARY_COMMENT_USER: &str = r#"사용자의 현재 일기와 과거에 작성한 유사한 일기들을 분석하여 개인화된 코멘트를 작성해 주세요.

코멘트는 다음과 같은 내용을 포함해야 합니다:
1. 사용자의 감정 상태 분석
2. 우울함이 감지된다면 적절한 조언
3. 사용자의 패턴이나 습관에 대한 통찰
4. 긍정적인 측면 강조 및 격려
5. 필요하다면 전문가 상담 권유

코멘트는 따뜻하고 공감적이며 지지적인 톤으로 작성해 주세요.

현재 일기:
{{content}}

과거 유사 일기들:
{{similar}}"#;

/// Tag extraction prompt (low temperature, short answer)
pub fn extract_tags() -> Prompt {
    Prompt {
        system: EXTRACT_TAGS_SYSTEM,
        user_template: EXTRACT_TAGS_USER,
        sampling: Sampling {
            temperature: 0.3,
            max_tokens: 500,
        },
    }
}

/// Personalized diary comment prompt
pub fn diary_comment() -> Prompt {
    Prompt {
        system: DIARY_COMMENT_SYSTEM,
        user_template: DIARY_COMMENT_USER,
        sampling: Sampling {
            temperature: 0.7,
            max_tokens: 1000,
        },
    }
}

/// Render the tag extraction user message for a diary
pub fn render_extract_tags(content: &str) -> String {
    let categories = TagCategory::all()
        .iter()
        .map(|c| format!("- {}", c.korean_label()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut vars = HashMap::new();
    vars.insert("categories", categories.as_str());
    vars.insert("content", content);
    extract_tags().render_user(&vars)
}

/// Render the comment user message for a diary and its similar predecessors
pub fn render_diary_comment<S: AsRef<str>>(content: &str, similar_contents: &[S]) -> String {
    let similar = similar_contents
        .iter()
        .enumerate()
        .map(|(i, c)| format!("유사 일기 {}:\n{}", i + 1, c.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut vars = HashMap::new();
    vars.insert("content", content);
    vars.insert("similar", similar.as_str());
    diary_comment().render_user(&vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tags_lists_every_category() {
        let rendered = render_extract_tags("오늘은 등산을 했다");
        for category in TagCategory::all() {
            assert!(rendered.contains(&format!("- {}", category.korean_label())));
        }
        assert!(rendered.ends_with("오늘은 등산을 했다"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_diary_comment_numbers_similar_entries() {
        let rendered = render_diary_comment("현재", &["첫째", "둘째"]);
        assert!(rendered.contains("유사 일기 1:\n첫째\n\n유사 일기 2:\n둘째"));
        assert!(rendered.contains("현재 일기:\n현재"));
    }

    #[test]
    fn test_diary_comment_without_similar_entries() {
        let none: [&str; 0] = [];
        let rendered = render_diary_comment("혼자", &none);
        assert!(rendered.ends_with("과거 유사 일기들:\n"));
    }

    #[test]
    fn test_sampling_parameters() {
        assert_eq!(extract_tags().sampling.max_tokens, 500);
        assert_eq!(diary_comment().sampling.temperature, 0.7);
    }
}
