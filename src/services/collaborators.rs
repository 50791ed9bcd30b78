//! 엔진이 참고하지만 엔진의 일부는 아닌 순수 함수 협력자들.
//!
//! - `MetadataValidator`: 필수 메타데이터 필드 검증
//! - `FilenameGenerator`: 저장용 문서 이름 생성 (실패하면 엔진이 원본 이름으로 대체)

use std::path::Path;

use crate::models::Metadata;

/// 검증 결과. `errors`가 비어 있으면 통과입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub trait MetadataValidator: Send + Sync {
    fn required_fields(&self) -> Vec<String>;

    fn validate(&self, metadata: &Metadata) -> ValidationReport;
}

pub trait FilenameGenerator: Send + Sync {
    fn generate(
        &self,
        original_name: &str,
        project_id: &str,
        metadata: &Metadata,
    ) -> Result<String, String>;
}

/// 설정된 필드가 모두 있고 비어 있지 않은지 확인하는 기본 검증기
#[derive(Debug, Clone, Default)]
pub struct RequiredFieldsValidator {
    required: Vec<String>,
}

impl RequiredFieldsValidator {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl MetadataValidator for RequiredFieldsValidator {
    fn required_fields(&self) -> Vec<String> {
        self.required.clone()
    }

    fn validate(&self, metadata: &Metadata) -> ValidationReport {
        let mut errors: Vec<String> = self
            .required
            .iter()
            .filter(|field| {
                metadata
                    .get(field.as_str())
                    .map_or(true, |value| value.trim().is_empty())
            })
            .map(|field| format!("missing required field: {field}"))
            .collect();

        if metadata.keys().any(|key| key.trim().is_empty()) {
            errors.push("metadata keys must not be blank".to_string());
        }

        ValidationReport { errors }
    }
}

/// 원본 파일 이름을 slug로 정리합니다: `"Plan A (rev 2).PDF"` → `"plan-a-rev-2.pdf"`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugFilenameGenerator;

impl FilenameGenerator for SlugFilenameGenerator {
    fn generate(
        &self,
        original_name: &str,
        _project_id: &str,
        _metadata: &Metadata,
    ) -> Result<String, String> {
        let path = Path::new(original_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("no file stem in {original_name:?}"))?;

        let slug = slug::slugify(stem);
        if slug.is_empty() {
            return Err(format!("{original_name:?} has no usable characters"));
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Ok(format!("{}.{}", slug, ext.to_lowercase())),
            None => Ok(slug),
        }
    }
}
