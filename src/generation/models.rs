use serde::{Deserialize, Serialize};

pub const TOKENS_PER_TEXT: i64 = 1;
pub const TOKENS_PER_IMAGE: i64 = 1;
pub const TOKENS_PER_VIDEO: i64 = 3;

pub const MIN_POSTS: i64 = 1;
pub const MAX_POSTS: i64 = 30;
pub const DEFAULT_POSTS: i64 = 7;

/// Output language selection. Anything unrecognized falls back to
/// bilingual output rather than failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Arabic,
    English,
    Both,
}

impl Language {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("ar") => Language::Arabic,
            Some("en") => Language::English,
            _ => Language::Both,
        }
    }

    pub fn wants_arabic(&self) -> bool {
        matches!(self, Language::Arabic | Language::Both)
    }

    pub fn wants_english(&self) -> bool {
        matches!(self, Language::English | Language::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateMode {
    Ai,
    Demo,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub num_posts: Option<i64>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Normalized generation parameters: defaults applied and the post
/// count clamped before anything leaves the process.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub business_name: String,
    pub business_type: String,
    pub target_audience: String,
    pub platforms: Vec<String>,
    pub tone: String,
    pub language: Language,
    pub num_posts: i64,
    pub mode: GenerateMode,
}

impl GenerateRequest {
    pub fn normalize(self) -> GenerateParams {
        let business_name = self
            .business_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "My Business".to_string());
        let platforms = self
            .platforms
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| vec!["instagram".to_string()]);
        let mode = match self.mode.as_deref().map(str::trim) {
            Some("demo") => GenerateMode::Demo,
            _ => GenerateMode::Ai,
        };
        GenerateParams {
            business_name,
            business_type: self
                .business_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "general".to_string()),
            target_audience: self
                .target_audience
                .map(|a| a.trim().to_string())
                .unwrap_or_default(),
            platforms,
            tone: self.tone.unwrap_or_else(|| "friendly".to_string()),
            language: Language::parse(self.language.as_deref()),
            num_posts: self
                .num_posts
                .unwrap_or(DEFAULT_POSTS)
                .clamp(MIN_POSTS, MAX_POSTS),
            mode,
        }
    }
}

/// One social post. Per-language fields are optional so single-language
/// output simply omits the other side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub day: i64,
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags_ar: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags_en: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub posts: Vec<Post>,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_error: Option<String>,
    pub tokens_remaining: i64,
}

#[derive(Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize)]
pub struct ImageResponse {
    pub image_data: String,
    pub mime_type: String,
    pub alt_text: String,
    pub platform: String,
    pub tokens_remaining: i64,
}

#[derive(Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoParams {
    pub business_name: String,
    pub business_type: String,
    pub target_audience: String,
    pub platform: String,
    pub tone: String,
    pub language: Language,
}

impl VideoRequest {
    pub fn normalize(self) -> VideoParams {
        VideoParams {
            business_name: self
                .business_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "My Business".to_string()),
            business_type: self
                .business_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "general".to_string()),
            target_audience: self
                .target_audience
                .map(|a| a.trim().to_string())
                .unwrap_or_default(),
            platform: self
                .platform
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "instagram".to_string()),
            tone: self.tone.unwrap_or_else(|| "friendly".to_string()),
            language: Language::parse(self.language.as_deref()),
        }
    }
}

/// One caption slide of a video reel. `video_url` is filled by the
/// stock-clip lookup and stays null when no clip could be found.
#[derive(Debug, Clone, Serialize)]
pub struct Slide {
    pub slide: i64,
    pub text_ar: String,
    pub text_en: String,
    pub visual_keyword: String,
    pub duration_seconds: i64,
    pub video_url: Option<String>,
}

#[derive(Serialize)]
pub struct VideoResponse {
    pub slides: Vec<Slide>,
    pub total_duration: i64,
    pub platform: String,
    pub tokens_remaining: i64,
}
