use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::read_optional_env;
use crate::usage::truncate_chars;

use super::models::{GenerateParams, Language, Post, Slide, VideoParams};

const DEFAULT_GENAI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_STOCK_URL: &str = "https://api.pexels.com";

fn tone_labels(tone: &str) -> (&'static str, &'static str) {
    match tone {
        "professional" => ("احترافي ومصقول", "professional and polished"),
        "formal" => ("رسمي", "formal and corporate"),
        "inspirational" => ("ملهم وتحفيزي", "inspirational and motivational"),
        "playful" => ("مرح وخفيف", "fun and lighthearted"),
        _ => ("ودّي وقريب", "warm and approachable"),
    }
}

fn business_type_label(business_type: &str) -> &str {
    match business_type {
        "restaurant" => "مطعم / Restaurant",
        "online_store" => "متجر إلكتروني / Online Store",
        "real_estate" => "عقارات / Real Estate",
        "beauty" => "تجميل / Beauty & Skincare",
        "fashion" => "أزياء / Fashion",
        "technology" => "تقنية / Technology",
        "education" => "تعليم / Education",
        "health" => "صحة / Health",
        "tourism" => "سياحة / Tourism",
        "general" => "عام / General Business",
        other => other,
    }
}

fn video_category_label(business_type: &str) -> &str {
    match business_type {
        "restaurant" => "restaurant/food",
        "online_store" => "e-commerce/retail",
        "real_estate" => "real estate/property",
        "beauty" => "beauty/skincare",
        "fashion" => "fashion/clothing",
        "technology" => "technology/software",
        "education" => "education/training",
        "health" => "health/wellness",
        "tourism" => "tourism/travel",
        "general" => "business/services",
        _ => "business",
    }
}

/// Aspect ratio and default art direction per destination platform.
fn platform_spec(platform: &str) -> (&'static str, &'static str) {
    match platform {
        "instagram_story" => ("portrait (9:16, 1080x1920px)", "bold, full-bleed visual"),
        "x" => ("landscape (16:9, 1200x675px)", "clean, minimal, high contrast"),
        "linkedin" => ("landscape (1.91:1, 1200x627px)", "professional, corporate"),
        "snapchat" => ("portrait (9:16, 1080x1920px)", "playful, colorful, casual"),
        "tiktok" => ("portrait (9:16, 1080x1920px)", "trendy, dynamic, eye-catching"),
        "facebook" => ("landscape (16:9, 1200x630px)", "engaging, clear message"),
        _ => ("square (1:1, 1080x1080px)", "vibrant, lifestyle-focused"),
    }
}

/// Provider replies arrive as JSON, sometimes wrapped in a markdown
/// code fence despite the JSON response mime type.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.split_once('\n') {
            Some((_, body)) => body,
            None => rest,
        };
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

pub struct ImageOutput {
    pub data: Option<String>,
    pub alt_text: String,
}

/// Client for the generative AI provider's `generateContent` API,
/// covering text posts, images and video scripts.
pub struct GenAiClient {
    base: String,
    api_key: String,
    text_model: String,
    image_model: String,
    client: Client,
}

impl GenAiClient {
    pub fn new(base: impl Into<String>, api_key: impl Into<String>) -> Self {
        GenAiClient {
            base: base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("client build"),
        }
    }

    pub fn from_env() -> Self {
        let base = read_optional_env("GENAI_API_URL")
            .unwrap_or_else(|| DEFAULT_GENAI_URL.to_string());
        let api_key = read_optional_env("GENAI_API_KEY").unwrap_or_default();
        let mut client = Self::new(base, api_key);
        if let Some(model) = read_optional_env("GENAI_TEXT_MODEL") {
            client.text_model = model;
        }
        if let Some(model) = read_optional_env("GENAI_IMAGE_MODEL") {
            client.image_model = model;
        }
        client
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate_content(&self, model: &str, body: Value) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.base, model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    fn first_text_part(result: &Value) -> Result<&str> {
        result
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.pointer("/content/parts/0/text"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("provider response contained no text part"))
    }

    pub async fn generate_posts(&self, params: &GenerateParams) -> Result<Vec<Post>> {
        let (tone_ar, tone_en) = tone_labels(&params.tone);
        let audience = if params.target_audience.is_empty() {
            "General Saudi audience"
        } else {
            &params.target_audience
        };
        let lang_instruction = match params.language {
            Language::Both => {
                "For EACH post provide BOTH \"text_ar\" (Gulf Saudi dialect, NOT formal MSA) and \
                 \"text_en\" (professional English). Also provide \"hashtags_ar\" and \"hashtags_en\"."
            }
            Language::Arabic => {
                "Write all posts in Arabic ONLY using Gulf/Saudi dialect. Provide \"text_ar\" and \
                 \"hashtags_ar\" only. Do NOT include English fields."
            }
            Language::English => {
                "Write all posts in English ONLY. Provide \"text_en\" and \"hashtags_en\" only. \
                 Do NOT include Arabic fields."
            }
        };

        let prompt = format!(
            "You are an expert Saudi social media content strategist. Generate exactly {num} social media posts.\n\n\
             BUSINESS: {name}\n\
             TYPE: {btype}\n\
             AUDIENCE: {audience}\n\
             PLATFORMS: {platforms}\n\
             TONE: {tone_ar} / {tone_en}\n\n\
             {lang_instruction}\n\n\
             RULES:\n\
             - Each post MUST be unique, creative, and engaging\n\
             - 3-5 relevant hashtags per post — use Saudi-specific tags (#السعودية #الرياض #جدة #رؤية_2030 etc.)\n\
             - Mix content types: promotional, educational, behind-the-scenes, testimonial-style, engagement questions, seasonal content\n\
             - Platform-appropriate: short for X/Twitter (< 280 chars), descriptive for Instagram, professional for LinkedIn, casual for Snapchat/TikTok\n\
             - Reference Saudi culture: Ramadan, Eid, National Day, Founding Day, Riyadh Season, coffee culture\n\
             - NO emojis — clean text only\n\
             - Distribute posts evenly across platforms\n\
             - Arabic MUST be Gulf/Saudi dialect — natural and conversational, NOT formal MSA\n\n\
             Return ONLY valid JSON:\n\
             {{\"posts\":[{{\"day\":1,\"platform\":\"instagram\",\"text_ar\":\"...\",\"text_en\":\"...\",\"hashtags_ar\":[\"#...\"],\"hashtags_en\":[\"#...\"]}}]}}\n\n\
             Generate exactly {num} posts, days 1 through {num}.",
            num = params.num_posts,
            name = params.business_name,
            btype = business_type_label(&params.business_type),
            audience = audience,
            platforms = params.platforms.join(", "),
            tone_ar = tone_ar,
            tone_en = tone_en,
            lang_instruction = lang_instruction,
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.95,
                "topP": 0.95,
                "maxOutputTokens": 8192,
                "responseMimeType": "application/json",
            },
        });

        let result = self.generate_content(&self.text_model, body).await?;
        let text = Self::first_text_part(&result)?;
        let parsed: Value =
            serde_json::from_str(strip_code_fences(text)).context("provider reply not JSON")?;
        let posts = match &parsed {
            Value::Object(map) => map
                .get("posts")
                .cloned()
                .ok_or_else(|| anyhow!("provider reply missing posts array"))?,
            Value::Array(_) => parsed.clone(),
            _ => bail!("provider reply has unexpected shape"),
        };
        Ok(serde_json::from_value(posts)?)
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        platform: &str,
        business_name: &str,
        style_override: &str,
    ) -> Result<ImageOutput> {
        let (aspect, default_style) = platform_spec(platform);
        let business_context = if business_name.is_empty() {
            String::new()
        } else {
            format!(" for {business_name}")
        };
        let style = if style_override.is_empty() {
            default_style
        } else {
            style_override
        };

        let full_prompt = format!(
            "Create a professional social media image{business_context}. \
             Description: {prompt}. \
             Style: {style}. \
             Format: {aspect}. \
             The image should be high-quality, visually striking, and suitable for Saudi Arabian market. \
             Modern, clean design. No text overlays unless the prompt specifically requests text. \
             Colors should feel warm and premium. Cultural sensitivity: appropriate for Saudi/Gulf audience."
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": full_prompt }] }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });

        let result = self.generate_content(&self.image_model, body).await?;
        let parts = result
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.pointer("/content/parts"))
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("no candidates in provider response"))?;

        let mut data = None;
        let mut alt_text = String::new();
        for part in parts {
            let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
            if let Some(encoded) = inline.and_then(|i| i.get("data")).and_then(Value::as_str) {
                data = Some(encoded.to_string());
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                alt_text = text.trim().to_string();
            }
        }

        if alt_text.is_empty() {
            alt_text = format!(
                "AI-generated social media image for {platform}: {}",
                truncate_chars(prompt, 100)
            );
        }
        Ok(ImageOutput { data, alt_text })
    }

    pub async fn generate_script(&self, params: &VideoParams) -> Result<Vec<Slide>> {
        let (tone_ar, tone_en) = tone_labels(&params.tone);
        let category = video_category_label(&params.business_type);
        let audience = if params.target_audience.is_empty() {
            "Saudi/Gulf consumers"
        } else {
            &params.target_audience
        };
        let lang_note = match params.language {
            Language::Both => {
                "provide BOTH text_ar (Gulf/Saudi Arabic dialect) and text_en (English)"
            }
            Language::Arabic => {
                "provide text_ar (Gulf/Saudi Arabic dialect) only, set text_en to empty string"
            }
            Language::English => "provide text_en (English) only, set text_ar to empty string",
        };

        let prompt = format!(
            "Create a short video reel script for social media ({platform}) for this business:\n\n\
             Business: {name}\n\
             Type: {category}\n\
             Target Audience: {audience}\n\
             Tone: {tone_ar} / {tone_en}\n\n\
             Generate 6-8 caption slides for a 15-30 second vertical video reel.\n\
             Each slide should be displayed for 2-4 seconds.\n\n\
             Requirements:\n\
             - Short, punchy text (max 8 words per slide in Arabic, 10 in English)\n\
             - The first slide is a hook (grabs attention instantly)\n\
             - Last slide has a clear call-to-action\n\
             - Reference Saudi culture where appropriate\n\
             - visual_keyword: 1-2 English words for stock video search (e.g., \"coffee shop\", \"fashion model\", \"city skyline\", \"team work\")\n\
             - {lang_note}\n\
             - duration_seconds: 2, 3, or 4\n\n\
             Return ONLY valid JSON array:\n\
             [\n  {{\n    \"slide\": 1,\n    \"text_ar\": \"...\",\n    \"text_en\": \"...\",\n    \"visual_keyword\": \"...\",\n    \"duration_seconds\": 3\n  }}\n]",
            platform = params.platform,
            name = params.business_name,
            category = category,
            audience = audience,
            tone_ar = tone_ar,
            tone_en = tone_en,
            lang_note = lang_note,
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.85,
                "topP": 0.9,
                "maxOutputTokens": 2048,
                "responseMimeType": "application/json",
            },
        });

        let result = self.generate_content(&self.text_model, body).await?;
        let text = Self::first_text_part(&result)?;
        let parsed: Value =
            serde_json::from_str(strip_code_fences(text)).context("provider reply not JSON")?;
        let raw_slides = match &parsed {
            Value::Array(items) => items.clone(),
            // The model occasionally wraps the array in a {"slides": [...]} object.
            Value::Object(map) => map
                .get("slides")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| anyhow!("provider reply missing slides array"))?,
            _ => bail!("provider reply has unexpected shape"),
        };

        let default_keyword = category.split('/').next().unwrap_or("business");
        let slides = raw_slides
            .iter()
            .enumerate()
            .map(|(i, raw)| Slide {
                slide: raw
                    .get("slide")
                    .and_then(Value::as_i64)
                    .unwrap_or(i as i64 + 1),
                text_ar: raw
                    .get("text_ar")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                text_en: raw
                    .get("text_en")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                visual_keyword: raw
                    .get("visual_keyword")
                    .and_then(Value::as_str)
                    .filter(|k| !k.trim().is_empty())
                    .unwrap_or(default_keyword)
                    .to_string(),
                duration_seconds: raw
                    .get("duration_seconds")
                    .and_then(Value::as_i64)
                    .or_else(|| raw.get("duration_seconds").and_then(Value::as_f64).map(|d| d as i64))
                    .unwrap_or(3),
                video_url: None,
            })
            .collect();
        Ok(slides)
    }
}

/// Client for the stock-media provider's portrait video search.
pub struct StockMediaClient {
    base: String,
    api_key: Option<String>,
    client: Client,
}

impl StockMediaClient {
    pub fn new(base: impl Into<String>, api_key: Option<String>) -> Self {
        StockMediaClient {
            base: base.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("client build"),
        }
    }

    pub fn from_env() -> Self {
        let base = read_optional_env("STOCK_MEDIA_API_URL")
            .unwrap_or_else(|| DEFAULT_STOCK_URL.to_string());
        Self::new(base, read_optional_env("STOCK_MEDIA_API_KEY"))
    }

    /// Finds a portrait clip for the keyword. `Ok(None)` when the
    /// provider has nothing usable or no key is configured.
    pub async fn portrait_clip(&self, keyword: &str) -> Result<Option<String>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };
        let url = format!("{}/videos/search", self.base);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", api_key)
            .query(&[
                ("query", keyword),
                ("orientation", "portrait"),
                ("per_page", "3"),
                ("size", "small"),
            ])
            .send()
            .await?
            .error_for_status()?;
        let data: Value = resp.json().await?;

        let videos = data
            .get("videos")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for video in &videos {
            let mut files: Vec<&Value> = video
                .get("video_files")
                .and_then(Value::as_array)
                .map(|f| f.iter().collect())
                .unwrap_or_default();
            // Smallest rendition first: faster to load in the client player.
            files.sort_by_key(|f| f.get("width").and_then(Value::as_i64).unwrap_or(0));
            for file in &files {
                let link = file.get("link").and_then(Value::as_str);
                let file_type = file
                    .get("file_type")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if let Some(link) = link {
                    if file_type.contains("video/mp4") {
                        return Ok(Some(link.to_string()));
                    }
                }
            }
            if let Some(link) = files
                .first()
                .and_then(|f| f.get("link"))
                .and_then(Value::as_str)
            {
                return Ok(Some(link.to_string()));
            }
        }
        Ok(None)
    }
}
