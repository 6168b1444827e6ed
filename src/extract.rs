//! Answer extraction: the boundary to the OCR collaborator.
//!
//! An [`AnswerExtractor`] turns an opaque image reference into the ordered
//! list of answers recognized on the sheet. Recognition itself happens
//! elsewhere; this module only knows how to obtain its output.
//!
//! | Provider | Type | Source of answers |
//! |----------|------|-------------------|
//! | `sidecar` | [`SidecarExtractor`] | `<image>.answers.json` or `<image>.txt` next to the image |
//! | `http` | [`HttpExtractor`] | `POST {endpoint}` with the base64-encoded image |
//!
//! An extractor that finds no text returns an empty list; that is a valid
//! outcome and grades every question as unanswered.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sheet_grader_core::parse_extracted_answers;

use crate::config::ExtractorConfig;

#[async_trait]
pub trait AnswerExtractor: Send + Sync {
    /// Provider name as used in `[extractor].provider`.
    fn name(&self) -> &str;

    /// Recognize the answers on the sheet behind `image_reference`, in
    /// question order.
    async fn extract(&self, image_reference: &str) -> Result<Vec<String>>;
}

/// Resolve an image reference against an optional root directory.
fn resolve_image(root: Option<&Path>, image_reference: &str) -> PathBuf {
    let path = Path::new(image_reference);
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// The image reference does not name a readable file.
#[derive(Debug, thiserror::Error)]
#[error("image not found: {}", .0.display())]
pub struct ImageNotFound(pub PathBuf);

fn ensure_image_exists(path: &Path) -> Result<(), ImageNotFound> {
    if !path.is_file() {
        return Err(ImageNotFound(path.to_path_buf()));
    }
    Ok(())
}

// ============ Sidecar ============

/// Reads answers that an offline OCR pass already wrote next to the image.
///
/// For `sheet.jpg` it looks for, in order:
///
/// 1. `sheet.jpg.answers.json`: a JSON array of strings (`null` = blank);
/// 2. `sheet.jpg.txt`: one answer per line.
///
/// If neither exists the sheet yielded no text.
pub struct SidecarExtractor {
    root: Option<PathBuf>,
}

impl SidecarExtractor {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

fn sidecar_path(image: &Path, suffix: &str) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[async_trait]
impl AnswerExtractor for SidecarExtractor {
    fn name(&self) -> &str {
        "sidecar"
    }

    async fn extract(&self, image_reference: &str) -> Result<Vec<String>> {
        let image = resolve_image(self.root.as_deref(), image_reference);
        ensure_image_exists(&image)?;

        let json_path = sidecar_path(&image, ".answers.json");
        if json_path.is_file() {
            let content = tokio::fs::read_to_string(&json_path)
                .await
                .with_context(|| format!("Failed to read {}", json_path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", json_path.display()))?;
            return Ok(parse_extracted_answers(&value)?);
        }

        let txt_path = sidecar_path(&image, ".txt");
        if txt_path.is_file() {
            let content = tokio::fs::read_to_string(&txt_path)
                .await
                .with_context(|| format!("Failed to read {}", txt_path.display()))?;
            return Ok(content.lines().map(str::to_string).collect());
        }

        tracing::warn!(image = %image.display(), "no extracted text found for image");
        Ok(Vec::new())
    }
}

// ============ HTTP ============

/// Sends the image to an OCR service and reads back its answers.
///
/// Request: `POST {endpoint}` with `{"filename": "...", "image": "<base64>"}`.
/// Response: `{"answers": ["...", null, ...]}`.
///
/// Retry strategy:
/// - HTTP 429 or 5xx → retry with exponential backoff (1s, 2s, 4s, ...)
/// - other HTTP 4xx → fail immediately
/// - network error → retry
pub struct HttpExtractor {
    endpoint: String,
    root: Option<PathBuf>,
    timeout: Duration,
    max_retries: u32,
}

impl HttpExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("extractor.endpoint required for http provider"))?;
        Ok(Self {
            endpoint,
            root: config.image_root.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl AnswerExtractor for HttpExtractor {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract(&self, image_reference: &str) -> Result<Vec<String>> {
        let image = resolve_image(self.root.as_deref(), image_reference);
        ensure_image_exists(&image)?;

        let bytes = tokio::fs::read(&image)
            .await
            .with_context(|| format!("Failed to read image {}", image.display()))?;
        let filename = image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let body = serde_json::json!({
            "filename": filename,
            "image": base64::engine::general_purpose::STANDARD.encode(&bytes),
        });

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
                tracing::debug!(attempt, endpoint = %self.endpoint, "retrying extraction");
            }

            match client.post(&self.endpoint).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_extraction_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!(
                            "extraction service error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("extraction service error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("extraction failed after retries")))
    }
}

/// Pull the `answers` array out of an extraction service response.
fn parse_extraction_response(json: &serde_json::Value) -> Result<Vec<String>> {
    let answers = json
        .get("answers")
        .ok_or_else(|| anyhow::anyhow!("Invalid extraction response: missing answers"))?;
    Ok(parse_extracted_answers(answers)?)
}

/// Build the extractor named by `[extractor].provider`.
pub fn create_extractor(config: &ExtractorConfig) -> Result<Box<dyn AnswerExtractor>> {
    match config.provider.as_str() {
        "sidecar" => Ok(Box::new(SidecarExtractor::new(config.image_root.clone()))),
        "http" => Ok(Box::new(HttpExtractor::new(config)?)),
        other => bail!("Unknown extractor provider: {}", other),
    }
}
