//! Image tools: basic analysis of local files and generation through the
//! OpenAI images API

use super::{required_param, Tool, ToolContext};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::GenericImageView;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// Dimensions, channel count and mean brightness of an image file
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub brightness: f64,
}

impl ImageStats {
    pub fn from_file(path: &Path) -> Result<Self> {
        let img = image::open(path)?;
        let (width, height) = img.dimensions();
        let channels = img.color().channel_count();

        let gray = img.to_luma8();
        let pixels = gray.as_raw();
        let brightness = if pixels.is_empty() {
            0.0
        } else {
            pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64
        };

        Ok(Self {
            width,
            height,
            channels,
            brightness,
        })
    }

    pub fn report(&self) -> String {
        format!(
            "Image Analysis:\n- Dimensions: {}x{}\n- Channels: {}\n- Faces detected: N/A\n- Avg brightness: {:.2}",
            self.width, self.height, self.channels, self.brightness
        )
    }
}

fn resolve_image_path(ctx: &ToolContext, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        ctx.workspace.join(path)
    }
}

pub struct AnalyzeImage;

#[async_trait]
impl Tool for AnalyzeImage {
    fn name(&self) -> &'static str {
        "analyzeImage"
    }

    fn description(&self) -> &'static str {
        "Dimensions and brightness of an image file (image_path)"
    }

    fn error_label(&self) -> &'static str {
        "Image analysis error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let raw = required_param(params, "image_path")?;
        let path = resolve_image_path(ctx, raw);
        if !path.is_file() {
            return Ok("Image not found".to_string());
        }

        let stats = tokio::task::spawn_blocking(move || ImageStats::from_file(&path)).await??;
        Ok(stats.report())
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
}

pub struct GenerateImage;

#[async_trait]
impl Tool for GenerateImage {
    fn name(&self) -> &'static str {
        "generateImage"
    }

    fn description(&self) -> &'static str {
        "Generate an image from a text prompt (prompt, size)"
    }

    fn error_label(&self) -> &'static str {
        "Image generation error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let Some(api_key) = ctx.openai_api_key.as_deref() else {
            return Ok("Image generation requires OPENAI_API_KEY".to_string());
        };

        let prompt = required_param(params, "prompt")?;
        let size = params
            .get("size")
            .and_then(Value::as_str)
            .unwrap_or("1024x1024");

        let response = ctx
            .http
            .post(format!("{}/v1/images/generations", ctx.endpoints.openai))
            .bearer_auth(api_key)
            .json(&json!({
                "model": "dall-e-3",
                "prompt": prompt,
                "n": 1,
                "size": size,
                "response_format": "b64_json"
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("API returned {}: {}", status, body));
        }

        let images: ImagesResponse = response.json().await?;
        let encoded = images
            .data
            .into_iter()
            .find_map(|i| i.b64_json)
            .context("response contained no image")?;
        let bytes = STANDARD.decode(encoded)?;

        tokio::fs::create_dir_all(&ctx.images_dir).await?;
        let path = ctx.images_dir.join(format!(
            "image_{}.png",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        tokio::fs::write(&path, bytes).await?;

        info!("🎨 Image saved to {:?}", path);
        Ok(format!("Image generated and saved as {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_stats_of_solid_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 2, Rgb([255, 255, 255]));
        img.save(&path).unwrap();

        let stats = ImageStats::from_file(&path).unwrap();
        assert_eq!((stats.width, stats.height, stats.channels), (4, 2, 3));
        assert!((stats.brightness - 255.0).abs() < 0.01);
        assert!(stats.report().contains("Dimensions: 4x2"));
    }

    #[tokio::test]
    async fn test_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_workspace(dir.path());
        let out = AnalyzeImage
            .call(&json!({"image_path": "nope.png"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Image not found");
    }

    #[tokio::test]
    async fn test_generate_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_workspace(dir.path());
        let out = GenerateImage
            .call(&json!({"prompt": "a red suit"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Image generation requires OPENAI_API_KEY");
    }
}
