//! generateQRCode: SVG QR codes written to the workspace

use super::{required_param, str_param, Tool, ToolContext};
use anyhow::Result;
use async_trait::async_trait;
use qrcode::render::svg;
use qrcode::QrCode;
use serde_json::Value;
use std::path::PathBuf;

/// Render `data` as an SVG document
pub fn render_svg(data: &str) -> Result<String> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build())
}

pub struct GenerateQrCode;

#[async_trait]
impl Tool for GenerateQrCode {
    fn name(&self) -> &'static str {
        "generateQRCode"
    }

    fn description(&self) -> &'static str {
        "Encode text or a URL as a QR code image (data, filename)"
    }

    fn error_label(&self) -> &'static str {
        "QR code generation error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let data = required_param(params, "data")?;
        let requested = str_param(params, "filename").unwrap_or("qrcode.svg");

        // Rendering is SVG only, whatever extension was asked for
        let path: PathBuf = ctx.workspace_file(requested)?.with_extension("svg");

        let svg = render_svg(data)?;
        tokio::fs::create_dir_all(&ctx.workspace).await?;
        tokio::fs::write(&path, svg).await?;

        Ok(format!("QR code generated and saved as {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_workspace(dir.path());

        let out = GenerateQrCode
            .call(
                &json!({"data": "https://example.org", "filename": "link.png"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.ends_with("link.svg"));

        let svg = std::fs::read_to_string(dir.path().join("link.svg")).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[tokio::test]
    async fn test_requires_data() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_workspace(dir.path());
        assert!(GenerateQrCode.call(&json!({}), &ctx).await.is_err());
    }
}
