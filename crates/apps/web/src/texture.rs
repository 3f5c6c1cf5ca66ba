use gloo_net::http::Request;

use crate::error::ViewerError;

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes JPEG or PNG bytes.
pub fn decode_texture(bytes: &[u8]) -> Result<DecodedTexture, ViewerError> {
    let img =
        image::load_from_memory(bytes).map_err(|e| ViewerError::TextureDecode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ViewerError::TextureDecode("empty image".to_string()));
    }
    Ok(DecodedTexture {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

pub async fn fetch_texture(url: &str) -> Result<DecodedTexture, ViewerError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| ViewerError::TextureFetch(format!("{url}: {e}")))?;
    if !resp.ok() {
        return Err(ViewerError::TextureFetch(format!(
            "{url}: http {} {}",
            resp.status(),
            resp.status_text()
        )));
    }
    let bytes = resp
        .binary()
        .await
        .map_err(|e| ViewerError::TextureFetch(format!("{url}: {e}")))?;
    tracing::debug!(url, bytes = bytes.len(), "texture downloaded");
    decode_texture(&bytes)
}
