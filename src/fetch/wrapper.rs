//! Wrapper pages: some attachment URLs answer with an HTML page that embeds
//! the real image instead of the image itself.

use base64::Engine;
use scraper::{Html, Selector};

use crate::error::{CurateError, Result};

/// The `src` of the first `<img>` in `html`, if any.
pub fn find_image_src(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img[src]").expect("valid selector");
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Whether an image source is an inline `data:` URL.
pub fn is_data_url(src: &str) -> bool {
    src.get(..5)
        .map(|p| p.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

/// Decode an inline `data:[<mime>][;base64],<payload>` URL.
pub fn decode_data_url(src: &str) -> Result<Vec<u8>> {
    let (header, payload) = src
        .split_once(',')
        .ok_or_else(|| CurateError::InvalidDataUrl("missing ','".into()))?;

    if header.to_ascii_lowercase().ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| CurateError::InvalidDataUrl(e.to_string()))
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}
