//! Check-in QR codes.

use qrcode::QrCode;
use qrcode::render::svg;
use url::Url;

/// Smallest rendered edge, in pixels.
pub const QR_MIN_SIZE: u32 = 256;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("invalid check-in URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The URL a student opens to check in to activity `code`.
///
/// # Errors
///
/// Returns `QrError::Url` if `base_url` is not a valid absolute URL.
pub fn checkin_url(base_url: &str, code: &str) -> Result<String, QrError> {
    let mut url = Url::parse(&format!("{}/checkin", base_url.trim_end_matches('/')))?;
    url.query_pairs_mut().append_pair("code", code);
    Ok(url.into())
}

/// Render `payload` as a standalone SVG document.
///
/// # Errors
///
/// Returns `QrError::Encode` if the payload is too long for a QR code.
pub fn render_svg(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}
