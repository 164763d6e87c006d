use std::net::IpAddr;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use local_ip_address::local_ip;
use qrcode::{QrCode, render::svg};
use tracing::debug;

use crate::{
    dto::join_link::JoinLinkResponse,
    error::ServiceError,
    state::{SessionCode, SharedState},
};

const CONTROLLER_PAGE: &str = "controller.html";
const QR_MIN_SIZE: u32 = 256;

/// Build the link a phone follows to join the session `raw_code` as a controller,
/// along with a scannable rendition of it.
pub fn join_link(state: &SharedState, raw_code: &str) -> Result<JoinLinkResponse, ServiceError> {
    let code =
        SessionCode::parse(raw_code).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    if state.sessions().lookup(&code).is_none() {
        return Err(ServiceError::NotFound(format!("session `{code}` not found")));
    }

    let base = base_url(state);
    let url = format!("{base}/{CONTROLLER_PAGE}?code={code}");
    let qr = render_qr(&url)?;
    Ok(JoinLinkResponse {
        code,
        qr,
        manual_url: url.clone(),
        url,
    })
}

/// Encode `url` as an SVG QR code wrapped in a `data:` URL usable as an `<img>` source.
fn render_qr(url: &str) -> Result<String, ServiceError> {
    let code = QrCode::new(url.as_bytes())?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .build();
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

/// Configured public base URL, or this host's LAN address on the listening port.
fn base_url(state: &SharedState) -> String {
    let config = state.config();
    match config.public_base_url() {
        Some(base) => base.to_string(),
        None => {
            let host = lan_ipv4()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "localhost".to_string());
            format!("http://{host}:{}", config.port())
        }
    }
}

/// IPv4 address of the first non-loopback interface.
fn lan_ipv4() -> Option<IpAddr> {
    match local_ip() {
        Ok(ip) if !ip.is_loopback() => Some(ip),
        Ok(_) => None,
        Err(err) => {
            debug!(error = %err, "no LAN address found");
            None
        }
    }
}
