//! Primary-image download.
//!
//! Strictly best-effort: any failure leaves the entity without an image
//! filename and the pipeline moves on.

use std::path::Path;

use tracing::{debug, warn};

/// Fetch `url` and store it as `{entity_id}.jpg` under `image_dir`.
/// Returns the stored filename, or `None` on any failure.
pub async fn download_primary_image(
    client: &reqwest::Client,
    url: &str,
    image_dir: &Path,
    entity_id: &str,
) -> Option<String> {
    if let Err(e) = std::fs::create_dir_all(image_dir) {
        warn!(entity_id, "image directory creation failed: {e}");
        return None;
    }

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(entity_id, "image request failed: {e}");
            return None;
        }
    };
    if !response.status().is_success() {
        warn!(entity_id, status = %response.status(), "image request rejected");
        return None;
    }
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(entity_id, "image body read failed: {e}");
            return None;
        }
    };

    let filename = format!("{entity_id}.jpg");
    let path = image_dir.join(&filename);
    match std::fs::write(&path, &bytes) {
        Ok(()) => {
            debug!(entity_id, path = %path.display(), "image stored");
            Some(filename)
        }
        Err(e) => {
            warn!(entity_id, "image write failed: {e}");
            None
        }
    }
}
