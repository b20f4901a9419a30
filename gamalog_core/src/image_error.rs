//! Maps `Box<dyn Error>` from the `ImageFs` boundary to typed `GamalogError`.
//!
//! The trait in `gamalog_traits` uses `Box<dyn Error + Send + Sync>` so fakes and
//! real adapters can report anything; this module converts those to our enum,
//! with an optional feature-gated path for `gamalog_image::ImageError` downcasting.

use crate::error::GamalogError;

/// Map a trait-boundary error to a typed `GamalogError`.
///
/// Attempts to downcast known image error types first, then falls back
/// to string-based heuristics.
pub fn map_image_error(e: &(dyn std::error::Error + 'static)) -> GamalogError {
    #[cfg(feature = "image-errors")]
    {
        if let Some(img) = e.downcast_ref::<gamalog_image::ImageError>() {
            return match img {
                gamalog_image::ImageError::Timeout { .. } => GamalogError::Timeout,
                gamalog_image::ImageError::ToolMissing(tool) => {
                    GamalogError::ToolMissing(tool.clone())
                }
                gamalog_image::ImageError::Io(io) => GamalogError::Io(io.to_string()),
                other => GamalogError::Image(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        GamalogError::Timeout
    } else {
        GamalogError::Image(s)
    }
}
