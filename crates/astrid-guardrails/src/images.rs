//! Image-keep policy for tool results (spec §4.9).

use std::path::Path;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::spill::{extension_for, sha256_hex, spill_write};

/// An inline image block carried by a tool result, as handed to the
/// guardrails transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    /// Base64-encoded image bytes.
    pub data_base64: String,
    /// MIME type, e.g. `image/png`.
    pub mime: String,
}

/// What an over-the-limit image becomes: a text placeholder carrying its
/// hash and mime type (and spill path, if configured).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpilledImagePlaceholder {
    /// sha256 of the decoded image bytes.
    pub sha256: String,
    /// Original MIME type.
    pub mime: String,
    /// Path the image was spilled to, if a spill directory was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spill_path: Option<String>,
}

/// Outcome: images to keep inline (content blocks), in order, plus
/// placeholders for the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePolicyOutcome {
    /// Images kept as inline content, at most `max_images`.
    pub kept: Vec<ImageBlock>,
    /// Text placeholders for images spilled past the keep limit.
    pub spilled: Vec<SpilledImagePlaceholder>,
}

/// Apply the image-keep policy: keep at most `max_images` images inline
/// (in order), spilling the rest to content-addressed placeholders.
#[must_use]
pub fn apply_image_policy(images: &[ImageBlock], max_images: usize, spill_root: Option<&Path>) -> ImagePolicyOutcome {
    let mut outcome = ImagePolicyOutcome::default();
    for (i, image) in images.iter().enumerate() {
        if i < max_images {
            outcome.kept.push(image.clone());
            continue;
        }
        let decoded = base64::engine::general_purpose::STANDARD.decode(&image.data_base64).unwrap_or_default();
        let sha256 = sha256_hex(&decoded);
        let ext = extension_for(Some(&image.mime), true);
        let spill_path = spill_root
            .and_then(|root| spill_write(root, "tool_result_image", ext, &decoded).ok())
            .map(|(path, _)| path.display().to_string());
        outcome.spilled.push(SpilledImagePlaceholder {
            sha256,
            mime: image.mime.clone(),
            spill_path,
        });
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(byte: u8) -> ImageBlock {
        ImageBlock {
            data_base64: base64::engine::general_purpose::STANDARD.encode([byte; 16]),
            mime: "image/png".to_string(),
        }
    }

    #[test]
    fn keeps_at_most_max_images() {
        let images = vec![image(1), image(2), image(3)];
        let out = apply_image_policy(&images, 1, None);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.spilled.len(), 2);
    }

    #[test]
    fn zero_keep_spills_all() {
        let images = vec![image(1), image(2)];
        let out = apply_image_policy(&images, 0, None);
        assert!(out.kept.is_empty());
        assert_eq!(out.spilled.len(), 2);
    }
}
