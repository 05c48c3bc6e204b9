//! Filename-based asset classification rules.

use crate::asset::AssetCategory;

const COPY_EXTENSIONS: &[&str] = &["txt", "doc", "docx", "pdf", "rtf"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];
const URL_PREFIXES: &[&str] = &["http://", "https://", "www."];

fn extension(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext)
}

/// Classifies an asset from its filename.
///
/// Rules apply in order: logo, copy extension, image extension, URL prefix.
/// Returns `None` when no rule matches; the asset keeps its current category.
pub fn classify_by_rules(filename: &str) -> Option<AssetCategory> {
    let lowered = filename.trim().to_ascii_lowercase();

    if lowered.contains("logo") {
        return Some(AssetCategory::Logo);
    }
    if let Some(ext) = extension(&lowered) {
        if COPY_EXTENSIONS.contains(&ext) {
            return Some(AssetCategory::Copy);
        }
        if IMAGE_EXTENSIONS.contains(&ext) {
            return Some(AssetCategory::Image);
        }
    }
    if URL_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return Some(AssetCategory::Url);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logo_wins_over_extension() {
        assert_eq!(
            classify_by_rules("Acme-Logo.png"),
            Some(AssetCategory::Logo)
        );
    }

    #[test]
    fn test_copy_extensions() {
        for name in ["body.txt", "brief.DOCX", "terms.pdf", "intro.rtf"] {
            assert_eq!(classify_by_rules(name), Some(AssetCategory::Copy), "{}", name);
        }
    }

    #[test]
    fn test_image_extensions() {
        assert_eq!(classify_by_rules("hero.jpeg"), Some(AssetCategory::Image));
        assert_eq!(classify_by_rules("banner.webp"), Some(AssetCategory::Image));
    }

    #[test]
    fn test_url_prefixes() {
        assert_eq!(
            classify_by_rules("https://shop.example.com/sale"),
            Some(AssetCategory::Url)
        );
        assert_eq!(classify_by_rules("www.example.com"), Some(AssetCategory::Url));
    }

    #[test]
    fn test_extension_wins_over_url_prefix() {
        assert_eq!(
            classify_by_rules("https://cdn.shop.com/banner.png"),
            Some(AssetCategory::Image)
        );
        assert_eq!(
            classify_by_rules("https://cdn.shop.com/terms.pdf"),
            Some(AssetCategory::Copy)
        );
    }

    #[test]
    fn test_extensionless_names_are_unmatched() {
        assert_eq!(classify_by_rules("photo"), None);
        assert_eq!(classify_by_rules("blurb"), None);
    }

    #[test]
    fn test_unknown_returns_none() {
        assert_eq!(classify_by_rules("archive.zip"), None);
        assert_eq!(classify_by_rules(".hidden"), None);
    }
}
