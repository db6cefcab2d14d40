use crate::foundation::error::FrameclockResult;
use crate::timeline::model::Timeline;
use anyhow::Context as _;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ASSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:src|href)=(?:"([^"]+)"|'([^']+)')"#).expect("asset pattern is valid")
});

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[\s"']id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#)
        .expect("id pattern is valid")
});

/// A local asset reference that does not resolve to an existing file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MissingAsset {
    /// Reference as written in the scene.
    pub reference: String,
    /// Where it was looked for.
    pub resolved: PathBuf,
}

/// Every `src="…"`/`href="…"` value in document order (single or double quotes).
pub fn find_asset_refs(html: &str) -> Vec<String> {
    ASSET_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Local references of the scene at `scene_path` that do not exist on disk.
pub fn check_assets_exist(scene_path: &Path) -> FrameclockResult<Vec<MissingAsset>> {
    let html = std::fs::read_to_string(scene_path)
        .with_context(|| format!("failed to read scene '{}'", scene_path.display()))?;
    let base = scene_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(missing_assets(&html, base))
}

/// Local references in `html` that do not resolve relative to `base`.
///
/// Remote (`http:`, `https:`, protocol-relative), inline (`data:`) and in-page (`#…`) references
/// are skipped. Query strings and fragments are ignored when resolving.
pub fn missing_assets(html: &str, base: &Path) -> Vec<MissingAsset> {
    let mut missing = Vec::new();
    for reference in find_asset_refs(html) {
        if is_external(&reference) {
            continue;
        }
        let local = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference.as_str());
        let resolved = base.join(percent_decode_str(local).decode_utf8_lossy().as_ref());
        if !resolved.exists() {
            missing.push(MissingAsset {
                reference,
                resolved,
            });
        }
    }
    missing
}

/// Element ids declared in `html`.
pub fn element_ids(html: &str) -> BTreeSet<String> {
    ID_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Timeline targets with no matching element id, in first-use order.
pub fn missing_targets(html: &str, timeline: &Timeline) -> Vec<String> {
    let ids = element_ids(html);
    let mut seen = BTreeSet::new();
    timeline
        .events
        .iter()
        .map(|e| e.target.as_str())
        .filter(|t| !ids.contains(*t) && seen.insert(*t))
        .map(str::to_owned)
        .collect()
}

fn is_external(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
        || lower.starts_with("mailto:")
        || lower.starts_with("javascript:")
        || lower.starts_with('#')
}

#[cfg(test)]
#[path = "../../tests/unit/scene/qa.rs"]
mod tests;
