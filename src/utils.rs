use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DRAWS_PER_YEAR: f64 = 52.0;
const WINDOW_MARGIN: f64 = 1.1;

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Number of weekly draws to bootstrap on a cold start, with a 10% margin.
pub fn draws_for_years(years: u32) -> u32 {
    (f64::from(years) * DRAWS_PER_YEAR * WINDOW_MARGIN) as u32
}

/// Pulls the latest draw number out of the authority's landing page,
/// i.e. the text of `<strong id="lottoDrwNo">1124</strong>`.
pub fn extract_latest_draw_no(html: &str) -> Option<u32> {
    let marker = html.find("id=\"lottoDrwNo\"")?;
    let after_tag = &html[marker..];
    let start = after_tag.find('>')? + 1;
    let end = after_tag[start..].find('<')? + start;
    after_tag[start..end].trim().parse().ok()
}
