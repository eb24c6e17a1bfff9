//! Per-keyword timeline JSON for chart front-ends.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::CONVERSION_RATE;
use crate::error::Result;
use crate::types::KeywordDemandRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: String,
    pub trend_index: u32,
    pub estimated_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTimeline {
    pub keyword: String,
    pub timeline: Vec<TimelinePoint>,
}

/// `value × searches_per_point × intent/100 × CONVERSION_RATE`, two decimals.
pub fn estimated_sales(value: u32, searches_per_point: f64, purchase_intent: f64) -> f64 {
    let sales = value as f64 * searches_per_point * (purchase_intent / 100.0) * CONVERSION_RATE;
    (sales * 100.0).round() / 100.0
}

pub fn build(record: &KeywordDemandRecord, searches_per_point: f64) -> KeywordTimeline {
    KeywordTimeline {
        keyword: record.keyword.clone(),
        timeline: record
            .history
            .iter()
            .map(|p| TimelinePoint {
                date: p.date.clone(),
                trend_index: p.value,
                estimated_sales: estimated_sales(p.value, searches_per_point, record.purchase_intent),
            })
            .collect(),
    }
}

/// "Clash Royale Plush!" → "clash-royale-plush"
pub fn slug(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for ch in keyword.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            out.push(ch);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// File name stem for a keyword's timeline. The bare slug is used only when
/// it maps back to the keyword unambiguously; otherwise a hash of the
/// normalised keyword is appended so "a b" and "a-b" get different files.
pub fn file_stem(keyword: &str) -> String {
    let canonical = keyword.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let base = slug(&canonical);
    if !base.is_empty() && base.replace('-', " ") == canonical {
        return base;
    }
    let hash = fnv1a(canonical.as_bytes());
    if base.is_empty() {
        format!("kw-{hash:016x}")
    } else {
        format!("{base}-{hash:016x}")
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3))
}

pub fn write(dir: impl AsRef<Path>, timeline: &KeywordTimeline) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", file_stem(&timeline.keyword)));
    std::fs::write(&path, serde_json::to_vec_pretty(timeline)?)?;
    Ok(path)
}

pub fn read(dir: impl AsRef<Path>, keyword: &str) -> Result<KeywordTimeline> {
    let path = dir.as_ref().join(format!("{}.json", file_stem(keyword)));
    let bytes = std::fs::read(&path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
