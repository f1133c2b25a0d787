//! Scripted transport steps for `vdm replay`.
//!
//! A script is a JSON array of tagged steps. Tasks are referenced by a
//! caller-chosen label, so a script reads like a transcript of what a real
//! transport worker and a user would do:
//!
//! ```json
//! [
//!   { "op": "create", "label": "a", "url": "http://cdn/clip.mp4" },
//!   { "op": "attach", "label": "a" },
//!   { "op": "prepare", "label": "a" },
//!   { "op": "start", "label": "a" },
//!   { "op": "report", "label": "a", "download_size": 500, "total_size": 1000 },
//!   { "op": "report", "label": "a", "download_size": 1000, "total_size": 1000 },
//!   { "op": "succeed", "label": "a" }
//! ]
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use vdm_core::transport::error_codes;
use vdm_core::{TransportReport, VideoKind};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptStep {
    Create {
        label: String,
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        kind: VideoKind,
        #[serde(default)]
        is_live: bool,
    },
    /// Hand the task to the scripted transport (DEFAULT -> PENDING).
    Attach { label: String },
    Prepare { label: String },
    Start { label: String },
    /// One transport tick; absent fields are simply not reported.
    Report {
        label: String,
        #[serde(default)]
        final_url: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
        #[serde(default)]
        file_name: Option<String>,
        #[serde(default)]
        cover_path: Option<String>,
        #[serde(default)]
        download_size: Option<u64>,
        #[serde(default)]
        total_size: Option<u64>,
        #[serde(default)]
        speed: Option<f32>,
        #[serde(default)]
        total_segments: Option<u32>,
        #[serde(default)]
        cur_segments: Option<u32>,
        #[serde(default)]
        live_duration_ms: Option<u64>,
        #[serde(default)]
        percent: Option<f32>,
        #[serde(default)]
        line_info: Option<String>,
    },
    Fail {
        label: String,
        #[serde(default = "default_fail_code")]
        code: i32,
        message: String,
    },
    Succeed { label: String },
    Finalize { label: String },
    Pause { label: String },
    Resume { label: String },
    Cancel { label: String },
    Retry { label: String },
    Reset { label: String },
    Remove { label: String },
    Sleep { ms: u64 },
    /// Print a snapshot table of every task.
    List,
}

fn default_fail_code() -> i32 {
    error_codes::TRANSPORT
}

impl ScriptStep {
    /// Builds the engine-facing report from a `report` step's fields.
    pub fn to_report(&self) -> Option<TransportReport> {
        match self {
            ScriptStep::Report {
                final_url,
                mime_type,
                file_name,
                cover_path,
                download_size,
                total_size,
                speed,
                total_segments,
                cur_segments,
                live_duration_ms,
                percent,
                line_info,
                ..
            } => Some(TransportReport {
                final_url: final_url.clone(),
                mime_type: mime_type.clone(),
                file_name: file_name.clone(),
                cover_path: cover_path.clone(),
                download_size: *download_size,
                total_size: *total_size,
                speed: *speed,
                total_segments: *total_segments,
                cur_segments: *cur_segments,
                live_duration_delta_ms: *live_duration_ms,
                percent_estimate: *percent,
                line_info: line_info.clone(),
            }),
            _ => None,
        }
    }
}

pub fn load(path: &Path) -> Result<Vec<ScriptStep>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let steps: Vec<ScriptStep> =
        serde_json::from_str(&json).with_context(|| format!("parsing script {}", path.display()))?;
    Ok(steps)
}
