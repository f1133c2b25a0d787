//! `vdm demo` – a built-in scripted download, start to finish.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use vdm_core::config::EngineConfig;
use vdm_core::{persist, CreateTask, DownloadEngine, TransportReport, VideoKind};

use crate::cli::listener::PrintListener;

/// Simulates two transports: a plain MP4 fetch and a short live HLS
/// recording. No network is touched; this exists to show the event stream.
pub async fn run_demo(cfg: &EngineConfig, store: &Path) -> Result<()> {
    let engine = DownloadEngine::new(cfg.clone());
    engine.add_listener(Arc::new(PrintListener));

    let mut mp4 = CreateTask::new("http://demo.invalid/clip.mp4");
    mp4.title = "Demo clip".into();
    mp4.kind = VideoKind::Mp4;
    let mp4 = engine.create(mp4);

    let mut live = CreateTask::new("http://demo.invalid/live/channel.m3u8");
    live.title = "Demo live channel".into();
    live.kind = VideoKind::Hls;
    live.is_live = true;
    let live = engine.create(live);

    let worker = engine.attach_transport(mp4)?;
    worker.preparing()?;
    worker.started()?;
    let total = 1_000_000u64;
    for step in 1..=4u64 {
        let report = TransportReport {
            speed: Some(250_000.0),
            ..TransportReport::bytes(total / 4 * step, total)
        };
        worker.progress(report)?;
        tokio::time::sleep(Duration::from_millis(cfg.progress_interval_ms.min(100))).await;
    }
    worker.succeeded()?;

    let recorder = engine.attach_transport(live)?;
    recorder.preparing()?;
    recorder.started()?;
    for _ in 0..3 {
        let report = TransportReport {
            live_duration_delta_ms: Some(2_000),
            download_size: Some(64 * 1024),
            ..Default::default()
        };
        recorder.progress(report)?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    recorder.finalize()?;

    super::print_task_table(&engine.list());
    persist::save_all(store, &engine.list())?;
    println!("Demo finished; store: {}", store.display());
    Ok(())
}
