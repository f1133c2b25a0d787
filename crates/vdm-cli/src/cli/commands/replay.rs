//! `vdm replay <script>` – drive a fresh engine from a scripted transport.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use vdm_core::config::EngineConfig;
use vdm_core::{persist, CreateTask, DownloadEngine, TaskHandle, TaskId};

use crate::cli::listener::PrintListener;
use crate::cli::script::{self, ScriptStep};

pub async fn run_replay(cfg: &EngineConfig, script_path: &Path, store: &Path) -> Result<()> {
    let steps = script::load(script_path)?;
    let engine = DownloadEngine::new(cfg.clone());
    engine.add_listener(Arc::new(PrintListener));

    let mut ids: HashMap<String, TaskId> = HashMap::new();
    let mut handles: HashMap<String, TaskHandle> = HashMap::new();

    for step in &steps {
        match step {
            ScriptStep::Create {
                label,
                url,
                title,
                kind,
                is_live,
            } => {
                let mut req = CreateTask::new(url.clone());
                req.title = title.clone();
                req.kind = *kind;
                req.is_live = *is_live;
                let id = engine.create(req);
                ids.insert(label.clone(), id);
            }
            ScriptStep::Attach { label } => {
                let handle = engine.attach_transport(task_id(&ids, label)?)?;
                handles.insert(label.clone(), handle);
            }
            ScriptStep::Prepare { label } => handle(&handles, label)?.preparing()?,
            ScriptStep::Start { label } => handle(&handles, label)?.started()?,
            ScriptStep::Report { label, .. } => {
                let report = step.to_report().ok_or_else(|| anyhow!("not a report"))?;
                handle(&handles, label)?.progress(report)?;
            }
            ScriptStep::Fail { label, code, message } => {
                handle(&handles, label)?.failed(*code, message)?;
            }
            ScriptStep::Succeed { label } => handle(&handles, label)?.succeeded()?,
            ScriptStep::Finalize { label } => handle(&handles, label)?.finalize()?,
            ScriptStep::Pause { label } => engine.pause(task_id(&ids, label)?)?,
            ScriptStep::Resume { label } => engine.resume(task_id(&ids, label)?)?,
            ScriptStep::Cancel { label } => engine.cancel(task_id(&ids, label)?)?,
            ScriptStep::Retry { label } => engine.retry(task_id(&ids, label)?)?,
            ScriptStep::Reset { label } => engine.reset(task_id(&ids, label)?)?,
            ScriptStep::Remove { label } => {
                engine.remove(task_id(&ids, label)?)?;
                handles.remove(label);
            }
            ScriptStep::Sleep { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            ScriptStep::List => super::print_task_table(&engine.list()),
        }
    }

    persist::save_all(store, &engine.list())?;
    println!("Replayed {} steps; store: {}", steps.len(), store.display());
    Ok(())
}

fn task_id(ids: &HashMap<String, TaskId>, label: &str) -> Result<TaskId> {
    ids.get(label)
        .copied()
        .ok_or_else(|| anyhow!("script references unknown task label {label:?}"))
}

fn handle<'a>(handles: &'a HashMap<String, TaskHandle>, label: &str) -> Result<&'a TaskHandle> {
    handles
        .get(label)
        .ok_or_else(|| anyhow!("task {label:?} has no transport attached (missing attach step?)"))
}
