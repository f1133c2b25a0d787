//! `vdm status` – show the tasks in the snapshot store.

use std::path::Path;

use anyhow::Result;
use vdm_core::persist;
use vdm_core::TaskRecord;

pub fn run_status(store: &Path) -> Result<()> {
    let tasks = persist::load_all(store)?;
    let snapshots: Vec<_> = tasks.iter().map(TaskRecord::snapshot).collect();
    super::print_task_table(&snapshots);
    Ok(())
}
