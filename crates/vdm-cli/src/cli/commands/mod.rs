//! CLI command handlers. Each command is in its own file for clarity.

mod config;
mod demo;
mod replay;
mod status;

pub use config::run_config;
pub use demo::run_demo;
pub use replay::run_replay;
pub use status::run_status;

use vdm_core::TaskSnapshot;

/// Shared snapshot table used by `status` and the `list` script step.
pub(crate) fn print_task_table(tasks: &[TaskSnapshot]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    println!(
        "{:<6} {:<11} {:>7} {:>12} {:<20} {}",
        "ID", "STATE", "PCT", "BYTES", "NAME", "URL"
    );
    for task in tasks {
        let name = if task.file_name().is_empty() {
            task.title()
        } else {
            task.file_name()
        };
        println!(
            "{:<6} {:<11} {:>6.1}% {:>12} {:<20} {}",
            task.id().unwrap_or("-"),
            task.state().as_str(),
            task.percent(),
            task.download_size(),
            name,
            task.url()
        );
    }
}
