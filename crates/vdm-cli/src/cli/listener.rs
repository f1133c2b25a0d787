//! Listener that prints each dispatched event to stdout.

use vdm_core::{DownloadListener, TaskSnapshot};

pub struct PrintListener;

impl PrintListener {
    fn line(&self, event: &str, task: &TaskSnapshot) {
        let id = task.id().unwrap_or("-");
        println!(
            "[{event:>8}] task {id} {:<11} {:>6.1}% {:>10}B {}",
            task.state().as_str(),
            task.percent(),
            task.download_size(),
            task.title()
        );
    }
}

impl DownloadListener for PrintListener {
    fn on_download_default(&self, task: &TaskSnapshot) {
        self.line("default", task);
    }
    fn on_download_pending(&self, task: &TaskSnapshot) {
        self.line("pending", task);
    }
    fn on_download_prepare(&self, task: &TaskSnapshot) {
        self.line("prepare", task);
    }
    fn on_download_start(&self, task: &TaskSnapshot) {
        self.line("start", task);
    }
    fn on_download_progress(&self, task: &TaskSnapshot) {
        self.line("progress", task);
    }
    fn on_download_speed(&self, task: &TaskSnapshot) {
        self.line("speed", task);
    }
    fn on_download_pause(&self, task: &TaskSnapshot) {
        self.line("pause", task);
    }
    fn on_download_error(&self, task: &TaskSnapshot) {
        let message = task.error_message().unwrap_or("unknown error");
        println!(
            "[   error] task {} code {}: {message}",
            task.id().unwrap_or("-"),
            task.error_code()
        );
    }
    fn on_download_success(&self, task: &TaskSnapshot) {
        self.line("success", task);
    }
}
