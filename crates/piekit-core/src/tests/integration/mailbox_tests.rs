#![cfg(test)]

use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::tempdir;

use super::common::setup_app;
use crate::kernel::constants::managers;
use crate::kernel::error::Result;
use crate::plugin_system::{Plugin, PluginContext};
use crate::storage::{ConfigStore, Section};

/// Starts a worker thread in `init` that reports back through the mailbox.
struct FetcherPlugin {
    done: Arc<Mutex<Vec<String>>>,
}

impl Plugin for FetcherPlugin {
    fn name(&self) -> &'static str {
        "fetcher"
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()> {
        let Some(sender) = ctx.mailbox().cloned() else {
            return Ok(());
        };
        let done = self.done.clone();
        thread::spawn(move || {
            let fetched = vec!["alpha".to_string(), "beta".to_string()];
            let posted = sender.post(move |directory| {
                directory.with_mut::<ConfigStore, _>(managers::CONFIGS, |config| {
                    config.set("fetcher", Section::Inner, "items", &fetched, false)
                })?;
                done.lock().unwrap().push("applied".to_string());
                Ok(())
            });
            assert!(posted.is_ok());
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_worker_result_applied_on_owner() {
    let root = tempdir().unwrap();
    let mut app = setup_app(root.path());
    let done = Arc::new(Mutex::new(Vec::new()));

    app.register_plugin(FetcherPlugin { done: done.clone() }).unwrap();
    app.start().unwrap();
    app.apply_next().await.unwrap();

    assert_eq!(*done.lock().unwrap(), vec!["applied"]);
    let items: Vec<String> = app
        .config(|config| config.get("fetcher", Section::Inner, "items", Vec::new(), false))
        .unwrap();
    assert_eq!(items, vec!["alpha", "beta"]);
}

#[test]
fn test_pending_jobs_drained_before_shutdown() {
    let root = tempdir().unwrap();
    let mut app = setup_app(root.path());
    let done = Arc::new(Mutex::new(Vec::new()));

    let sender = app.mailbox_sender();
    let record = done.clone();
    thread::spawn(move || {
        sender
            .post(move |directory| {
                let loaded = directory.is_initialized(managers::CONFIGS)?;
                record.lock().unwrap().push(format!("configs loaded: {}", loaded));
                Ok(())
            })
            .is_ok()
    })
    .join()
    .unwrap();

    app.start().unwrap();
    app.shutdown().unwrap();
    assert_eq!(*done.lock().unwrap(), vec!["configs loaded: true"]);
}
