//! Type-ahead search: every keystroke restarts the lookup, only the last one lands.
//! Set `TASKGEN_LOG_JSON=1` for newline-delimited JSON logs.

use std::time::Duration;

use taskgen::logging::{init_json_logging, init_logging};
use taskgen::{Launch, TaskBuilder};
use tracing::info;

#[tokio::main]
async fn main() {
    if std::env::var_os("TASKGEN_LOG_JSON").is_some() {
        init_json_logging();
    } else {
        init_logging();
    }

    let search = TaskBuilder::new(|token, query: String| {
        Launch::Run(async move {
            for _ in 0..query.len() {
                if token.is_canceled() {
                    info!(generation = token.id(), query = %query, "lookup_abandoned");
                    return Err("abandoned".to_string());
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Ok(format!("results for {query:?}"))
        })
    })
    .on_start(|| info!("lookup_started"))
    .on_complete(|hits| info!(hits = %hits, "lookup_complete"))
    .on_error(|e| info!(error = %e, "lookup_failed"))
    .mount();

    for prefix in ["r", "ru", "rus", "rust"] {
        search.run(prefix.to_string());
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let mut status = search.subscribe();
    while status.borrow_and_update().is_running {
        if status.changed().await.is_err() {
            break;
        }
    }
    info!(result = ?search.result(), metrics = ?search.metrics(), "done");
}
