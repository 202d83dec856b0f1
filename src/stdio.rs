//! Newline-delimited JSON input loop feeding a bounded worker pool
//!
//! The reader never waits on workers: every parsed request is queued at once
//! and runs when one of the pool's permits frees up, so responses may leave in
//! a different order than the requests arrived.

use std::{future::Future, io, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite},
    sync::Semaphore,
    task::{JoinError, JoinSet},
};
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::errors::RelayError;

/// Bounded wait for in-flight requests after an interrupt.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

enum Stop {
    EndOfInput,
    Interrupted,
    Failed(io::Error),
}

pub async fn serve<R, W, S>(
    input: R,
    dispatcher: Dispatcher<W>,
    max_workers: usize,
    shutdown: S,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let workers = Arc::new(Semaphore::new(max_workers.clamp(1, Semaphore::MAX_PERMITS)));
    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    let stop = loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => break Stop::Interrupted,
            next = lines.next_line() => next,
        };

        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => break Stop::EndOfInput,
            Err(err) => break Stop::Failed(err),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                error!(error = %err, "invalid JSON on input");
                let response = RelayError::Parse(err.to_string()).into_json_rpc(None);
                if let Err(err) = dispatcher.output().write_message(&response).await {
                    break Stop::Failed(err);
                }
                continue;
            }
        };

        let workers = Arc::clone(&workers);
        let dispatcher = dispatcher.clone();
        tasks.spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };
            dispatcher.dispatch(request).await;
        });
    };

    match stop {
        Stop::EndOfInput => {
            debug!(pending = tasks.len(), "input closed, waiting for in-flight requests");
            drain(&mut tasks).await;
            info!("stopped");
            Ok(())
        }
        Stop::Interrupted => {
            info!(pending = tasks.len(), "interrupted, draining in-flight requests");
            drain_bounded(&mut tasks, DRAIN_TIMEOUT).await;
            info!("stopped");
            Ok(())
        }
        Stop::Failed(err) => {
            error!(error = %err, "fatal input failure");
            drain_bounded(&mut tasks, DRAIN_TIMEOUT).await;
            Err(err)
        }
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        log_join_result(result);
    }
}

async fn drain_bounded(tasks: &mut JoinSet<()>, limit: Duration) {
    if tokio::time::timeout(limit, drain(tasks)).await.is_err() {
        warn!(abandoned = tasks.len(), "drain timed out, aborting remaining requests");
        tasks.shutdown().await;
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            error!(error = %err, "dispatch task panicked");
        }
    }
}
