use std::{future::Future, io, sync::Arc};

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{error, info};

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod mcp;
pub mod remote;
pub mod stdio;

use config::Config;
use dispatch::{Dispatcher, Output};
use remote::{HttpRemote, RemoteEndpoint};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Loads configuration from the environment and serves until end of input or
/// `shutdown`, returning the process exit code. Configuration failures are
/// reported before `input` is touched.
pub async fn run<R, W, S>(input: R, output: W, shutdown: S) -> i32
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("FATAL: {err}");
            return EXIT_FAILURE;
        }
    };
    logging::init_logging(config.debug);

    let remote = match HttpRemote::new(&config) {
        Ok(remote) => Arc::new(remote),
        Err(err) => {
            error!(error = %err, "failed to build http client");
            return EXIT_FAILURE;
        }
    };

    info!(
        server_url = %config.server_url,
        timeout_secs = config.timeout.as_secs(),
        max_workers = config.max_workers,
        "bridge started"
    );

    match run_bridge(&config, remote, input, output, shutdown).await {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            error!(error = %err, "bridge terminated");
            EXIT_FAILURE
        }
    }
}

/// Relays newline-delimited JSON-RPC from `input` to `remote`, writing
/// responses to `output` until end of input or `shutdown` resolves.
pub async fn run_bridge<R, W, S>(
    config: &Config,
    remote: Arc<dyn RemoteEndpoint>,
    input: R,
    output: W,
    shutdown: S,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let dispatcher = Dispatcher::new(remote, Output::new(output));
    stdio::serve(input, dispatcher, config.max_workers, shutdown).await
}
