use std::process;

use tokio::io::BufReader;
use tracing::error;

#[tokio::main]
async fn main() {
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    let code = erpnext_mcp_bridge::run(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await;

    // A pending stdin read holds a blocking thread that would keep the
    // runtime from shutting down after an interrupt.
    process::exit(code);
}
