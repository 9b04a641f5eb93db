use std::process::ExitCode;

use tracing::error;

use redlite::server::RedisServer;

/// Entry point: parse flags, then hand control to the server's accept
/// loop. A bad flag or a failed bind exits non-zero; everything after
/// startup is handled (and survived) inside the server.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let server = match RedisServer::from_args(std::env::args()) {
        Ok(server) => server,
        Err(error) => {
            error!(%error, "invalid command line arguments");
            return ExitCode::FAILURE;
        }
    };

    server.run().await
}
