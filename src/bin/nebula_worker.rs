// ─── Worker executor ───
// Child-process entry point. The first positional argument names the
// receiver to run; stdout is reserved for the message stream, so the
// subscriber writes to stderr.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nebula_core=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(receiver_id) = std::env::args().nth(1) else {
        eprintln!("usage: nebula-worker <receiver-id>");
        std::process::exit(2);
    };

    let code = nebula_core::worker::run_worker(&receiver_id).await;
    std::process::exit(code);
}
