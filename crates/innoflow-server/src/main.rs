use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use innoflow_server::store::Store;

#[derive(Parser)]
#[command(name = "innoflow-server", about = "In-memory innovation workflow backend")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "INNOFLOW_BIND", default_value = "127.0.0.1")]
    bind: String,

    #[arg(long, env = "INNOFLOW_PORT", default_value_t = 8080)]
    port: u16,

    /// Password of the built-in `admin` account
    #[arg(long, env = "INNOFLOW_ADMIN_PASSWORD", default_value = "admin")]
    admin_password: String,

    /// Load demo users (password = username) and a few ideas
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::new(cli.bind.parse()?, cli.port);

    let store = if cli.seed {
        let mut store = Store::with_demo_data();
        store.seed_demo_ideas()?;
        tracing::info!("demo data loaded");
        store
    } else {
        Store::bootstrap(&cli.admin_password)
    };

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("innoflow-server listening on http://{addr}");

    innoflow_server::serve(listener, store).await
}
