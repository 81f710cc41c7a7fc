use rostrum_demo::{AppConfig, Cli, Mint};
use rostrum_mem::{MemoryStore, MockDepositProvider};
use rostrum_server::generate_jwt;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // By convention, we leverage `tracing` to instrument and log various
    // operations throughout this project.
    // Accordingly, we likely want to subscribe to these events so we can
    // write them to stdio and possibly some durable location.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::import()?;

    // Minting tokens is an operator convenience; it never starts the server.
    if let Some(mint) = cli.mint {
        let (token, account) = generate_jwt(
            &cli.secret,
            365,
            matches!(mint, Mint::Admin),
            cli.name.clone(),
        )?;
        println!("account: {account}");
        println!("token:   {token}");
        return Ok(());
    }

    // Create config with proper layering of CLI args
    let AppConfig { server, deposits } = AppConfig::load(&cli)?;

    let store = MemoryStore::default();
    let provider = MockDepositProvider::new(deposits.verify_after);

    rostrum_server::start(cli.secret, store, provider, server).await;

    Ok(())
}
