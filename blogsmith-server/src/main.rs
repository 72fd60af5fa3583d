use anyhow::{Context, Result};
use blogsmith_server::database::Database;
use blogsmith_server::models::ImagePrompt;
use blogsmith_server::routes::{app, AppState};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// The address and optionally port to bind to
    #[clap(long, default_value = "0.0.0.0:3000")]
    address: String,

    /// Whether to use HTTPS / TLS
    #[clap(long)]
    tls: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // initialize tracing
    let file_appender = tracing_appender::rolling::daily(
        if std::fs::exists("/app")? {
            "/app/data/logs".into()
        } else {
            std::env::current_dir()?
        },
        "access.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // connect to the database and make sure the editable prompt fragments exist
    let db = Database::connect_default().context("Connecting to database")?;
    ImagePrompt::seed_defaults(&db).context("Seeding image prompt fragments")?;

    let app = app(AppState::new(db));

    // In development, use HTTP. In production, use HTTPS.
    if args.tls {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            dotenvy::var("TLS_CERT_PATH").context("TLS_CERT_PATH is not set")?,
            dotenvy::var("TLS_KEY_PATH").context("TLS_KEY_PATH is not set")?,
        )
        .await
        .context("Loading TLS certificate")?;

        let addr = args.address.parse()?;
        tracing::info!("Listening on {}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(args.address).await?;
        axum::serve(listener, app).await?;
    }
    Ok(())
}
