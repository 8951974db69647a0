use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rumshop::page::{PageConfig, render};
use rumshop::telemetry::{SelfTrace, init_cli_tracing, init_serve_tracing, shutdown_tracing};
use rumshop::{AppState, router};
use rumshop_core::config::Config;
use rumshop_core::model::log::Severity;
use rumshop_store::Store;
use rumshop_telemetry::Telemetry;

#[derive(Parser, Debug)]
#[command(name = "rumshop")]
#[command(about = "Demo storefront with browser and server OpenTelemetry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Override the OTLP/HTTP collector base URL")]
    collector_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Serve the storefront page and API")]
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        database_url: Option<String>,
    },
    #[command(about = "Create the orders table and exit")]
    InitDb {
        #[arg(long)]
        database_url: Option<String>,
    },
    #[command(about = "Send one log record to the collector")]
    EmitLog {
        message: String,
        #[arg(long, default_value = "INFO")]
        severity: String,
    },
    #[command(about = "Print the rendered storefront page")]
    Page,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::load().context("load config")?;
    if let Some(url) = cli.collector_url {
        cfg.collector_url = url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Serve { bind, database_url } => {
            if let Some(v) = bind {
                cfg.bind_addr = v;
            }
            if let Some(v) = database_url {
                cfg.db.url = Some(v);
            }
            init_serve_tracing(SelfTrace::from_env(), &cfg.service_name);
            let res = serve(cfg).await;
            shutdown_tracing();
            res
        }
        Commands::InitDb { database_url } => {
            init_cli_tracing();
            if let Some(v) = database_url {
                cfg.db.url = Some(v);
            }
            let store = Store::connect(&cfg.db)
                .await
                .context("initialize orders schema")?;
            store.close().await;
            println!("orders schema ready ({:?})", store.backend());
            Ok(())
        }
        Commands::EmitLog { message, severity } => {
            init_cli_tracing();
            let severity = Severity::from_str(&severity)?;
            let telemetry = Telemetry::from_config(&cfg)?;
            telemetry.logger("rumshop.cli").emit(message, severity, None);
            telemetry.shutdown().await;
            Ok(())
        }
        Commands::Page => {
            print!("{}", render(&PageConfig::from_config(&cfg)));
            Ok(())
        }
    }
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = cfg
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.bind_addr))?;
    let store = Store::connect_lazy(&cfg.db).context("configure database pool")?;
    if let Err(err) = store.ensure_schema().await {
        // Requests keep failing with 500 until the database comes back.
        tracing::warn!(error = %err, "database unavailable at startup");
    }

    let telemetry = Telemetry::from_config(&cfg).context("configure telemetry")?;
    let page = render(&PageConfig::from_config(&cfg));
    let app = router(AppState::new(store.clone(), &telemetry, page));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    eprintln!("rumshop serve");
    eprintln!("  http: http://{}", listener.local_addr()?);
    eprintln!("  collector: {}", cfg.collector_url);
    eprintln!("  export mode: {}", cfg.export.mode);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("http server")?;

    telemetry.shutdown().await;
    store.close().await;
    Ok(())
}
