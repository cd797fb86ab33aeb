//! costwatch CLI: run the API and dispatcher, or poke the pipeline by hand.

use costwatch::api::{self, AppState};
use costwatch::config::{Config, ProviderEndpoints};
use costwatch::db::{Db, PgmqQueue};
use costwatch::engine::{BridgeConfig, DispatchBridge, FulfillmentWorker, TaskLauncher};
use costwatch::fetcher::ResultFetcher;
use costwatch::model::TurnEvent;
use costwatch::providers::http::http_client;
use costwatch::providers::{HttpCostProvider, HttpMetricsProvider, HttpPredictionService};
use costwatch::router::IntentRouter;
use costwatch::store::CorrelationStore;
use costwatch::telemetry::{TelemetryConfig, TelemetryGuard, init_telemetry};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(name = "costwatch", about = "Asynchronous cloud cost and utilization answers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the dispatcher in one process
    Serve,
    /// Run only the HTTP API (intent router + result fetcher)
    Api,
    /// Run only the dispatch bridge and fulfillment workers
    Dispatch,
    /// Route one conversational turn and print the dialogue response
    Turn {
        /// Conversation (session) id
        #[arg(long)]
        conversation: String,
        /// Classified intent name, e.g. CheckInstanceSize
        #[arg(long)]
        intent: Option<String>,
        /// Slot value as name=value; repeatable
        #[arg(long = "slot", value_parser = parse_slot)]
        slots: Vec<(String, String)>,
        /// Raw utterance text
        #[arg(long)]
        text: Option<String>,
    },
    /// Print every record of a conversation
    Records {
        /// Conversation (session) id
        conversation: String,
    },
    /// Delete records completed more than N days ago
    Purge {
        #[arg(long)]
        older_than_days: u32,
    },
}

fn parse_slot(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve => cmd_run(config, true, true).await,
        Command::Api => cmd_run(config, true, false).await,
        Command::Dispatch => cmd_run(config, false, true).await,
        Command::Turn {
            conversation,
            intent,
            slots,
            text,
        } => {
            let db = connect(&config).await?;
            cmd_turn(db, &config, conversation, intent, slots, text).await
        }
        Command::Records { conversation } => {
            let db = connect(&config).await?;
            cmd_records(db, conversation).await
        }
        Command::Purge { older_than_days } => {
            let db = connect(&config).await?;
            let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(older_than_days));
            let purged = db.purge_completed_before(cutoff).await?;
            println!("Purged {purged} record(s) completed before {cutoff}");
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<Arc<Db>> {
    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    db.create_queue(&config.queue_name).await?;
    Ok(Arc::new(db))
}

fn telemetry(config: &Config, role: &str) -> anyhow::Result<TelemetryGuard> {
    Ok(init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "costwatch".to_string(),
        log_level: config.log_level.clone(),
        role: role.to_string(),
        queue_name: config.queue_name.clone(),
    })?)
}

async fn cmd_run(config: Config, with_api: bool, with_dispatch: bool) -> anyhow::Result<()> {
    let role = match (with_api, with_dispatch) {
        (true, true) => "serve",
        (true, false) => "api",
        _ => "dispatch",
    };
    let _guard = telemetry(&config, role)?;
    let db = connect(&config).await?;
    let queue = Arc::new(PgmqQueue::new(Arc::clone(&db), config.queue_name.clone()));
    info!(queue = queue.queue_name(), "work queue ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let mut tasks = tokio::task::JoinSet::new();

    let mut launcher = None;
    if with_dispatch {
        let endpoints = ProviderEndpoints::from_config(&config)?;
        let client = http_client()?;
        let worker = FulfillmentWorker::new(
            db.clone(),
            Arc::new(HttpMetricsProvider::new(client.clone(), endpoints.metrics_url)),
            Arc::new(HttpCostProvider::new(client.clone(), endpoints.cost_url)),
            Arc::new(HttpPredictionService::new(
                client,
                endpoints.prediction_url,
                endpoints.prediction_api_key,
            )),
        );
        let task_launcher = Arc::new(TaskLauncher::new(
            Arc::new(worker),
            config.max_concurrent_workflows,
        ));
        let bridge = DispatchBridge::new(
            queue.clone(),
            task_launcher.clone(),
            BridgeConfig {
                visibility_timeout: config.visibility_timeout,
                poll_interval: config.poll_interval,
            },
        );

        let stopper = bridge.clone();
        let mut rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let _ = rx.wait_for(|stop| *stop).await;
            stopper.shutdown();
        });
        tasks.spawn(async move { bridge.run().await });
        launcher = Some(task_launcher);
    }

    if with_api {
        let state = AppState::new(
            IntentRouter::new(queue.clone()),
            ResultFetcher::new(db.clone()),
        );
        let addr = config.bind_addr.clone();
        let mut rx = shutdown_rx.clone();
        let stopped = async move {
            let _ = rx.wait_for(|stop| *stop).await;
        };
        tasks.spawn(async move { api::serve(&addr, state, stopped).await });
    }

    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    if let Some(launcher) = launcher {
        info!(in_flight = launcher.in_flight(), "waiting for workflows to finish");
        launcher.wait_idle().await?;
    }
    Ok(())
}

async fn cmd_turn(
    db: Arc<Db>,
    config: &Config,
    conversation: String,
    intent: Option<String>,
    slots: Vec<(String, String)>,
    text: Option<String>,
) -> anyhow::Result<()> {
    let router = IntentRouter::new(Arc::new(PgmqQueue::new(db, config.queue_name.clone())));
    let turn = TurnEvent {
        session_id: Some(conversation),
        input_transcript: text,
        intent,
        slots: slots.into_iter().collect::<BTreeMap<_, _>>(),
    };
    let routed = router.route(turn).await;
    println!("{}", serde_json::to_string_pretty(&routed.response)?);
    Ok(())
}

async fn cmd_records(db: Arc<Db>, conversation: String) -> anyhow::Result<()> {
    let results = ResultFetcher::new(db).fetch(Some(&conversation)).await?;

    if results.responses.is_empty() {
        println!("No records for conversation {}.", results.conversation_id);
        return Ok(());
    }

    println!(
        "{:<36}  {:<18}  {:<7}  {:<16}  RESPONSE",
        "REQUEST ID", "INTENT", "STATUS", "COMPLETED"
    );
    println!("{}", "-".repeat(110));

    let mut records = results.responses;
    records.sort_by_key(|r| r.completed_at);
    for record in &records {
        let detail = record
            .response
            .as_deref()
            .or(record.error.as_deref())
            .unwrap_or("-");
        println!(
            "{:<36}  {:<18}  {:<7}  {:<16}  {}",
            record.request_id.to_string(),
            record.intent.as_str(),
            record.status.to_string(),
            record.completed_at.format("%Y-%m-%d %H:%M"),
            detail
        );
    }

    println!("\n{} record(s)", records.len());
    Ok(())
}
