//! incident-agent CLI: run the agent, inspect incidents.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use incident_agent::cluster::KubeClusterReader;
use incident_agent::config::Config;
use incident_agent::config::secrets::ExposeSecret;
use incident_agent::db::Db;
use incident_agent::dispatch::PgmqDispatcher;
use incident_agent::engine::{
    ControllerConfig, Correlator, CorrelatorConfig, Reconciler, run_controller,
};
use incident_agent::model::{IncidentId, IncidentState};
use incident_agent::telemetry::{TelemetryConfig, init_telemetry};
use tokio::sync::Notify;

#[derive(Parser)]
#[command(name = "incident-agent", about = "Pod failure classification and incident correlation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch pods and correlate incidents
    Serve {
        /// Don't run the correlator in this process
        #[arg(long)]
        no_correlator: bool,
    },
    /// Incident operations
    Incident {
        #[command(subcommand)]
        action: IncidentAction,
    },
}

#[derive(Subcommand)]
enum IncidentAction {
    /// List incidents
    List {
        /// Filter by release name (requires --namespace)
        #[arg(long, requires = "namespace")]
        release: Option<String>,
        /// Filter by namespace (requires --release)
        #[arg(long, requires = "release")]
        namespace: Option<String>,
        /// Filter by state (ONGOING or RESOLVED)
        #[arg(long)]
        state: Option<String>,
        /// Maximum incidents to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show an incident and its event history
    Show {
        /// Incident ID (incident:<release>:<namespace>)
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { no_correlator } => cmd_serve(config, no_correlator).await,
        Command::Incident { action } => {
            let db =
                Db::connect(config.database_url.expose_secret(), config.db_max_connections).await?;
            db.migrate().await?;

            match action {
                IncidentAction::List {
                    release,
                    namespace,
                    state,
                    limit,
                } => cmd_incident_list(&db, release.zip(namespace), state, limit).await,
                IncidentAction::Show { id } => cmd_incident_show(&db, id).await,
            }
        }
    }
}

async fn cmd_serve(config: Config, no_correlator: bool) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "incident-agent".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let db = Arc::new(
        Db::connect(config.database_url.expose_secret(), config.db_max_connections).await?,
    );
    db.migrate().await?;

    let dispatcher = PgmqDispatcher::new(Arc::clone(&db), &config.event_queue, &config.log_queue);
    dispatcher.ensure_queues().await?;

    let client = kube::Client::try_default().await?;
    let reconciler = Reconciler::new(
        Arc::new(KubeClusterReader::new(client.clone())),
        Arc::new(dispatcher),
    )
    .cluster_name(config.cluster_name.clone());

    let correlator = (!no_correlator).then(|| {
        Correlator::new(
            Arc::clone(&db),
            CorrelatorConfig {
                queue: config.event_queue.clone(),
                ..CorrelatorConfig::default()
            },
        )
    });

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        let correlator = correlator.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            shutdown.notify_one();
            if let Some(c) = correlator {
                c.shutdown();
            }
        });
    }

    let correlator_task = correlator.map(|c| tokio::spawn(async move { c.run().await }));

    run_controller(
        client,
        reconciler,
        ControllerConfig {
            namespace: config.watch_namespace.clone(),
            requeue_after: config.requeue_after,
            error_requeue_after: config.error_requeue_after,
        },
        shutdown,
    )
    .await?;

    if let Some(task) = correlator_task {
        task.await??;
    }
    Ok(())
}

async fn cmd_incident_list(
    db: &Db,
    release: Option<(String, String)>,
    state: Option<String>,
    limit: i64,
) -> anyhow::Result<()> {
    let state: Option<IncidentState> = state.map(|s| s.parse()).transpose()?;
    let release = release
        .as_ref()
        .map(|(name, namespace)| (name.as_str(), namespace.as_str()));

    let incidents = db.list_incidents(release, state, limit).await?;
    if incidents.is_empty() {
        println!("No incidents found.");
        return Ok(());
    }

    println!(
        "{:<40}  {:<9}  {:<6}  {:<40}  UPDATED",
        "ID", "STATE", "EVENTS", "LATEST_REASON"
    );
    println!("{}", "-".repeat(120));

    for incident in &incidents {
        let reason: String = incident
            .latest_reason()
            .lines()
            .next()
            .unwrap_or("-")
            .chars()
            .take(40)
            .collect();
        println!(
            "{:<40}  {:<9}  {:<6}  {:<40}  {}",
            incident.id.to_string(),
            incident.state,
            incident.events.len(),
            reason,
            incident.updated_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!("\n{} incident(s)", incidents.len());
    Ok(())
}

async fn cmd_incident_show(db: &Db, id: String) -> anyhow::Result<()> {
    let id: IncidentId = id.parse()?;
    let incident = db.get_incident(&id).await?;

    println!("ID:         {}", incident.id);
    println!("Release:    {}", incident.id.release_name());
    println!("Namespace:  {}", incident.id.namespace());
    println!("State:      {}", incident.state);
    println!("Created:    {}", incident.created_at);
    println!("Updated:    {}", incident.updated_at);
    println!("Reason:     {}", incident.latest_reason());
    println!("Message:    {}", incident.latest_message());
    println!("---");
    println!("{}", serde_json::to_string_pretty(&incident.events)?);

    Ok(())
}
