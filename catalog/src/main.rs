//! Portfolio catalog: enterprise-architecture application inventory.
//!
//! Seeds a synthetic bank portfolio through an LLM, then serves catalog
//! queries, dashboard figures and assistant features from the command line.

mod assistant;
mod bootstrap;
mod config;
mod console;
mod dashboard;
mod llm;
mod metrics;
mod models;
mod schema;
mod seeder;
mod services;
mod store;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use assistant::diagram::{local_diagram, DiagramOutcome};
use assistant::qa::QaAnswer;
use assistant::{Assistant, AssistantError, PgContext, PortfolioContext};
use config::PortfolioConfig;
use llm::ChatCompletionClient;
use models::integration::NewIntegration;
use seeder::SeedOptions;
use services::catalog_service::{self, AppFilter};
use store::{MemoryStore, PgPool, PgStore, PortfolioStore};

/// Client identity for requests made from this process.
const LOCAL_CLIENT: &str = "cli";

#[derive(Parser)]
#[command(name = "portfolio", about = "Enterprise-architecture portfolio catalog")]
struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a mock portfolio through the LLM
    Seed(SeedArgs),
    /// Portfolio KPIs
    Dashboard,
    #[command(subcommand)]
    Apps(AppsCommand),
    #[command(subcommand)]
    Integrations(IntegrationsCommand),
    /// Ask a free-text question about the portfolio
    Ask {
        question: String,
        #[arg(long)]
        session: Option<String>,
    },
    /// Summary, risks and modernisation candidates
    Analyze,
    /// Mermaid diagram of an application's integrations
    Diagram {
        id: i64,
        /// Render without the LLM
        #[arg(long)]
        offline: bool,
    },
    /// Short generated description of an application
    Describe { id: i64 },
    /// Interactive assistant session
    Console,
}

#[derive(Args)]
struct SeedArgs {
    /// Applications to generate
    #[arg(long, default_value_t = 40)]
    apps: usize,
    /// Delete all portfolio data first
    #[arg(long)]
    wipe: bool,
    /// Applications requested per LLM call
    #[arg(long, default_value_t = 8)]
    batch: usize,
    #[arg(long, default_value_t = 25)]
    max_attempts: usize,
    /// Integrations requested per LLM call
    #[arg(long, default_value_t = 25)]
    int_batch: usize,
    #[arg(long, default_value_t = 12)]
    int_max_attempts: usize,
    /// Seed for the fallback and post-processing randomness
    #[arg(long)]
    seed: Option<u64>,
    /// Run against an in-memory store and leave the database untouched
    #[arg(long)]
    dry_run: bool,
}

impl From<&SeedArgs> for SeedOptions {
    fn from(args: &SeedArgs) -> Self {
        Self {
            apps: args.apps,
            wipe: args.wipe,
            batch: args.batch,
            max_attempts: args.max_attempts,
            int_batch: args.int_batch,
            int_max_attempts: args.int_max_attempts,
        }
    }
}

#[derive(Subcommand)]
enum AppsCommand {
    /// List applications matching the filters
    List(FilterArgs),
    /// Full detail of one application
    Show { id: i64 },
}

#[derive(Args)]
struct FilterArgs {
    /// Text matched against name, domain, vendor and tech stack
    #[arg(long)]
    q: Option<String>,
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    criticality: Option<String>,
    #[arg(long)]
    environment: Option<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    hosting: Option<String>,
    #[arg(long)]
    vendor: Option<String>,
    #[arg(long)]
    data_sensitivity: Option<String>,
}

impl From<FilterArgs> for AppFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            q: args.q,
            domain: args.domain,
            criticality: args.criticality,
            environment: args.environment,
            region: args.region,
            hosting: args.hosting,
            vendor: args.vendor,
            data_sensitivity: args.data_sensitivity,
        }
    }
}

#[derive(Subcommand)]
enum IntegrationsCommand {
    List,
    Create(IntegrationFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: IntegrationFields,
    },
    Delete { id: i64 },
}

#[derive(Args)]
struct IntegrationFields {
    #[arg(long)]
    source: i64,
    #[arg(long)]
    target: i64,
    #[arg(long = "type", default_value = "API")]
    integration_type: String,
    #[arg(long, default_value = "async")]
    direction: String,
    #[arg(long, default_value_t = 0)]
    volume: i64,
    #[arg(long, default_value = "Medium")]
    sensitivity: String,
    #[arg(long, default_value = "")]
    transport: String,
    #[arg(long, default_value = "")]
    frequency: String,
    #[arg(long, default_value = "")]
    interface: String,
}

impl From<IntegrationFields> for NewIntegration {
    fn from(f: IntegrationFields) -> Self {
        Self {
            source_app_id: f.source,
            target_app_id: f.target,
            integration_type: f.integration_type,
            direction: f.direction,
            daily_volume: f.volume,
            data_sensitivity: f.sensitivity,
            transport: f.transport,
            frequency: f.frequency,
            interface_name: f.interface,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();
    let mut config = PortfolioConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr);
    }

    // Offline runs never touch the database.
    if let Command::Seed(args) = &cli.command {
        if args.dry_run {
            return seed(&config, args, &MemoryStore::new()).await;
        }
    }

    let pool = store::connect_pool(&config.database_url)?;
    bootstrap::ensure_tables(&mut *connection(&pool).await?).await?;

    match cli.command {
        Command::Seed(args) => seed(&config, &args, &PgStore::new(pool)).await,
        Command::Dashboard => {
            let mut conn = connection(&pool).await?;
            let stats = dashboard::kpi::dashboard_stats(&mut conn).await?;
            println!("{stats}");
            Ok(())
        }
        Command::Apps(cmd) => apps(&pool, cmd).await,
        Command::Integrations(cmd) => integrations(&pool, cmd).await,
        Command::Diagram { id, offline: true } => {
            match PgContext::new(pool).neighbourhood(id).await? {
                Some(hood) => println!("{}", local_diagram(&hood)),
                None => println!("Application {id} not found."),
            }
            Ok(())
        }
        Command::Console => console::run(build_assistant(&config, pool)?).await,
        Command::Ask { question, session } => {
            let assistant = build_assistant(&config, pool)?;
            let reply = assistant
                .ask_question(LOCAL_CLIENT, session.as_deref(), &question)
                .await;
            print_reply(reply, print_answer)
        }
        Command::Analyze => {
            let assistant = build_assistant(&config, pool)?;
            print_reply(assistant.analyze_portfolio(LOCAL_CLIENT).await, |a| {
                println!("{}", a.text)
            })
        }
        Command::Diagram { id, .. } => {
            let assistant = build_assistant(&config, pool)?;
            print_reply(assistant.generate_diagram(LOCAL_CLIENT, id).await, print_diagram)
        }
        Command::Describe { id } => {
            let assistant = build_assistant(&config, pool)?;
            print_reply(assistant.describe_application(LOCAL_CLIENT, id).await, |text| {
                println!("{text}")
            })
        }
    }
}

async fn connection(
    pool: &PgPool,
) -> anyhow::Result<diesel_async::pooled_connection::deadpool::Object<diesel_async::AsyncPgConnection>>
{
    pool.get()
        .await
        .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))
}

fn build_assistant(config: &PortfolioConfig, pool: PgPool) -> anyhow::Result<Assistant> {
    let generator = ChatCompletionClient::new(config.llm.clone())?;
    Ok(Assistant::new(
        Arc::new(generator),
        Arc::new(PgContext::new(pool)),
        config.into(),
    ))
}

/// Print a successful reply, or the user-facing message of a failure.
fn print_reply<T>(result: Result<T, AssistantError>, show: impl FnOnce(T)) -> anyhow::Result<()> {
    match result {
        Ok(value) => show(value),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}

fn print_answer(reply: QaAnswer) {
    println!("{}\n", reply.conversation.answer);
    for app in &reply.cited {
        println!("  -> #{} {} ({})", app.id, app.name, app.domain);
    }
    println!("session: {}", reply.conversation.session_id);
}

fn print_diagram(outcome: DiagramOutcome) {
    println!("{}", outcome.code());
    if let DiagramOutcome::Unverified { message, .. } = outcome {
        eprintln!("{message}");
    }
}

async fn seed(config: &PortfolioConfig, args: &SeedArgs, store: &dyn PortfolioStore) -> anyhow::Result<()> {
    let generator = ChatCompletionClient::new(config.llm.clone())?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let report = seeder::run_seed(args.into(), &generator, store, &mut rng).await?;
    println!("{report}");
    Ok(())
}

async fn apps(pool: &PgPool, cmd: AppsCommand) -> anyhow::Result<()> {
    let mut conn = connection(pool).await?;
    match cmd {
        AppsCommand::List(args) => {
            let filter = AppFilter::from(args);
            let rows = catalog_service::list_applications(&mut conn, &filter).await?;
            let facets = catalog_service::facets(&mut conn, &filter).await?;
            for app in &rows {
                println!(
                    "{:>5}  {:<40} {:<16} {:<8} {:<5} debt {}",
                    app.id, app.name, app.domain, app.criticality, app.environment, app.tech_debt_score
                );
            }
            println!("{} of {} applications", facets.filtered_count, facets.total_count);
        }
        AppsCommand::Show { id } => match catalog_service::application_detail(&mut conn, id).await? {
            Some(detail) => println!("{}", serde_json::to_string_pretty(&detail)?),
            None => println!("Application {id} not found."),
        },
    }
    Ok(())
}

async fn integrations(pool: &PgPool, cmd: IntegrationsCommand) -> anyhow::Result<()> {
    let mut conn = connection(pool).await?;
    match cmd {
        IntegrationsCommand::List => {
            for view in catalog_service::list_integrations(&mut conn).await? {
                let i = &view.integration;
                println!(
                    "{:>5}  {} -> {}  [{} / {}]  {} per day",
                    i.id, view.source_name, view.target_name, i.integration_type, i.direction, i.daily_volume
                );
            }
        }
        IntegrationsCommand::Create(fields) => {
            let created = catalog_service::create_integration(&mut conn, fields.into()).await?;
            println!("Created integration {}", created.id);
        }
        IntegrationsCommand::Update { id, fields } => {
            let updated = catalog_service::update_integration(&mut conn, id, fields.into()).await?;
            println!("Updated integration {}", updated.id);
        }
        IntegrationsCommand::Delete { id } => {
            catalog_service::delete_integration(&mut conn, id).await?;
            println!("Deleted integration {id}");
        }
    }
    Ok(())
}
