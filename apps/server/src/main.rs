use anyhow::Context;
use clap::{Parser, Subcommand};
use harvestchat_config::load as load_config;
use harvestchat_database::{ConversationRepository, MessageRepository};
use harvestchat_gateway::{create_router, GatewayState};
use harvestchat_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "harvestchat-backend")]
#[command(about = "Harvestchat backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Seed the database with a demo conversation
    SeedData,
    /// Dump conversations and messages from the database
    DumpData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::SeedData => seed_data().await,
        Commands::DumpData => dump_data().await,
    }
}

async fn bootstrap() -> anyhow::Result<BackendServices> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Harvestchat backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(services.db_pool.clone(), &config.chat);
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(harvestchat_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    let services = bootstrap().await?;

    info!("seeding database with demo data");

    let conversations = ConversationRepository::new(services.db_pool.clone());
    let messages = MessageRepository::new(services.db_pool.clone());

    let conversation = conversations
        .create(&[1, 2])
        .await
        .context("failed to create demo conversation")?;

    messages
        .append(conversation.id, 1, "amina", "Fresh tomatoes available, 50kg")
        .await
        .context("failed to insert demo message")?;
    messages
        .append(conversation.id, 2, "bakary", "What price per kg?")
        .await
        .context("failed to insert demo message")?;

    println!("Database seeded:");
    println!("- conversation {} between principals 1 and 2", conversation.id);
    println!("- 2 messages");
    println!("Run 'dump-data' to see the inserted data");

    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    let services = bootstrap().await?;

    let conversations = ConversationRepository::new(services.db_pool.clone());
    let messages = MessageRepository::new(services.db_pool.clone());

    use sqlx::Row;
    let ids: Vec<i64> = sqlx::query("SELECT id FROM conversations ORDER BY id ASC")
        .fetch_all(&services.db_pool)
        .await
        .context("failed to fetch conversations")?
        .into_iter()
        .map(|row| row.get("id"))
        .collect();

    println!("=== CONVERSATIONS ===");
    if ids.is_empty() {
        println!("No conversations found in database");
        return Ok(());
    }

    for id in ids {
        let Some(conversation) = conversations
            .find_by_id(id)
            .await
            .context("failed to fetch conversation")?
        else {
            continue;
        };

        println!(
            "#{} participants={:?} updated_at={}",
            conversation.id, conversation.participant_ids, conversation.updated_at
        );

        for message in messages
            .list_for_conversation(conversation.id)
            .await
            .context("failed to fetch messages")?
        {
            let read_marker = if message.is_read { "read" } else { "unread" };
            println!(
                "  [{}] {} ({}): {}",
                read_marker, message.sender_username, message.created_at, message.content
            );
        }
    }

    Ok(())
}
