use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use materialops_api::{
    auth::{AuthConfig, AuthService, Role},
    config::{self, AppConfig},
    db::{self, DbPool},
    events::{Event, EventSender},
    seed::{self, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD},
    services::MaterialService,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context, cli.json).await?,
        Commands::Seed => handle_seed(&context, cli.json).await?,
        Commands::CreateUser(args) => handle_create_user(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "materialops",
    about = "MaterialOps administration: schema, demo data and user accounts",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Create the admin account and starter materials if they are missing
    Seed,
    /// Create a user account
    CreateUser(CreateUserArgs),
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "VIEWER", value_parser = parse_role)]
    role: Role,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::from_str(&raw.trim().to_ascii_uppercase())
        .map_err(|_| format!("unknown role '{raw}' (expected VIEWER, OPERATOR or ADMIN)"))
}

#[derive(Serialize)]
struct CreatedUser {
    id: Uuid,
    email: String,
    name: String,
    role: String,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: EventSender,
    auth_service: Arc<AuthService>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        let event_sender = EventSender::new(event_tx);

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "materialops_cli", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            db,
            event_sender,
            auth_service,
        })
    }

    fn material_service(&self) -> MaterialService {
        MaterialService::new(self.db.clone(), self.event_sender.clone())
    }
}

async fn handle_migrate(context: &CliContext, json: bool) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;

    if json {
        print_json(&serde_json::json!({ "migrated": true }))?;
    } else {
        println!("Migrations applied ({})", context.config.environment);
    }
    Ok(())
}

async fn handle_seed(context: &CliContext, json: bool) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;

    let report = seed::seed_demo_data(
        &context.db,
        &context.auth_service,
        &context.material_service(),
    )
    .await
    .map_err(|e| anyhow!("failed to seed demo data: {e}"))?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Seed complete: {} user(s), {} material(s) created",
            report.users_created, report.materials_created
        );
        if report.users_created > 0 {
            println!("Admin login: {SEED_ADMIN_EMAIL} / {SEED_ADMIN_PASSWORD}");
        }
    }
    Ok(())
}

async fn handle_create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let user = context
        .auth_service
        .create_user(&args.email, &args.name, &args.password, args.role)
        .await
        .with_context(|| format!("failed to create user {}", args.email))?;

    let created = CreatedUser {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
    };

    if json {
        print_json(&created)?;
    } else {
        println!(
            "Created {} user {} <{}> ({})",
            created.role, created.name, created.email, created.id
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
