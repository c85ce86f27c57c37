use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use mrp_api::{
    auth::{AuthConfig, AuthService, NewUser},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::build,
    export::ExportFormat,
    services::{
        bom::BomService,
        build::{BuildFilter, BuildService, BuildView},
        part::{IpnMatch, PartService},
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db).await?;
            println!("Migrations applied");
        }
        Commands::Users(command) => handle_users_command(&context, command, cli.json).await?,
        Commands::Builds(command) => handle_builds_command(&context, command, cli.json).await?,
        Commands::Parts(command) => handle_parts_command(&context, command, cli.json).await?,
        Commands::Bom(command) => handle_bom_command(&context, command).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "mrp", about = "MRP operator CLI for users, parts and build orders", version)]
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
    /// Apply pending database migrations
    Migrate,
    #[command(subcommand)]
    Users(UsersCommands),
    #[command(subcommand)]
    Builds(BuildsCommands),
    #[command(subcommand)]
    Parts(PartsCommands),
    #[command(subcommand)]
    Bom(BomCommands),
}

#[derive(Subcommand)]
enum UsersCommands {
    /// Create a user account
    Create(CreateUserArgs),
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, action = ArgAction::SetTrue)]
    superuser: bool,
    /// Role groups or rules, comma separated (e.g. `viewer,build.change`)
    #[arg(long, value_delimiter = ',')]
    roles: Vec<String>,
}

#[derive(Subcommand)]
enum BuildsCommands {
    /// List build orders
    List(ListBuildsArgs),
    /// Show a build order by primary key or reference
    Show { build: String },
    /// Cancel an active build order
    Cancel {
        build: String,
        #[arg(long, action = ArgAction::SetTrue)]
        remove_outputs: bool,
    },
    /// Complete an active build order
    Complete {
        build: String,
        #[arg(long, action = ArgAction::SetTrue)]
        accept_incomplete: bool,
    },
}

#[derive(Args)]
struct ListBuildsArgs {
    #[arg(long)]
    active: Option<bool>,
    #[arg(long)]
    overdue: Option<bool>,
    #[arg(long)]
    part: Option<i32>,
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum PartsCommands {
    /// Resolve an internal part number
    Ipn { ipn: String },
    /// Set or clear the IPN of a part
    SetIpn {
        pk: i32,
        ipn: Option<String>,
    },
}

#[derive(Subcommand)]
enum BomCommands {
    /// Export the BOM of an assembly
    Export {
        part: i32,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn auth_service(&self) -> AuthService {
        AuthService::new(AuthConfig::from_app_config(&self.config), self.db.clone())
    }

    fn build_service(&self) -> BuildService {
        BuildService::new(self.db.clone())
    }

    fn part_service(&self) -> PartService {
        PartService::new(self.db.clone())
    }

    fn bom_service(&self) -> BomService {
        BomService::new(self.db.clone())
    }

    /// Accepts a primary key or a reference such as `BO-0002`
    async fn find_build(&self, key: &str) -> Result<build::Model> {
        let service = self.build_service();
        let found = match key.parse::<i32>() {
            Ok(pk) => service.get(pk).await,
            Err(_) => service.get_by_reference(key).await,
        };
        found.with_context(|| format!("build '{}' not found", key))
    }
}

async fn handle_users_command(
    context: &CliContext,
    command: UsersCommands,
    json: bool,
) -> Result<()> {
    match command {
        UsersCommands::Create(args) => {
            let user = context
                .auth_service()
                .create_user(NewUser {
                    username: args.username,
                    email: args.email,
                    password: args.password,
                    is_superuser: args.superuser,
                    roles: args.roles,
                })
                .await
                .context("failed to create user")?;
            if json {
                print_json(&user)?;
            } else {
                println!("Created user {} (id {})", user.username, user.id);
            }
        }
    }
    Ok(())
}

async fn handle_builds_command(
    context: &CliContext,
    command: BuildsCommands,
    json: bool,
) -> Result<()> {
    let service = context.build_service();
    match command {
        BuildsCommands::List(args) => {
            let builds: Vec<BuildView> = service
                .list(BuildFilter {
                    active: args.active,
                    overdue: args.overdue,
                    part: args.part,
                    search: args.search,
                    ..Default::default()
                })
                .await?
                .into_iter()
                .map(BuildView::from)
                .collect();
            if json {
                print_json(&builds)?;
            } else if builds.is_empty() {
                println!("No build orders found");
            } else {
                builds.iter().for_each(render_build);
            }
        }
        BuildsCommands::Show { build } => {
            let view = BuildView::from(context.find_build(&build).await?);
            if json {
                print_json(&view)?;
            } else {
                render_build(&view);
                let outputs = service.outputs(view.build.id, None).await?;
                for output in outputs {
                    println!(
                        "    output {} • qty {} • {}",
                        output.id,
                        output.quantity.normalize(),
                        if output.is_building { "in production" } else { "complete" }
                    );
                }
            }
        }
        BuildsCommands::Cancel {
            build,
            remove_outputs,
        } => {
            let pk = context.find_build(&build).await?.id;
            let cancelled = service
                .cancel_build(pk, None, remove_outputs)
                .await
                .context("failed to cancel build")?;
            report_build(BuildView::from(cancelled), json)?;
        }
        BuildsCommands::Complete {
            build,
            accept_incomplete,
        } => {
            let pk = context.find_build(&build).await?.id;
            let completed = service
                .complete_build(pk, None, accept_incomplete)
                .await
                .context("failed to complete build")?;
            report_build(BuildView::from(completed), json)?;
        }
    }
    Ok(())
}

async fn handle_parts_command(
    context: &CliContext,
    command: PartsCommands,
    json: bool,
) -> Result<()> {
    let service = context.part_service();
    match command {
        PartsCommands::Ipn { ipn } => match service.resolve_ipn(&ipn).await? {
            IpnMatch::Unique(part) => {
                if json {
                    print_json(&part)?;
                } else {
                    println!("{} -> {} ({})", ipn, part.full_name(), part.get_absolute_url());
                }
            }
            IpnMatch::None => println!("No part has IPN '{}'", ipn),
            IpnMatch::Multiple(count) => println!("{} parts share IPN '{}'", count, ipn),
        },
        PartsCommands::SetIpn { pk, ipn } => {
            let part = service.set_ipn(pk, ipn).await?;
            if json {
                print_json(&part)?;
            } else {
                println!("Part {} is now {}", part.id, part.full_name());
            }
        }
    }
    Ok(())
}

async fn handle_bom_command(context: &CliContext, command: BomCommands) -> Result<()> {
    match command {
        BomCommands::Export {
            part,
            format,
            output,
        } => {
            let dataset = context.bom_service().export(part, format).await?;
            let bytes: Vec<u8> = dataset
                .encode(format)?
                .into_iter()
                .flat_map(|chunk| chunk.to_vec())
                .collect();
            match output {
                Some(path) => {
                    fs::write(&path, &bytes)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {} BOM rows to {}", dataset.len(), path.display());
                }
                None => print!("{}", String::from_utf8_lossy(&bytes)),
            }
        }
    }
    Ok(())
}

fn report_build(view: BuildView, json: bool) -> Result<()> {
    if json {
        print_json(&view)
    } else {
        render_build(&view);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_build(view: &BuildView) {
    println!(
        "- {} • {} • {}/{} • {}{}",
        view.build.reference,
        view.build.title,
        view.build.completed,
        view.build.quantity,
        view.status_label,
        if view.is_overdue { " • overdue" } else { "" }
    );
}
