//! Ticketsmith CLI - project and ticket management with automatic assignment

use clap::{Parser, Subcommand};
use serde::Serialize;
use ticketsmith_core::commands::{board, employee, organization, project};
use ticketsmith_core::config::Config;
use ticketsmith_core::engine::TicketService;
use ticketsmith_core::identity::resolve_caller;
use ticketsmith_core::prelude::*;
use ticketsmith_core::storage::DatabaseConfig;
use tracing::warn;

#[derive(Parser)]
#[command(name = "ticketsmith")]
#[command(author, version, about = "Project and ticket management with automatic developer assignment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage organizations
    Org {
        #[command(subcommand)]
        action: OrgAction,
    },

    /// Manage employees
    Employees {
        #[command(subcommand)]
        action: EmployeeAction,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Create and move tickets
    Tickets {
        #[command(subcommand)]
        action: TicketAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum OrgAction {
    /// Register an organization and its admin user
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        admin_name: String,
        #[arg(long)]
        admin_email: String,
    },
}

#[derive(Subcommand)]
enum EmployeeAction {
    /// Add an employee to an organization
    Add {
        #[arg(long)]
        org: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// ADMIN, MANAGER, DEVELOPER or MODERATOR
        #[arg(long)]
        role: String,
        /// Comma-separated skills
        #[arg(long)]
        skills: Option<String>,
    },
    /// List employees
    List {
        #[arg(long)]
        org: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Replace an employee's skills
    Skills {
        user_id: String,
        /// Comma-separated skills; empty clears them
        skills: String,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Create {
        #[arg(long)]
        org: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        manager: String,
        #[arg(long)]
        techlead: String,
        /// Comma-separated techstack
        #[arg(long)]
        techstack: Option<String>,
        /// Comma-separated developer ids
        #[arg(long)]
        contributors: Option<String>,
    },
    /// List the projects visible to a user
    List {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
    },
    /// Show a project board
    Show { id: String },
}

#[derive(Subcommand)]
enum TicketAction {
    /// Create a ticket from a free-text description
    Create {
        #[arg(long = "as", value_name = "USER_ID")]
        as_user: String,
        #[arg(long)]
        project: String,
        description: String,
    },
    /// Advance a ticket to the next status
    Advance {
        id: String,
        /// Expected next status; fails if the ticket is not one step before it
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so --format json stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ticketsmith=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Org { action } => cmd_org(action, &out).await,
        Commands::Employees { action } => cmd_employees(action, &out).await,
        Commands::Projects { action } => cmd_projects(action, &out).await,
        Commands::Tickets { action } => cmd_tickets(action, &out).await,
        Commands::Config { action } => cmd_config(action, &out),
        Commands::Doctor => cmd_doctor(&out).await,
    };

    result.map_err(|err| match err.downcast::<Error>() {
        Ok(err) => {
            if let Some(hint) = err.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            anyhow::anyhow!("[{}] {}", err.code(), err)
        }
        Err(err) => err,
    })
}

/// Output settings shared by every command
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print a value as JSON; returns false in text mode
    fn emit_json<T: Serialize>(&self, value: &T) -> anyhow::Result<bool> {
        if self.json() {
            println!("{}", serde_json::to_string_pretty(value)?);
            return Ok(true);
        }
        Ok(false)
    }
}

async fn open_database() -> anyhow::Result<(Config, Database)> {
    let config = Config::load()?;
    let db = Database::new(DatabaseConfig::from_config(&config)?).await?;
    Ok((config, db))
}

/// Split a comma-separated argument
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_role(value: &str) -> anyhow::Result<employee::Role> {
    Ok(value.parse::<employee::Role>()?)
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_org(action: OrgAction, out: &Output) -> anyhow::Result<()> {
    let (_, db) = open_database().await?;
    match action {
        OrgAction::Register {
            name,
            admin_name,
            admin_email,
        } => {
            let registration =
                organization::register_with_db(&db, &name, &admin_name, &admin_email).await?;
            if out.emit_json(&registration)? || out.quiet {
                return Ok(());
            }
            println!("Organization registered!");
            println!("  ID: {}", registration.organization.id);
            println!("  Name: {}", registration.organization.name);
            println!("  Domain: {}", registration.organization.extension);
            println!("  Plan: {}", registration.organization.plan.as_str());
            println!("  Admin: {} <{}>", registration.admin.name, registration.admin.email);
            println!("  Admin ID: {}", registration.admin.id);
        }
    }
    Ok(())
}

async fn cmd_employees(action: EmployeeAction, out: &Output) -> anyhow::Result<()> {
    let (_, db) = open_database().await?;
    match action {
        EmployeeAction::Add {
            org,
            name,
            email,
            role,
            skills,
        } => {
            let role = parse_role(&role)?;
            let user = employee::create_with_db(&db, &org, &name, &email, role, split_list(skills.as_deref()))
                .await?;
            if out.emit_json(&user)? || out.quiet {
                return Ok(());
            }
            println!("Employee created!");
            print_user(&user);
        }
        EmployeeAction::List { org, role } => {
            let role = role.as_deref().map(parse_role).transpose()?;
            let users = employee::list_with_db(&db, &org, role).await?;
            if out.emit_json(&users)? {
                return Ok(());
            }
            if users.is_empty() {
                if !out.quiet {
                    println!("No employees found.");
                }
                return Ok(());
            }
            for user in users {
                let skills = if user.skills.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", user.skills.join(", "))
                };
                println!("  {} - {} <{}> {}{}", user.id, user.name, user.email, user.role, skills);
            }
        }
        EmployeeAction::Skills { user_id, skills } => {
            let skills = split_list(Some(&skills));
            let user = employee::set_skills_with_db(&db, &user_id, &skills).await?;
            if out.emit_json(&user)? || out.quiet {
                return Ok(());
            }
            println!("Skills updated for {}: {}", user.name, user.skills.join(", "));
        }
    }
    Ok(())
}

fn print_user(user: &employee::User) {
    println!("  ID: {}", user.id);
    println!("  Name: {}", user.name);
    println!("  Email: {}", user.email);
    println!("  Role: {}", user.role);
    if !user.skills.is_empty() {
        println!("  Skills: {}", user.skills.join(", "));
    }
}

async fn cmd_projects(action: ProjectAction, out: &Output) -> anyhow::Result<()> {
    let (_, db) = open_database().await?;
    match action {
        ProjectAction::Create {
            org,
            title,
            description,
            manager,
            techlead,
            techstack,
            contributors,
        } => {
            let created = project::create_with_db(
                &db,
                &org,
                project::NewProject {
                    title,
                    description,
                    manager_id: manager,
                    techlead_id: techlead,
                    techstack: split_list(techstack.as_deref()),
                    contributors: split_list(contributors.as_deref()),
                },
            )
            .await?;
            if out.emit_json(&created)? || out.quiet {
                return Ok(());
            }
            println!("Project created successfully!");
            println!("  ID: {}", created.id);
            println!("  Title: {}", created.title);
            if !created.techstack.is_empty() {
                println!("  Techstack: {}", created.techstack.join(", "));
            }
        }
        ProjectAction::List { as_user } => {
            let caller = resolve_caller(&db, &as_user).await?;
            let projects = project::list_for_caller(&db, &caller).await?;
            if out.emit_json(&projects)? {
                return Ok(());
            }
            if projects.is_empty() {
                if !out.quiet {
                    println!("No projects found.");
                }
                return Ok(());
            }
            if !out.quiet {
                println!("Projects:");
            }
            for p in projects {
                println!("  {} - {} ({})", p.id, p.title, p.status.as_str());
            }
        }
        ProjectAction::Show { id } => {
            let view = board::board_with_db(&db, &id).await?;
            if out.emit_json(&view)? {
                return Ok(());
            }
            let name = |p: &Option<board::Person>| {
                p.as_ref().map(|p| p.name.clone()).unwrap_or_else(|| "-".to_string())
            };
            println!("Project: {}", view.project.title);
            println!("  ID: {}", view.project.id);
            println!("  Status: {}", view.project.status.as_str());
            println!("  Description: {}", view.project.description);
            println!("  Manager: {}", name(&view.manager));
            println!("  Tech lead: {}", name(&view.techlead));
            if !view.contributors.is_empty() {
                let names: Vec<_> = view.contributors.iter().map(|p| p.name.as_str()).collect();
                println!("  Contributors: {}", names.join(", "));
            }
            if !view.project.techstack.is_empty() {
                println!("  Techstack: {}", view.project.techstack.join(", "));
            }
            for column in &view.columns {
                println!();
                println!("{} ({})", column.title, column.tickets.len());
                for t in &column.tickets {
                    println!(
                        "  {} [{}] {} -> {}",
                        t.id,
                        t.priority,
                        t.title,
                        name(&t.developer)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn cmd_tickets(action: TicketAction, out: &Output) -> anyhow::Result<()> {
    let (config, db) = open_database().await?;
    match action {
        TicketAction::Create {
            as_user,
            project,
            description,
        } => {
            let caller = resolve_caller(&db, &as_user).await?;
            let service = TicketService::from_config(db, &config)?;
            let ticket = service.create_ticket(&caller, &project, &description).await?;
            if out.emit_json(&ticket)? || out.quiet {
                return Ok(());
            }
            println!("Ticket created!");
            print_ticket(&ticket);
        }
        TicketAction::Advance { id, to } => {
            let ticket = match to {
                Some(target) => {
                    let target = target.parse::<TicketStatus>()?;
                    ticketsmith_core::engine::advance_status(&db, &id, target).await?
                }
                None => ticketsmith_core::engine::advance_to_next(&db, &id).await?,
            };
            if out.emit_json(&ticket)? || out.quiet {
                return Ok(());
            }
            println!("Ticket {} is now {}", ticket.id, ticket.status);
        }
    }
    Ok(())
}

fn print_ticket(ticket: &Ticket) {
    println!("  ID: {}", ticket.id);
    println!("  Title: {}", ticket.title);
    println!("  Priority: {}", ticket.priority);
    println!("  Status: {}", ticket.status);
    println!(
        "  Developer: {}",
        ticket.developer_id.as_deref().unwrap_or("(unassigned)")
    );
    if !ticket.tags.is_empty() {
        println!("  Tags: {}", ticket.tags.join(", "));
    }
}

fn cmd_config(action: ConfigAction, out: &Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !out.quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            if out.json() {
                let map: serde_json::Map<String, serde_json::Value> = items
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (key, value) in items {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !out.quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(out: &Output) -> anyhow::Result<()> {
    let quiet = out.quiet;
    if !quiet {
        println!("Ticketsmith Health Check");
        println!("========================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            match config.llm.resolved_api_key() {
                Ok(Some(_)) => {
                    if !quiet {
                        let redacted = config.llm.redacted_api_key()?.unwrap_or_default();
                        println!("[OK] API Key: Configured ({})", redacted);
                    }
                }
                Ok(None) => {
                    all_ok = false;
                    warn!("API key not configured");
                    if !quiet {
                        println!("[!!] API Key: Not configured");
                        println!("     Set TICKETSMITH_API_KEY or OPENAI_API_KEY environment variable");
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] API Key: Error - {}", e);
                    }
                }
            }
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            None
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    let db_config = config
        .as_ref()
        .map(DatabaseConfig::from_config)
        .transpose()
        .ok()
        .flatten();
    match db_config {
        Some(db_config) => match Database::new(db_config).await {
            Ok(db) => match db.health_check().await {
                Ok(()) => {
                    if !quiet {
                        println!("[OK] Database: Connected");
                        println!("     Path: {}", db.path().display());
                    }
                    match db.migration_status().await {
                        Ok(status) if status.needs_migration => {
                            all_ok = false;
                            if !quiet {
                                println!(
                                    "[!!] Database: Migrations pending (v{} -> v{})",
                                    status.current_version, status.target_version
                                );
                            }
                        }
                        Ok(status) => {
                            if !quiet {
                                println!("[OK] Database: Schema v{}", status.current_version);
                            }
                        }
                        Err(e) => {
                            all_ok = false;
                            if !quiet {
                                println!("[!!] Database: Migration check failed - {}", e);
                            }
                        }
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: Health check failed - {}", e);
                    }
                }
            },
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Database: Failed to initialize - {}", e);
                }
            }
        },
        None => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: No usable configuration");
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
