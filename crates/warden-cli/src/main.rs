//! Warden CLI - protected data administration

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;
use warden_core::config::Config;
use warden_core::diagnostics::init_tracing;
use warden_core::domain::access::{AccessGateway, EncryptionKey, FieldCipher, SUBJECT_RESOURCE_TYPE};
use warden_core::domain::audit::{AuditAction, AuditEventHandler, AuditQuery, AuditTrail, RequestOrigin};
use warden_core::domain::events::EventBus;
use warden_core::domain::notes::NoteService;
use warden_core::domain::protection::{FieldKind, FieldProtector, TransientSecret, hash_for_lookup};
use warden_core::domain::reveal::{
    RequestContext, RevealJustification, RevealNoteCommand, RevealOwnDataCommand, RevealReason,
    RevealService, RevealUserDataCommand,
};
use warden_core::domain::users::{UserCredentialVerifier, UserService};
use warden_core::infrastructure::{
    Argon2Hasher, Database, SqliteAuditRepository, SqliteNoteRepository, SqliteUserRepository,
};

const CLI_USER_AGENT: &str = concat!("warden-cli/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about = "Protected data encryption, redaction and audited access", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print the full cause chain of internal failures
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh base64 256-bit encryption key
    Keygen,

    /// Print the lookup hash of a value
    Hash {
        value: String,
    },

    /// Preview the redacted form of a value
    Redact {
        /// Redaction rule to apply
        #[arg(short, long, value_enum, default_value = "text")]
        kind: RedactKind,
        value: String,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Sensitive notes on resources
    Notes {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Audit trail
    Audit {
        #[command(subcommand)]
        action: AuditCommand,
    },

    /// Database maintenance
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RedactKind {
    Email,
    Text,
    Note,
}

impl From<RedactKind> for FieldKind {
    fn from(kind: RedactKind) -> Self {
        match kind {
            RedactKind::Email => FieldKind::Email,
            RedactKind::Text => FieldKind::Generic,
            RedactKind::Note => FieldKind::Note,
        }
    }
}

/// Justification flags shared by every reveal
#[derive(clap::Args)]
struct JustificationArgs {
    /// Reason category (support_ticket, legal_request, other, ...)
    #[arg(short, long)]
    reason: String,
    /// Free text; required when the reason is `other`
    #[arg(short, long)]
    details: Option<String>,
    #[arg(short, long)]
    comments: Option<String>,
}

impl JustificationArgs {
    fn into_justification(self) -> anyhow::Result<RevealJustification> {
        let Some(reason) = RevealReason::parse(&self.reason) else {
            let known: Vec<&str> = RevealReason::ALL.iter().map(|r| r.as_str()).collect();
            bail!("unknown reason '{}' (expected one of: {})", self.reason, known.join(", "));
        };
        let mut justification = RevealJustification::new(reason);
        if let Some(details) = self.details {
            justification = justification.with_details(details);
        }
        if let Some(comments) = self.comments {
            justification = justification.with_comments(comments);
        }
        Ok(justification)
    }
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user (password read from stdin)
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        name: String,
    },

    /// Reveal another user's protected data (password read from stdin)
    Reveal {
        /// Subject user ID
        subject: Uuid,
        /// Acting administrator ID
        #[arg(short, long)]
        actor: Uuid,
        #[command(flatten)]
        justification: JustificationArgs,
    },

    /// Reveal your own protected data (password read from stdin)
    RevealOwn {
        /// Your user ID
        #[arg(short, long)]
        actor: Uuid,
        #[command(flatten)]
        justification: JustificationArgs,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Attach an encrypted note to a resource
    Attach {
        resource_id: String,
        #[arg(short = 't', long, default_value = "resource")]
        resource_type: String,
        #[arg(short, long)]
        note: String,
    },

    /// Reveal the note on a resource (password read from stdin)
    Reveal {
        resource_id: String,
        #[arg(short, long)]
        actor: Uuid,
        #[command(flatten)]
        justification: JustificationArgs,
    },
}

#[derive(Subcommand)]
enum AuditCommand {
    /// Search audit entries, newest first
    Search {
        /// Inclusive lower bound (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Inclusive upper bound (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        actor: Option<Uuid>,
        #[arg(long)]
        resource_type: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Defaults to the configured page size
        #[arg(long)]
        page_size: Option<u32>,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Show the schema version and check connectivity
    Status,
    /// Apply pending schema migrations
    Migrate,
}

/// Services wired against the configured database and key
struct App {
    db: Database,
    users: UserService,
    notes: NoteService,
    reveal: RevealService,
    audit: AuditTrail,
}

impl App {
    async fn open(config: &Config) -> anyhow::Result<Self> {
        let key = config.load_encryption_key()?;
        let cipher = Arc::new(FieldCipher::new(&key));
        let db = Database::new(config.database_config())
            .await
            .with_context(|| format!("failed to open database at {}", config.database.path.display()))?;

        let user_repo = Arc::new(SqliteUserRepository::new(db.pool().clone()));
        let note_repo = Arc::new(SqliteNoteRepository::new(db.pool().clone()));
        let audit = AuditTrail::new(Arc::new(SqliteAuditRepository::new(db.pool().clone())))
            .with_page_limits(config.audit.default_page_size, config.audit.max_page_size);
        let hasher = Arc::new(Argon2Hasher::new()?);

        let bus = EventBus::new().subscribe(Arc::new(AuditEventHandler::new(
            audit.clone(),
            SUBJECT_RESOURCE_TYPE,
        )));
        let protector = FieldProtector::new(cipher.clone());
        let users = UserService::new(user_repo.clone(), protector.clone(), hasher.clone(), Arc::new(bus));
        let notes = NoteService::new(note_repo.clone(), protector);

        let gateway = Arc::new(AccessGateway::new(cipher, user_repo.clone(), note_repo, audit.clone()));
        let verifier = Arc::new(UserCredentialVerifier::new(user_repo, hasher));
        let reveal = RevealService::new(gateway, verifier, audit.clone());

        Ok(Self {
            db,
            users,
            notes,
            reveal,
            audit,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Environment first so WARDEN_* variables from .env are visible
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config.logging)?;

    // Startup failures above and in App::open are fatal and print as-is
    let result = match cli.command {
        Commands::Keygen => cmd_keygen(cli.quiet),
        Commands::Hash { value } => cmd_hash(&value),
        Commands::Redact { kind, value } => cmd_redact(kind, &value),
        Commands::Users { action } => {
            let app = App::open(&config).await?;
            let result = cmd_users(&app, action, cli.quiet).await;
            app.db.close().await;
            result
        }
        Commands::Notes { action } => {
            let app = App::open(&config).await?;
            let result = cmd_notes(&app, action, cli.quiet).await;
            app.db.close().await;
            result
        }
        Commands::Audit { action } => {
            let app = App::open(&config).await?;
            let result = cmd_audit(&app, action).await;
            app.db.close().await;
            result
        }
        Commands::Db { action } => {
            let db = Database::new(config.database_config().no_migrate())
                .await
                .with_context(|| format!("failed to open database at {}", config.database.path.display()))?;
            let result = cmd_db(&db, action, cli.quiet).await;
            db.close().await;
            result
        }
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            report_error(&err, cli.debug);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print a command failure without leaking storage internals
///
/// Core errors print as their caller-facing code and message. The cause
/// chain of an internal failure is shown only with `--debug`.
fn report_error(err: &anyhow::Error, debug: bool) {
    let Some(core) = err.downcast_ref::<warden_core::Error>() else {
        eprintln!("Error: {:#}", err);
        return;
    };

    let response = core.to_response();
    eprintln!("Error [{}]: {}", response.code, response.message);
    if debug && core.is_internal() {
        eprintln!("{:?}", err);
    }
}

fn cmd_keygen(quiet: bool) -> anyhow::Result<()> {
    let key = EncryptionKey::generate();
    println!("{}", key.to_base64());
    if !quiet {
        eprintln!("Store this key in WARDEN_ENCRYPTION_KEY. It cannot be recovered.");
    }
    Ok(())
}

fn cmd_hash(value: &str) -> anyhow::Result<()> {
    println!("{}", hash_for_lookup(value));
    Ok(())
}

fn cmd_redact(kind: RedactKind, value: &str) -> anyhow::Result<()> {
    println!("{}", FieldKind::from(kind).redact(value));
    Ok(())
}

async fn cmd_users(app: &App, action: UserAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        UserAction::Register { email, name } => {
            let password = read_password(quiet)?;
            let origin = RequestOrigin {
                ip_address: None,
                user_agent: Some(CLI_USER_AGENT.to_string()),
            };
            let user = app.users.register(&email, &name, &password, &origin).await?;
            if quiet {
                println!("{}", user.id);
            } else {
                println!("User registered successfully!");
                println!("  ID: {}", user.id);
                println!("  Email: {}", user.email);
                println!("  Name: {}", user.display_name);
            }
        }

        UserAction::Reveal {
            subject,
            actor,
            justification,
        } => {
            let justification = justification.into_justification()?;
            let password = read_password(quiet)?;
            let revealed = app
                .reveal
                .reveal_user_data(RevealUserDataCommand {
                    context: cli_context(actor),
                    subject_id: subject,
                    justification,
                    password,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&revealed)?);
        }

        UserAction::RevealOwn {
            actor,
            justification,
        } => {
            let justification = justification.into_justification()?;
            let password = read_password(quiet)?;
            let revealed = app
                .reveal
                .reveal_own_data(RevealOwnDataCommand {
                    context: cli_context(actor),
                    justification,
                    password,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&revealed)?);
        }
    }
    Ok(())
}

async fn cmd_notes(app: &App, action: NoteAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        NoteAction::Attach {
            resource_id,
            resource_type,
            note,
        } => {
            let stored = app.notes.attach_note(&resource_id, &resource_type, &note).await?;
            if !quiet {
                println!("Note attached to {} '{}'.", stored.resource_type, stored.resource_id);
            }
        }

        NoteAction::Reveal {
            resource_id,
            actor,
            justification,
        } => {
            let justification = justification.into_justification()?;
            let password = read_password(quiet)?;
            let revealed = app
                .reveal
                .reveal_note(RevealNoteCommand {
                    context: cli_context(actor),
                    resource_id,
                    justification,
                    password,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&revealed)?);
        }
    }
    Ok(())
}

async fn cmd_audit(app: &App, action: AuditCommand) -> anyhow::Result<()> {
    match action {
        AuditCommand::Search {
            from,
            to,
            action,
            actor,
            resource_type,
            page,
            page_size,
        } => {
            let action = match action.as_deref() {
                Some(name) => Some(
                    AuditAction::parse(name)
                        .with_context(|| format!("unknown audit action '{}'", name))?,
                ),
                None => None,
            };
            let query = AuditQuery {
                date_from: from,
                date_to: to,
                action,
                actor_id: actor,
                resource_type,
                page,
                // zero selects the configured default
                page_size: page_size.unwrap_or(0),
            };
            let page = app.audit.search(query).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }
    Ok(())
}

async fn cmd_db(db: &Database, action: DbAction, quiet: bool) -> anyhow::Result<()> {
    if let DbAction::Migrate = action {
        db.migrate().await?;
    }
    db.health_check().await?;

    let status = db.migration_status().await?;
    if quiet {
        println!("{}", status.applied_version);
        return Ok(());
    }

    println!("Database: {}", db.path().display());
    println!(
        "  Schema version: {} (expected {})",
        status.applied_version, status.expected_version
    );
    if status.is_current() {
        println!("  Status: up to date");
    } else {
        println!(
            "  Status: {} migration(s) pending, run `warden db migrate`",
            status.expected_version - status.applied_version
        );
    }
    Ok(())
}

fn cli_context(actor: Uuid) -> RequestContext {
    RequestContext {
        actor_id: actor,
        ip_address: None,
        user_agent: Some(CLI_USER_AGENT.to_string()),
    }
}

/// Read one line from stdin as the password
fn read_password(quiet: bool) -> anyhow::Result<TransientSecret> {
    if !quiet {
        eprintln!("Password (read from stdin):");
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = TransientSecret::new(line.trim_end_matches(['\r', '\n']));
    if password.is_empty() {
        bail!("no password supplied on stdin");
    }
    Ok(password)
}
