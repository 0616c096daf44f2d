//! `roster`: command-line entry point for the employee store.
//!
//! # Usage
//!
//! ```text
//! roster gen-key                         # print a fresh sin_key for roster.toml
//! roster serve                           # JSON admin API
//! roster import-employees staff.csv      # create-or-update by email
//! roster encrypt-sin --dry-run --verbose
//! roster create-superuser --email boss@example.com --first-name A --last-name B
//! ```
//!
//! Settings come from `roster.toml` (or `--config`) and `ROSTER_*`
//! environment variables.

mod encrypt_sin;
mod import;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use roster_admin::auth::hash_password;
use roster_core::{employee::EmployeeRecord, store::RosterStore as _};
use roster_store_sqlite::SinCipher;
use settings::Settings;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", author, version, about = "Employee record store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml", env = "ROSTER_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the JSON admin API.
  Serve,

  /// Copy plaintext SINs into the encrypted column.
  EncryptSin {
    /// Records per page.
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,
    /// Count what would change without writing.
    #[arg(long)]
    dry_run:    bool,
    /// Re-encrypt rows that already have an encrypted SIN.
    #[arg(long)]
    force:      bool,
    /// Log every record.
    #[arg(long)]
    verbose:    bool,
  },

  /// Create or update employees from a CSV file.
  ImportEmployees {
    #[arg(default_value = import::DEFAULT_CSV)]
    csv_file: PathBuf,
  },

  /// Create a staff superuser; the password is read from stdin.
  CreateSuperuser {
    #[arg(long)]
    email:      String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name:  String,
  },

  /// Print the argon2 hash for a password read from stdin.
  HashPassword,

  /// Print a new base64 key for the `sin_key` setting.
  GenKey,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::HashPassword => {
      let password = read_password()?;
      println!("{}", hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?);
      return Ok(());
    }
    Command::GenKey => {
      println!("{}", SinCipher::generate_key_base64());
      return Ok(());
    }
    _ => {}
  }

  let settings = Settings::load(&cli.config)?;
  let store = settings.open_store().await?;

  match cli.command {
    Command::Serve => {
      let app = roster_admin::admin_router(Arc::new(store));
      let address = format!("{}:{}", settings.host, settings.port);

      info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
      axum::serve(listener, app).await.context("server error")?;
    }

    Command::EncryptSin { batch_size, dry_run, force, verbose } => {
      let opts = encrypt_sin::Options { batch_size, dry_run, force, verbose };
      let report = encrypt_sin::run(&store, opts).await?;
      println!(
        "migrated: {}, skipped: {}, errors: {}",
        report.migrated, report.skipped, report.errors
      );
      if dry_run {
        println!("Dry run: no changes were written. Run without --dry-run to apply.");
      }
    }

    Command::ImportEmployees { csv_file } => {
      let report = import::run(&store, &csv_file).await?;
      println!(
        "created: {}, updated: {}, skipped: {}, errors: {}",
        report.created, report.updated, report.skipped, report.errors
      );
    }

    Command::CreateSuperuser { email, first_name, last_name } => {
      let password = read_password()?;
      if password.is_empty() {
        bail!("password must not be empty");
      }

      let mut record = EmployeeRecord::new(email, first_name, last_name);
      record.is_staff = true;
      record.is_superuser = true;

      let employee = match store.create_employee(record).await? {
        Ok(e) => e,
        Err(errors) => {
          let messages: Vec<&str> = errors.messages().collect();
          bail!("superuser rejected: {}", messages.join("; "));
        }
      };
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      store.set_password(employee.id, hash).await?;
      info!(employee_id = employee.id, email = %employee.record.email, "superuser created");
    }

    Command::HashPassword | Command::GenKey => {}
  }

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
