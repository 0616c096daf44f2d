//! `roster import-employees`: upsert employees from a CSV export.

use std::{collections::HashMap, io::Read, path::Path};

use anyhow::{Context as _, Result};
use roster_core::{
  import::{ImportedEmployee, UpsertOutcome},
  store::RosterStore,
};
use tracing::{info, warn};

/// Default file name when none is given on the command line.
pub const DEFAULT_CSV: &str = "employees_employee.csv";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
  pub created: u64,
  pub updated: u64,
  pub skipped: u64,
  pub errors:  u64,
}

/// Rows ready for the store, tagged with their line number in the file.
struct Parsed {
  rows:    Vec<(u64, ImportedEmployee)>,
  skipped: u64,
  errors:  u64,
}

fn parse(mut reader: impl Read) -> Result<Parsed> {
  let mut content = String::new();
  reader.read_to_string(&mut content).context("file is not valid UTF-8")?;
  let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

  let mut csv = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .flexible(true)
    .from_reader(content.as_bytes());
  let headers: Vec<String> = csv
    .headers()
    .context("failed to read CSV header")?
    .iter()
    .map(|h| h.trim().to_owned())
    .collect();

  let mut parsed = Parsed { rows: Vec::new(), skipped: 0, errors: 0 };

  // Line 1 is the header.
  for (row_number, record) in (2u64..).zip(csv.records()) {
    let record = match record {
      Ok(r) => r,
      Err(e) => {
        parsed.errors += 1;
        warn!(row = row_number, error = %e, "unreadable row");
        continue;
      }
    };

    let fields: HashMap<String, String> = headers
      .iter()
      .cloned()
      .zip(record.iter().map(str::to_owned))
      .collect();

    if fields.get("email").is_none_or(|e| e.is_empty()) {
      parsed.skipped += 1;
      warn!(row = row_number, "skipping row with no email");
      continue;
    }

    match ImportedEmployee::from_row(&fields) {
      Ok(row) => parsed.rows.push((row_number, row)),
      Err(e) => {
        parsed.errors += 1;
        warn!(row = row_number, error = %e, "could not parse row");
      }
    }
  }

  Ok(parsed)
}

/// Import `path` into `store`. Storage failures roll back the whole file.
pub async fn run<S>(store: &S, path: &Path) -> Result<Report>
where
  S: RosterStore,
{
  let file = std::fs::File::open(path)
    .with_context(|| format!("cannot open CSV file {}", path.display()))?;
  let parsed = parse(file)?;

  let mut report = Report { skipped: parsed.skipped, errors: parsed.errors, ..Report::default() };
  let (numbers, rows): (Vec<u64>, Vec<ImportedEmployee>) = parsed.rows.into_iter().unzip();
  let emails: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();

  let outcomes = store
    .upsert_employees(rows)
    .await
    .context("import failed; no rows were written")?;

  for ((row, email), outcome) in numbers.iter().zip(&emails).zip(outcomes) {
    match outcome {
      UpsertOutcome::Created { id } => {
        report.created += 1;
        info!(row, %email, employee_id = id, "created");
      }
      UpsertOutcome::Updated { id } => {
        report.updated += 1;
        info!(row, %email, employee_id = id, "updated");
      }
      UpsertOutcome::Rejected { errors } => {
        report.errors += 1;
        let messages: Vec<&str> = errors.messages().collect();
        warn!(row, %email, errors = ?messages, "rejected");
      }
    }
  }

  info!(
    created = report.created,
    updated = report.updated,
    skipped = report.skipped,
    errors = report.errors,
    "import finished"
  );
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use chrono::NaiveDate;
  use roster_core::{
    reference::City,
    store::{EmployeeQuery, RosterStore as _},
  };
  use roster_store_sqlite::SqliteStore;

  use super::*;

  fn csv_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
  }

  async fn all(store: &SqliteStore) -> Vec<roster_core::employee::Employee> {
    store.list_employees(&EmployeeQuery::default()).await.unwrap()
  }

  #[tokio::test]
  async fn single_row_with_slash_date() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = csv_file(
      "email,first_name,last_name,date_hired\na@x.com,Ann,Lee,2024/01/15\n",
    );

    let report = run(&store, file.path()).await.unwrap();
    assert_eq!(report, Report { created: 1, ..Report::default() });

    let employees = all(&store).await;
    assert_eq!(employees.len(), 1);
    let ann = &employees[0].record;
    assert_eq!(ann.date_hired, NaiveDate::from_ymd_opt(2024, 1, 15));
    assert_eq!(ann.city_id, City::HALIFAX_ID);
    assert_eq!(ann.color, "AAAAAA");
  }

  #[tokio::test]
  async fn second_run_only_updates() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = csv_file(
      "email,first_name,last_name,notes\n\
       a@x.com,Ann,Lee,first\n\
       b@x.com,Bob,Roy,\n",
    );

    let first = run(&store, file.path()).await.unwrap();
    assert_eq!(first.created, 2);
    let before = all(&store).await;

    let second = run(&store, file.path()).await.unwrap();
    assert_eq!(second, Report { updated: 2, ..Report::default() });
    assert_eq!(all(&store).await, before);
  }

  #[tokio::test]
  async fn bad_date_counts_error_and_continues() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = csv_file(
      "email,first_name,last_name,date_of_birth\n\
       a@x.com,Ann,Lee,not-a-date\n\
       b@x.com,Bob,Roy,1990-05-04\n",
    );

    let report = run(&store, file.path()).await.unwrap();
    assert_eq!(report, Report { created: 1, errors: 1, ..Report::default() });
    let employees = all(&store).await;
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].record.email, "b@x.com");
  }

  #[tokio::test]
  async fn bad_date_leaves_existing_employee_untouched() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let first = csv_file(
      "email,first_name,last_name,notes,date_of_birth\n\
       a@x.com,Ann,Lee,original,1990-05-04\n",
    );
    run(&store, first.path()).await.unwrap();
    let before = all(&store).await;

    let second = csv_file(
      "email,first_name,last_name,notes,date_of_birth\n\
       a@x.com,Changed,Name,edited,31/31/1990\n",
    );
    let report = run(&store, second.path()).await.unwrap();
    assert_eq!(report, Report { errors: 1, ..Report::default() });

    let after = all(&store).await;
    assert_eq!(after, before);
    assert_eq!(after[0].record.first_name, "Ann");
    assert_eq!(after[0].record.notes.as_deref(), Some("original"));
  }

  #[tokio::test]
  async fn empty_email_is_skipped() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = csv_file("email,first_name,last_name\n,No,Email\na@x.com,Ann,Lee\n");

    let report = run(&store, file.path()).await.unwrap();
    assert_eq!(report, Report { created: 1, skipped: 1, ..Report::default() });
  }

  #[tokio::test]
  async fn bom_and_padded_headers() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = csv_file("\u{feff} email , first_name ,last_name\n a@x.com , Ann , Lee \n");

    let report = run(&store, file.path()).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(all(&store).await[0].record.first_name, "Ann");
  }

  #[tokio::test]
  async fn validation_rejection_is_an_error() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let file = csv_file("email,first_name,last_name,color\na@x.com,Ann,Lee,zzzzzz\n");

    let report = run(&store, file.path()).await.unwrap();
    assert_eq!(report, Report { errors: 1, ..Report::default() });
    assert!(all(&store).await.is_empty());
  }

  #[tokio::test]
  async fn missing_file_fails() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let err = run(&store, Path::new("/definitely/not/here.csv")).await.unwrap_err();
    assert!(err.to_string().contains("cannot open CSV file"));
  }
}
