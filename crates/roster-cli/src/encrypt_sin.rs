//! `roster encrypt-sin`: copy plaintext SINs into the encrypted column.
//!
//! Candidates are walked in id order, `batch_size` rows per page. Each
//! write commits on its own, so a failure only costs that one record.

use anyhow::Result;
use roster_core::store::RosterStore;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct Options {
  pub batch_size: usize,
  pub dry_run:    bool,
  pub force:      bool,
  pub verbose:    bool,
}

impl Default for Options {
  fn default() -> Self { Self { batch_size: 1000, dry_run: false, force: false, verbose: false } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
  pub migrated: u64,
  pub skipped:  u64,
  pub errors:   u64,
}

pub async fn run<S>(store: &S, opts: Options) -> Result<Report>
where
  S: RosterStore,
{
  let stats = store.sin_statistics().await?;
  info!(
    total = stats.total,
    sin_null = stats.sin_null,
    sin_empty = stats.sin_empty,
    sin_populated = stats.sin_populated,
    already_encrypted = stats.already_encrypted,
    "database statistics"
  );

  let candidates = store.count_sin_candidates(opts.force).await?;
  if candidates == 0 {
    info!("No records to migrate");
    return Ok(Report::default());
  }
  info!(candidates, force = opts.force, dry_run = opts.dry_run, "starting SIN migration");

  let batch_size = opts.batch_size.max(1);
  let mut report = Report::default();
  let mut processed: u64 = 0;
  let mut after_id = 0;

  loop {
    let page = store.sin_candidates(opts.force, after_id, batch_size).await?;
    let Some(last) = page.last() else { break };
    after_id = last.id;

    for candidate in page {
      processed += 1;

      if !opts.force && candidate.is_encrypted() {
        report.skipped += 1;
        if opts.verbose {
          info!(employee_id = candidate.id, "already encrypted, skipping");
        }
      } else if opts.dry_run {
        report.migrated += 1;
        if opts.verbose {
          info!(employee_id = candidate.id, sin_len = candidate.sin.len(), "would encrypt");
        }
      } else {
        match store.store_encrypted_sin(candidate.id, candidate.sin.clone()).await {
          Ok(()) => {
            report.migrated += 1;
            if opts.verbose {
              info!(employee_id = candidate.id, sin_len = candidate.sin.len(), "encrypted");
            }
          }
          Err(e) => {
            report.errors += 1;
            error!(employee_id = candidate.id, error = %e, "failed to encrypt SIN");
          }
        }
      }

      if processed % batch_size as u64 == 0 {
        info!(processed, total = candidates, "progress");
      }
    }
  }

  info!(
    migrated = report.migrated,
    skipped = report.skipped,
    errors = report.errors,
    "SIN migration finished"
  );
  if opts.dry_run {
    warn!("dry run: no changes were written");
  }
  Ok(report)
}

#[cfg(test)]
mod tests {
  use roster_core::employee::EmployeeRecord;
  use roster_store_sqlite::{SinCipher, SqliteStore};

  use super::*;

  async fn seed(store: &SqliteStore) -> Vec<i64> {
    let mut ids = Vec::new();
    for (i, sin) in [Some("111111111"), Some("222222222"), None, Some("333333333")]
      .into_iter()
      .enumerate()
    {
      let mut r = EmployeeRecord::new(format!("e{i}@x.com"), "F", "L");
      r.sin = sin.map(str::to_owned);
      ids.push(store.create_employee(r).await.unwrap().unwrap().id);
    }
    ids
  }

  async fn seeded() -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    seed(&store).await;
    store
  }

  /// Every employee with a SIN, decrypted through the normal read path.
  async fn sealed_pairs(store: &SqliteStore) -> Vec<(Option<String>, Option<String>)> {
    store
      .list_employees(&Default::default())
      .await
      .unwrap()
      .into_iter()
      .filter(|e| e.record.sin.is_some())
      .map(|e| (e.record.sin, e.record.sin_e))
      .collect()
  }

  #[tokio::test]
  async fn migrates_then_is_idempotent() {
    let store = seeded().await;
    let opts = Options { batch_size: 2, ..Options::default() };

    let first = run(&store, opts).await.unwrap();
    assert_eq!(first, Report { migrated: 3, skipped: 0, errors: 0 });
    let pairs = sealed_pairs(&store).await;
    assert_eq!(pairs.len(), 3);
    for (sin, sin_e) in pairs {
      assert_eq!(sin_e, sin);
    }

    let second = run(&store, opts).await.unwrap();
    assert_eq!(second, Report::default());
  }

  #[tokio::test]
  async fn force_rewrites_every_populated_row() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let ids = seed(&store).await;
    run(&store, Options::default()).await.unwrap();

    let mut changed = store.get_employee(ids[0]).await.unwrap().unwrap();
    changed.record.sin = Some("999999999".into());
    store.update_employee(ids[0], changed.record).await.unwrap().unwrap();

    // Without force the stale value is left alone.
    assert_eq!(run(&store, Options::default()).await.unwrap(), Report::default());
    let stale = store.get_employee(ids[0]).await.unwrap().unwrap();
    assert_eq!(stale.record.sin_e.as_deref(), Some("111111111"));

    let forced = run(&store, Options { force: true, ..Options::default() }).await.unwrap();
    assert_eq!(forced, Report { migrated: 3, skipped: 0, errors: 0 });
    let fresh = store.get_employee(ids[0]).await.unwrap().unwrap();
    assert_eq!(fresh.record.sin_e.as_deref(), Some("999999999"));
    for (sin, sin_e) in sealed_pairs(&store).await {
      assert_eq!(sin_e, sin);
    }
  }

  #[tokio::test]
  async fn force_reseals_values_from_an_old_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    let old = SqliteStore::open(&path, SinCipher::generate()).await.unwrap();
    let ids = seed(&old).await;
    run(&old, Options::default()).await.unwrap();
    drop(old);

    let store = SqliteStore::open(&path, SinCipher::generate()).await.unwrap();
    assert!(store.get_employee(ids[0]).await.is_err());

    let report = run(&store, Options { force: true, batch_size: 2, ..Options::default() })
      .await
      .unwrap();
    assert_eq!(report, Report { migrated: 3, skipped: 0, errors: 0 });
    for (sin, sin_e) in sealed_pairs(&store).await {
      assert_eq!(sin_e, sin);
    }
  }

  #[tokio::test]
  async fn dry_run_writes_nothing() {
    let store = seeded().await;
    let report = run(&store, Options { dry_run: true, ..Options::default() }).await.unwrap();
    assert_eq!(report.migrated, 3);
    assert_eq!(store.sin_statistics().await.unwrap().already_encrypted, 0);
    assert_eq!(store.count_sin_candidates(false).await.unwrap(), 3);
  }

  #[tokio::test]
  async fn empty_store_has_nothing_to_do() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert_eq!(run(&store, Options::default()).await.unwrap(), Report::default());
  }
}
