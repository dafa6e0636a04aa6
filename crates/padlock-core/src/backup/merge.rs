//! Restore merging with per-record deduplication.
//!
//! A downloaded snapshot is applied record by record: known records are
//! skipped, novel ones inserted with fresh local ids, and a record that
//! fails to parse or insert is counted and logged without aborting the
//! rest of the restore.

use std::fmt;

use crate::backup::payload::{BackupContent, SecureItemExport};
use crate::db::{PasswordRepository, SecureItemRepository};
use crate::error::Result;
use crate::models::{PasswordEntry, SecureItem, SecureItemType, UNASSIGNED_ID};

/// Per-category outcome counters for one restore run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Records inserted as new
    pub inserted: usize,
    /// Records skipped as duplicates of existing local records
    pub skipped: usize,
    /// Records dropped because they failed to parse or insert
    pub failed: usize,
}

impl MergeCounts {
    fn record(&mut self, outcome: &Result<MergeOutcome>) {
        match outcome {
            Ok(MergeOutcome::Inserted) => self.inserted += 1,
            Ok(MergeOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Summary of one restore run, suitable for showing to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub passwords: MergeCounts,
    pub secure_items: MergeCounts,
}

impl fmt::Display for RestoreSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_counts(formatter, "passwords", self.passwords)?;
        write!(formatter, "; ")?;
        fmt_counts(formatter, "secure items", self.secure_items)
    }
}

fn fmt_counts(formatter: &mut fmt::Formatter<'_>, label: &str, counts: MergeCounts) -> fmt::Result {
    write!(
        formatter,
        "{label}: {} restored, {} skipped",
        counts.inserted, counts.skipped
    )?;
    if counts.failed > 0 {
        write!(formatter, ", {} failed", counts.failed)?;
    }
    Ok(())
}

enum MergeOutcome {
    Inserted,
    Skipped,
}

/// Apply a snapshot against the local repositories without creating
/// duplicates.
///
/// Passwords dedup on `(title, username, website)`, secure items on
/// `(item_type, title)`. Inserted records get fresh local ids; restored
/// secure items keep their original timestamps. One bad record never
/// aborts the run — it lands in the `failed` counter.
pub fn merge_backup<P, S>(passwords: &P, items: &S, content: &BackupContent) -> RestoreSummary
where
    P: PasswordRepository + ?Sized,
    S: SecureItemRepository + ?Sized,
{
    let mut summary = RestoreSummary::default();

    for entry in &content.passwords {
        let outcome = restore_password(passwords, entry);
        if let Err(error) = &outcome {
            tracing::warn!("failed to restore password entry '{}': {error}", entry.title);
        }
        summary.passwords.record(&outcome);
    }

    for export in &content.secure_items {
        let outcome = restore_secure_item(items, export);
        if let Err(error) = &outcome {
            tracing::warn!("failed to restore secure item '{}': {error}", export.title);
        }
        summary.secure_items.record(&outcome);
    }

    summary
}

fn restore_password<P>(repo: &P, entry: &PasswordEntry) -> Result<MergeOutcome>
where
    P: PasswordRepository + ?Sized,
{
    if repo
        .find_duplicate(&entry.title, &entry.username, &entry.website)?
        .is_some()
    {
        return Ok(MergeOutcome::Skipped);
    }

    let mut detached = entry.clone();
    detached.id = UNASSIGNED_ID;
    repo.insert(&detached)?;
    Ok(MergeOutcome::Inserted)
}

fn restore_secure_item<S>(repo: &S, export: &SecureItemExport) -> Result<MergeOutcome>
where
    S: SecureItemRepository + ?Sized,
{
    let item_type: SecureItemType = export.item_type.parse()?;

    if repo.find_duplicate(item_type, &export.title)?.is_some() {
        return Ok(MergeOutcome::Skipped);
    }

    let item = SecureItem {
        id: UNASSIGNED_ID,
        item_type,
        title: export.title.clone(),
        item_data: export.item_data.clone(),
        notes: export.notes.clone(),
        is_favorite: export.is_favorite,
        image_paths: export.image_paths.clone(),
        created_at: export.created_at,
        updated_at: export.updated_at,
    };
    repo.insert(&item)?;
    Ok(MergeOutcome::Inserted)
}
