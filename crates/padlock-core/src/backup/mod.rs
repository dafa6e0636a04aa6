//! Backup payload, restore merging, and orchestration

mod merge;
mod payload;
mod service;

pub use merge::{merge_backup, MergeCounts, RestoreSummary};
pub use payload::{
    backup_file_name, build_backup_content, parse_backup_json, render_backup_json,
    secure_item_to_export, BackupContent, SecureItemExport,
};
pub use service::BackupService;
