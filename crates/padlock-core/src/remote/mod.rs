//! Remote store access for Padlock

mod webdav;

pub use webdav::{parse_multistatus, BackupFile, WebDavClient, WebDavError, WebDavResult};
