//! Core types for drivesweep.
//!
//! This crate provides the fundamental pieces shared by the scanner and the
//! batch executor: file records, search criteria, the approval sandbox that
//! gates every filesystem access, and the drive catalog.

mod config;
mod drive;
mod error;
mod record;
mod sandbox;

pub use config::{
    ExtensionCategory, MAX_LINK_DEPTH, SYSTEM_EXCLUSIONS, SearchCriteria, SearchCriteriaBuilder,
    SearchOptions, SearchOptionsBuilder, default_folder_name, normalize_extension,
    parse_extension_list,
};
pub use drive::{Drive, DriveCatalog, DriveKind, drive_label};
pub use error::{AccessError, ScanError, ScanWarning, WarningKind};
pub use record::FileRecord;
pub use sandbox::{ApprovalSandbox, ApprovedRoots, normalize_path};
