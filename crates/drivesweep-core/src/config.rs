//! Search criteria and walker configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Hard ceiling on walk depth whenever symbolic links are followed.
pub const MAX_LINK_DEPTH: usize = 64;

/// Directory names skipped by [`SearchOptions::with_system_exclusions`].
pub const SYSTEM_EXCLUSIONS: &[&str] = &[
    "Windows",
    "System32",
    "$Recycle.Bin",
    "ProgramData",
    "Program Files",
    "Program Files (x86)",
    "AppData",
];

/// What to look for.
///
/// Extensions are stored lower-cased and without a leading dot, so `".MP3"`,
/// `"mp3"` and `"*.mp3"` all describe the same filter.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq, Eq)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SearchCriteria {
    /// Extensions to match, case-insensitively.
    #[builder(setter(custom))]
    pub extensions: BTreeSet<String>,

    /// Restrict the search to one root (None = every approved root).
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub scope: Option<PathBuf>,

    /// Descend into subdirectories.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_subfolders: bool,
}

fn default_true() -> bool {
    true
}

impl SearchCriteriaBuilder {
    /// Add extensions to the filter. May be called repeatedly.
    pub fn extensions<I, S>(&mut self, extensions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.extensions.get_or_insert_with(BTreeSet::new);
        set.extend(
            extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref())),
        );
        self
    }

    fn validate(&self) -> Result<(), String> {
        match self.extensions {
            Some(ref set) if !set.is_empty() => {}
            _ => return Err("At least one extension is required".to_string()),
        }
        if let Some(Some(ref scope)) = self.scope {
            if scope.as_os_str().is_empty() {
                return Err("Scope path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl SearchCriteria {
    /// Create a new search criteria builder.
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    /// Search every approved root, recursively, for the given extensions.
    pub fn new<I, S>(extensions: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::builder()
            .extensions(extensions)
            .build()
            .map_err(|e| ScanError::InvalidCriteria {
                message: e.to_string(),
            })
    }

    /// Search for a predefined family of file types.
    pub fn for_category(category: ExtensionCategory) -> Self {
        Self {
            extensions: category
                .extensions()
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            scope: None,
            include_subfolders: true,
        }
    }

    /// Check an extension (with or without the leading dot).
    pub fn matches_extension(&self, extension: &str) -> bool {
        normalize_extension(extension).is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Check whether a file path carries one of the wanted extensions.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.matches_extension(ext))
    }
}

/// Normalize a user-supplied extension: trim, drop `*`/`.` prefixes, lower-case.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('*').trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// Split a free-form list like `".mp3, wav; flac"` into normalized extensions.
pub fn parse_extension_list(input: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    input
        .split([',', ';', ' ', '\t'])
        .filter_map(normalize_extension)
        .filter(|ext| seen.insert(ext.clone()))
        .collect()
}

/// Predefined file-type families for quick searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExtensionCategory {
    Documents,
    Music,
    Images,
    Videos,
    Code,
}

impl ExtensionCategory {
    /// Extensions belonging to this family.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Documents => &["txt", "docx", "pdf", "xlsx", "doc"],
            Self::Music => &["mp3", "wav", "flac", "m4a", "aac"],
            Self::Images => &["jpg", "jpeg", "png", "gif", "bmp"],
            Self::Videos => &["mp4", "avi", "mkv", "mov", "wmv"],
            Self::Code => &["cs", "py", "js", "html", "css", "cpp"],
        }
    }
}

/// Folder name a batch lands in when sorted by file type.
///
/// Known extensions map to a family folder (`Music`, `Images`, `Videos`,
/// `Documents`, `Archives`, `Code`); anything else uses the upper-cased
/// extension itself, and an empty one yields `FILES`.
pub fn default_folder_name(extension: &str) -> String {
    let Some(ext) = normalize_extension(extension) else {
        return "FILES".to_string();
    };
    let family = match ext.as_str() {
        "mp3" | "wav" | "flac" | "m4a" | "aac" | "ogg" | "wma" => "Music",
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" => "Images",
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" => "Videos",
        "pdf" | "docx" | "doc" | "txt" | "xlsx" | "xls" | "pptx" | "ppt" => "Documents",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => "Archives",
        "cs" | "js" | "py" | "java" | "cpp" | "h" | "html" | "css" | "sql" => "Code",
        _ => return ext.to_uppercase(),
    };
    family.to_string()
}

/// How the scanner walks a tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SearchOptions {
    /// Follow symbolic links (depth is then capped at [`MAX_LINK_DEPTH`]).
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Directory names to prune (glob syntax, case-insensitive).
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Number of threads for directory reads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,
}

impl SearchOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref patterns) = self.exclude_patterns {
            compile_exclusions(patterns).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl SearchOptions {
    /// Create a new search options builder.
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Default options plus the well-known operating system folders excluded.
    pub fn with_system_exclusions() -> Self {
        Self {
            exclude_patterns: SYSTEM_EXCLUSIONS.iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Depth limit handed to the walker.
    pub fn effective_max_depth(&self) -> usize {
        match (self.max_depth, self.follow_symlinks) {
            (Some(depth), true) => depth.min(MAX_LINK_DEPTH),
            (Some(depth), false) => depth,
            (None, true) => MAX_LINK_DEPTH,
            (None, false) => usize::MAX,
        }
    }

    /// Compile the exclusion patterns.
    pub fn exclusion_set(&self) -> Result<GlobSet, ScanError> {
        compile_exclusions(&self.exclude_patterns)
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: None,
            include_hidden: true,
            exclude_patterns: Vec::new(),
            threads: 0,
        }
    }
}

fn compile_exclusions(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::InvalidPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}
