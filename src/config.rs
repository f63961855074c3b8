use crate::capability::Capabilities;
use crate::error::{Result, ScanError};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directories to scan, in order.
    pub roots: Vec<PathBuf>,
    /// Glob patterns a file name must match to be considered.
    pub patterns: Vec<String>,
    /// Keyword list, one term per line.
    pub keywords_file: PathBuf,
    /// Worker thread count; 0 means one per CPU.
    pub workers: usize,
    /// Results destination; matches are appended as they are found.
    pub output_file: Option<PathBuf>,
    /// Run OCR over image files (requires tesseract).
    pub search_images: bool,
    /// Files larger than this are skipped with a warning.
    pub max_file_size_mb: u64,
    /// Per-file processing budget.
    pub per_file_timeout_secs: u64,
    pub ocr: OcrConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub languages: String,
    pub args: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            args: vec![
                "--oem".to_string(),
                "3".to_string(),
                "--psm".to_string(),
                "6".to_string(),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            patterns: [
                "*.txt", "*.pdf", "*.docx", "*.xlsx", "*.jpg", "*.png", "*.zip", "*.rar", "*.7z",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            keywords_file: PathBuf::from("keywords.txt"),
            workers: 4,
            output_file: Some(PathBuf::from("search_results.txt")),
            search_images: false,
            max_file_size_mb: 50,
            per_file_timeout_secs: 300,
            ocr: OcrConfig::default(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the first of the standard
    /// locations that exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_path(),
        };
        match path {
            Some(path) => {
                let content = fs::read_to_string(&path)?;
                toml::from_str(&content).map_err(|e| {
                    ScanError::Config(format!("failed to parse {}: {e}", path.display()))
                })
            }
            None => Ok(Self::default()),
        }
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("kwscan/config.toml");
            if xdg_path.exists() {
                return Some(xdg_path);
            }
        }
        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".kwscan.toml");
            if home_path.exists() {
                return Some(home_path);
            }
        }
        let current = Path::new("kwscan.toml");
        if current.exists() {
            return Some(current.to_path_buf());
        }
        None
    }

    /// Write a commented default configuration for the user to edit.
    pub fn write_default(path: &Path) -> Result<()> {
        let content = r#"# kwscan configuration

# Root directories to scan, in order.
roots = ["."]

# File name patterns to consider.
patterns = ["*.txt", "*.pdf", "*.docx", "*.xlsx", "*.jpg", "*.png", "*.zip", "*.rar", "*.7z"]

# Keyword list, one term per line.
keywords_file = "keywords.txt"

# Worker threads (0 = one per CPU).
workers = 4

# Matches are appended here as they are found.
output_file = "search_results.txt"

# Run OCR over image files (requires the tesseract binary).
search_images = false

# Skip files larger than this many megabytes.
max_file_size_mb = 50

# Give up on a single file after this many seconds.
per_file_timeout_secs = 300

[ocr]
languages = "eng"
args = ["--oem", "3", "--psm", "6"]
"#;
        fs::write(path, content)?;
        Ok(())
    }

    /// Assemble the immutable per-scan request.
    pub fn to_request(&self, capabilities: Capabilities) -> Result<ScanRequest> {
        let mut patterns = Vec::with_capacity(self.patterns.len());
        for raw in &self.patterns {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            patterns.push(Pattern::new(raw).map_err(|source| ScanError::Pattern {
                pattern: raw.to_string(),
                source,
            })?);
        }
        if patterns.is_empty() {
            return Err(ScanError::Config(
                "no extension patterns configured".to_string(),
            ));
        }
        let workers = if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        };
        Ok(ScanRequest {
            roots: self.roots.clone(),
            patterns,
            max_file_size: self.max_file_size_mb * 1024 * 1024,
            workers,
            per_file_timeout: Duration::from_secs(self.per_file_timeout_secs.max(1)),
            capabilities,
            ocr_languages: self.ocr.languages.clone(),
            ocr_args: self.ocr.args.clone(),
        })
    }
}

/// Everything a scan needs, fixed before the first file is touched.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub roots: Vec<PathBuf>,
    pub patterns: Vec<Pattern>,
    pub max_file_size: u64,
    pub workers: usize,
    pub per_file_timeout: Duration,
    pub capabilities: Capabilities,
    pub ocr_languages: String,
    pub ocr_args: Vec<String>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl ScanRequest {
    /// Whether a file name (or archive entry path) matches any configured
    /// pattern. Separators are not special, mirroring fnmatch-style masks.
    pub fn matches_name(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }
}
