//! Site configuration.
//!
//! Handles loading and validating the project-level `config.toml`. Config
//! files are sparse — stock defaults cover everything, and a user file only
//! overrides the values it names. Unknown keys are rejected to catch typos
//! early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional — defaults shown below
//!
//! content_root = "content"          # Content directory, relative to the project
//! home_title = "Home"               # Page staged regardless of any group filter
//! repo_url = ""                     # Repository base URL for revision links ("" disables)
//! source_branch = "master"          # Branch used in per-page source links
//! stylesheet = "stylesheets/main.less"  # LESS entry point, relative to content_root
//! layout_template = "default"       # _layouts/<name>-<style>.html variant base name
//! archive_name = "site.tar.gz"      # Tarball file name
//! # archive_exclude = "scripts/excludefromgz.txt"  # tar --exclude-from file
//! check_url = "http://localhost:8000"   # Locally served site for link checking
//! default_status = "development"    # Status string for branches not listed below
//!
//! [branch_status]
//! # "v3" = "current"
//! # "v2" = "outdated"
//!
//! [tools]
//! markdown = ["academicmd"]
//! styles = ["lesscpy", "-X"]
//! compiler = ["jekyll"]
//! minifier = ["java", "-jar", "htmlcompressor.jar", "--compress-js"]
//! linkchecker = ["linkchecker", "--no-warnings", "-o", "csv"]
//! archiver = ["tar"]
//! git = ["git"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Which layout variant the staged site uses.
///
/// The content tree ships one layout file per style
/// (`_layouts/<base>-inpage.html`, `_layouts/<base>-fullpage.html`); the
/// asset stager installs the selected one as the active layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStyle {
    Inpage,
    Fullpage,
}

impl LayoutStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutStyle::Inpage => "inpage",
            LayoutStyle::Fullpage => "fullpage",
        }
    }
}

/// Project configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Content directory name, relative to the project root. The staging
    /// mirror lives next to it with an exclusion-marker prefix (`_content`).
    pub content_root: String,
    /// Title of the page that is staged regardless of any group filter.
    pub home_title: String,
    /// Repository base URL for per-page revision links. Empty disables them.
    pub repo_url: String,
    /// Branch name used in per-page source links.
    pub source_branch: String,
    /// LESS entry point, relative to the content root.
    pub stylesheet: String,
    /// Base name of the layout variant files under `_layouts/`.
    pub layout_template: String,
    /// File name of the site tarball.
    pub archive_name: String,
    /// Optional `--exclude-from` file for the archiver, relative to the
    /// project root.
    pub archive_exclude: Option<String>,
    /// Base URL of the locally served site for dead-link checking.
    pub check_url: String,
    /// Status string for branches without an entry in `branch_status`.
    pub default_status: String,
    /// Branch name → human-readable build status, written into the site
    /// compiler settings.
    pub branch_status: BTreeMap<String, String>,
    /// External tool command lines.
    pub tools: ToolsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: "content".to_string(),
            home_title: "Home".to_string(),
            repo_url: String::new(),
            source_branch: "master".to_string(),
            stylesheet: "stylesheets/main.less".to_string(),
            layout_template: "default".to_string(),
            archive_name: "site.tar.gz".to_string(),
            archive_exclude: None,
            check_url: "http://localhost:8000".to_string(),
            default_status: "development".to_string(),
            branch_status: BTreeMap::new(),
            tools: ToolsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_root.is_empty() {
            return Err(ConfigError::Validation(
                "content_root must not be empty".into(),
            ));
        }
        if self.content_root.starts_with('_') {
            return Err(ConfigError::Validation(
                "content_root must not start with the exclusion marker `_`".into(),
            ));
        }
        if self.content_root.contains('/') || self.content_root.contains('\\') {
            return Err(ConfigError::Validation(
                "content_root must be a single directory name".into(),
            ));
        }
        self.tools.validate()?;
        Ok(())
    }

    /// Status string for a branch, falling back to the configured default.
    pub fn status_for(&self, branch: &str) -> String {
        self.branch_status
            .get(branch)
            .cloned()
            .unwrap_or_else(|| self.default_status.clone())
    }
}

/// Command lines for every external tool, first element the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Academic-Markdown processor (reads the document on stdin, writes the
    /// converted document to stdout).
    pub markdown: Vec<String>,
    /// LESS compiler (entry point appended; CSS expected on stdout).
    pub styles: Vec<String>,
    /// Static site compiler (run in the project directory).
    pub compiler: Vec<String>,
    /// HTML compressor (`<file> -o <file>` appended, in place).
    pub minifier: Vec<String>,
    /// Dead-link checker (base URL appended; CSV report expected on stdout).
    pub linkchecker: Vec<String>,
    /// Archiver for site tarballs.
    pub archiver: Vec<String>,
    /// Version-control binary for branch and revision queries.
    pub git: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            markdown: vec!["academicmd".into()],
            styles: vec!["lesscpy".into(), "-X".into()],
            compiler: vec!["jekyll".into()],
            minifier: vec![
                "java".into(),
                "-jar".into(),
                "htmlcompressor.jar".into(),
                "--compress-js".into(),
            ],
            linkchecker: vec![
                "linkchecker".into(),
                "--no-warnings".into(),
                "-o".into(),
                "csv".into(),
            ],
            archiver: vec!["tar".into()],
            git: vec!["git".into()],
        }
    }
}

impl ToolsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, command) in [
            ("markdown", &self.markdown),
            ("styles", &self.styles),
            ("compiler", &self.compiler),
            ("minifier", &self.minifier),
            ("linkchecker", &self.linkchecker),
            ("archiver", &self.archiver),
            ("git", &self.git),
        ] {
            if command.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "tools.{name} must name a program"
                )));
            }
        }
        Ok(())
    }
}

/// Load `config.toml` from the project directory, falling back to defaults
/// when the file doesn't exist.
pub fn load_config(project_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let path = project_dir.join("config.toml");
    let config = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        SiteConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// A fully documented stock `config.toml`, for `docstage gen-config`.
pub fn stock_config_toml() -> String {
    let mut out = String::new();
    out.push_str("# docstage configuration — all options optional, defaults shown.\n\n");
    for line in [
        "content_root = \"content\"",
        "home_title = \"Home\"",
        "# Repository base URL for per-page revision links (\"\" disables them).",
        "repo_url = \"\"",
        "source_branch = \"master\"",
        "stylesheet = \"stylesheets/main.less\"",
        "layout_template = \"default\"",
        "archive_name = \"site.tar.gz\"",
        "# archive_exclude = \"scripts/excludefromgz.txt\"",
        "check_url = \"http://localhost:8000\"",
        "default_status = \"development\"",
        "",
        "# Branch name -> status string written into the compiler settings.",
        "[branch_status]",
        "# \"v3\" = \"current\"",
        "",
        "# External tool command lines; first element is the program.",
        "[tools]",
        "markdown = [\"academicmd\"]",
        "styles = [\"lesscpy\", \"-X\"]",
        "compiler = [\"jekyll\"]",
        "minifier = [\"java\", \"-jar\", \"htmlcompressor.jar\", \"--compress-js\"]",
        "linkchecker = [\"linkchecker\", \"--no-warnings\", \"-o\", \"csv\"]",
        "archiver = [\"tar\"]",
        "git = [\"git\"]",
    ] {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.content_root, "content");
        assert_eq!(config.home_title, "Home");
        assert_eq!(config.tools.compiler, vec!["jekyll"]);
    }

    #[test]
    fn sparse_override_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "content_root = \"docs\"\n[branch_status]\n\"v3\" = \"current\"\n",
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.content_root, "docs");
        assert_eq!(config.stylesheet, "stylesheets/main.less");
        assert_eq!(config.status_for("v3"), "current");
        assert_eq!(config.status_for("v1"), "development");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "contnet_root = \"docs\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn marker_prefixed_content_root_is_invalid() {
        let config = SiteConfig {
            content_root: "_content".to_string(),
            ..SiteConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn empty_tool_command_is_invalid() {
        let mut config = SiteConfig::default();
        config.tools.compiler.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn stock_config_parses_back() {
        let config: SiteConfig = toml::from_str(&stock_config_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.archive_name, "site.tar.gz");
    }
}
