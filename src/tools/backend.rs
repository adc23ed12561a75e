//! Toolchain trait and the subprocess-backed implementation.
//!
//! [`Toolchain`] is the seam between the pipeline and every external tool.
//! The production implementation is [`SystemToolchain`], which shells out to
//! the command lines named in `config.toml`. Exit status is always checked:
//! a failing tool aborts the build rather than leaving a half-built tree for
//! the later stages to package.

use crate::config::ToolsConfig;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tool command for {0} is empty")]
    EmptyCommand(&'static str),
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}")]
    Failed {
        tool: String,
        status: std::process::ExitStatus,
    },
    #[error("{tool} produced non-UTF-8 output")]
    InvalidOutput { tool: String },
}

/// Per-invocation configuration for the external Markdown processor.
///
/// Built fresh for every page: the source paths cover that page's figure,
/// listing, and table asset directories and are scoped strictly to the call —
/// there is no shared processor state between pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Directories the processor may resolve relative asset references from.
    pub source_paths: Vec<PathBuf>,
    /// Rendering template for code listings.
    pub code_template: String,
    /// Rendering template for figures.
    pub figure_template: String,
    /// Rendering template for tables.
    pub table_template: String,
    /// Make section headers clickable anchors.
    pub anchor_headers: bool,
    /// Append back-references to section headers.
    pub append_header_refs: bool,
    /// Run the processor's own pre/post Markdown filters.
    pub markdown_filters: bool,
}

/// Result of a per-page revision query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub hash: String,
    pub short: String,
    pub date: String,
}

/// The external tool seam.
///
/// Every method maps to one tool invocation; see the
/// [module docs](super) for the tool table.
pub trait Toolchain {
    /// Convert a Markdown document (front matter included) with the academic
    /// Markdown processor. Returns the converted document.
    fn convert_markdown(&self, config: &ProcessorConfig, input: &str) -> Result<String, ToolError>;

    /// Compile the LESS entry point; returns the CSS.
    fn compile_styles(&self, entry: &Path) -> Result<String, ToolError>;

    /// Run the site compiler in the project directory.
    fn compile_site(&self, project_dir: &Path) -> Result<(), ToolError>;

    /// Minify one HTML file in place.
    fn minify_html(&self, path: &Path) -> Result<(), ToolError>;

    /// Archive `dir` into `archive`, honoring an optional exclusion file.
    fn create_archive(
        &self,
        archive: &Path,
        dir: &Path,
        exclude_from: Option<&Path>,
    ) -> Result<(), ToolError>;

    /// Run the dead-link checker against `url`; returns its CSV report.
    fn check_links(&self, url: &str) -> Result<String, ToolError>;

    /// Current version-control branch. Returns an empty string outside a
    /// repository or on a detached HEAD — those builds are unbranched.
    fn branch(&self) -> Result<String, ToolError>;

    /// Last revision touching `path`, or `None` for untracked files.
    fn revision(&self, path: &Path) -> Result<Option<Revision>, ToolError>;
}

/// [`Toolchain`] implementation that shells out to the configured commands.
pub struct SystemToolchain {
    tools: ToolsConfig,
}

impl SystemToolchain {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    fn command(&self, name: &'static str, spec: &[String]) -> Result<(String, Command), ToolError> {
        let (program, args) = spec.split_first().ok_or(ToolError::EmptyCommand(name))?;
        let mut command = Command::new(program);
        command.args(args);
        Ok((program.clone(), command))
    }
}

fn run_captured(tool: &str, command: &mut Command) -> Result<Output, ToolError> {
    let output = command.output().map_err(|source| ToolError::Launch {
        tool: tool.to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status,
        });
    }
    Ok(output)
}

fn run_streamed(tool: &str, command: &mut Command) -> Result<(), ToolError> {
    let status = command.status().map_err(|source| ToolError::Launch {
        tool: tool.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status,
        });
    }
    Ok(())
}

fn stdout_utf8(tool: &str, output: Output) -> Result<String, ToolError> {
    String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput {
        tool: tool.to_string(),
    })
}

impl Toolchain for SystemToolchain {
    fn convert_markdown(&self, config: &ProcessorConfig, input: &str) -> Result<String, ToolError> {
        let (tool, mut command) = self.command("markdown", &self.tools.markdown)?;
        for path in &config.source_paths {
            command.arg("--path").arg(path);
        }
        command.args(["--code-template", &config.code_template]);
        command.args(["--figure-template", &config.figure_template]);
        command.args(["--table-template", &config.table_template]);
        if config.anchor_headers {
            command.arg("--anchor-headers");
        }
        if config.append_header_refs {
            command.arg("--append-header-refs");
        }
        if !config.markdown_filters {
            command.arg("--no-filters");
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ToolError::Launch {
                tool: tool.clone(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status,
            });
        }
        stdout_utf8(&tool, output)
    }

    fn compile_styles(&self, entry: &Path) -> Result<String, ToolError> {
        let (tool, mut command) = self.command("styles", &self.tools.styles)?;
        command.arg(entry);
        let output = run_captured(&tool, &mut command)?;
        stdout_utf8(&tool, output)
    }

    fn compile_site(&self, project_dir: &Path) -> Result<(), ToolError> {
        let (tool, mut command) = self.command("compiler", &self.tools.compiler)?;
        command.current_dir(project_dir);
        run_streamed(&tool, &mut command)
    }

    fn minify_html(&self, path: &Path) -> Result<(), ToolError> {
        let (tool, mut command) = self.command("minifier", &self.tools.minifier)?;
        command.arg(path).arg("-o").arg(path);
        run_streamed(&tool, &mut command)
    }

    fn create_archive(
        &self,
        archive: &Path,
        dir: &Path,
        exclude_from: Option<&Path>,
    ) -> Result<(), ToolError> {
        let (tool, mut command) = self.command("archiver", &self.tools.archiver)?;
        command.arg("-zcf").arg(archive).arg("-C").arg(dir).arg(".");
        if let Some(exclude) = exclude_from {
            let mut flag = std::ffi::OsString::from("--exclude-from=");
            flag.push(exclude);
            command.arg(flag);
        }
        run_streamed(&tool, &mut command)
    }

    fn check_links(&self, url: &str) -> Result<String, ToolError> {
        let (tool, mut command) = self.command("linkchecker", &self.tools.linkchecker)?;
        command.arg(url);
        let output = run_captured(&tool, &mut command)?;
        stdout_utf8(&tool, output)
    }

    fn branch(&self) -> Result<String, ToolError> {
        let (tool, mut command) = self.command("git", &self.tools.git)?;
        command.args(["rev-parse", "--abbrev-ref", "HEAD"]);
        let output = command.output().map_err(|source| ToolError::Launch {
            tool: tool.clone(),
            source,
        })?;
        if !output.status.success() {
            // Not a repository: the build is simply unbranched.
            return Ok(String::new());
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if name == "HEAD" { String::new() } else { name })
    }

    fn revision(&self, path: &Path) -> Result<Option<Revision>, ToolError> {
        let (tool, mut command) = self.command("git", &self.tools.git)?;
        command
            .args(["log", "--format=%H%x09%h%x09%cd", "-n", "1", "--"])
            .arg(path);
        let output = run_captured(&tool, &mut command)?;
        let line = stdout_utf8(&tool, output)?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let mut fields = line.splitn(3, '\t');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(hash), Some(short), Some(date)) => Ok(Some(Revision {
                hash: hash.to_string(),
                short: short.to_string(),
                date: date.to_string(),
            })),
            _ => Err(ToolError::InvalidOutput { tool }),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    /// Page the mock compiler writes, with one root-relative and one
    /// protocol-relative URL so post-build tests have both cases.
    pub const COMPILED_PAGE: &str = concat!(
        "<html><body>\n",
        "<a href=\"/install/\">install</a>\n",
        "<script src=\"//cdn.example.com/x.js\"></script>\n",
        "</body></html>\n",
    );

    /// Stylesheet the mock compiler writes alongside the page.
    pub const COMPILED_CSS: &str = "body { background: url('/img/bg.png'); }\n";

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedCall {
        ConvertMarkdown { paths: Vec<String> },
        CompileStyles(String),
        CompileSite(String),
        MinifyHtml(String),
        CreateArchive { archive: String, dir: String },
        CheckLinks(String),
        Branch,
        Revision(String),
    }

    /// Toolchain that records invocations without running anything.
    ///
    /// Markdown conversion is the identity, style compilation returns a
    /// canned stylesheet, site compilation writes [`COMPILED_PAGE`] and
    /// [`COMPILED_CSS`] into `_tmp/`, and the query methods return the
    /// configured values.
    #[derive(Default)]
    pub struct MockToolchain {
        pub branch: String,
        pub revision: Option<Revision>,
        pub link_report: String,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockToolchain {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on_branch(branch: &str) -> Self {
            Self {
                branch: branch.to_string(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: RecordedCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Toolchain for MockToolchain {
        fn convert_markdown(
            &self,
            config: &ProcessorConfig,
            input: &str,
        ) -> Result<String, ToolError> {
            self.record(RecordedCall::ConvertMarkdown {
                paths: config
                    .source_paths
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect(),
            });
            Ok(input.to_string())
        }

        fn compile_styles(&self, entry: &Path) -> Result<String, ToolError> {
            self.record(RecordedCall::CompileStyles(
                entry.to_string_lossy().to_string(),
            ));
            Ok("/* compiled */\n".to_string())
        }

        fn compile_site(&self, project_dir: &Path) -> Result<(), ToolError> {
            self.record(RecordedCall::CompileSite(
                project_dir.to_string_lossy().to_string(),
            ));
            let tmp = project_dir.join("_tmp");
            fs::create_dir_all(tmp.join("assets"))?;
            fs::write(tmp.join("index.html"), COMPILED_PAGE)?;
            fs::write(tmp.join("assets/style.css"), COMPILED_CSS)?;
            Ok(())
        }

        fn minify_html(&self, path: &Path) -> Result<(), ToolError> {
            self.record(RecordedCall::MinifyHtml(path.to_string_lossy().to_string()));
            Ok(())
        }

        fn create_archive(
            &self,
            archive: &Path,
            dir: &Path,
            _exclude_from: Option<&Path>,
        ) -> Result<(), ToolError> {
            self.record(RecordedCall::CreateArchive {
                archive: archive.to_string_lossy().to_string(),
                dir: dir.to_string_lossy().to_string(),
            });
            fs::write(archive, b"archive")?;
            Ok(())
        }

        fn check_links(&self, url: &str) -> Result<String, ToolError> {
            self.record(RecordedCall::CheckLinks(url.to_string()));
            Ok(self.link_report.clone())
        }

        fn branch(&self) -> Result<String, ToolError> {
            self.record(RecordedCall::Branch);
            Ok(self.branch.clone())
        }

        fn revision(&self, path: &Path) -> Result<Option<Revision>, ToolError> {
            self.record(RecordedCall::Revision(path.to_string_lossy().to_string()));
            Ok(self.revision.clone())
        }
    }

    #[test]
    fn mock_records_markdown_paths() {
        let toolchain = MockToolchain::new();
        let config = ProcessorConfig {
            source_paths: vec!["content/usage/img/install".into()],
            code_template: "jekyll".into(),
            figure_template: "jekyll".into(),
            table_template: "kramdown".into(),
            anchor_headers: true,
            append_header_refs: true,
            markdown_filters: false,
        };

        let out = toolchain.convert_markdown(&config, "body").unwrap();
        assert_eq!(out, "body");
        assert_eq!(
            toolchain.calls(),
            vec![RecordedCall::ConvertMarkdown {
                paths: vec!["content/usage/img/install".to_string()],
            }]
        );
    }

    #[test]
    fn mock_compile_writes_output_tree() {
        let tmp = tempfile::TempDir::new().unwrap();
        let toolchain = MockToolchain::new();
        toolchain.compile_site(tmp.path()).unwrap();
        assert!(tmp.path().join("_tmp/index.html").exists());
        assert!(tmp.path().join("_tmp/assets/style.css").exists());
    }

    #[test]
    fn empty_command_is_reported() {
        let mut tools = ToolsConfig::default();
        tools.compiler.clear();
        let toolchain = SystemToolchain::new(tools);
        assert!(matches!(
            toolchain.compile_site(Path::new(".")),
            Err(ToolError::EmptyCommand("compiler"))
        ));
    }
}
