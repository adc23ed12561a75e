use clap::{Parser, Subcommand};
use docstage::config::{self, LayoutStyle};
use docstage::pipeline::{self, BuildOptions};
use docstage::tools::SystemToolchain;
use docstage::{output, scan, sitemap};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docstage")]
#[command(about = "Build pipeline for a Markdown documentation site")]
#[command(long_about = "\
Build pipeline for a Markdown documentation site

Pages are Markdown files with YAML front matter under the content directory;
sitemap.txt defines their order, nesting, and grouping by title:

  project/
  ├── config.toml              # Site config (optional, defaults documented)
  ├── sitemap.txt              # One title per line; tab = nested, `:` = hidden
  └── content/
      ├── index.md             # Pages carry title/permalink/group front matter
      ├── usage/install.md
      ├── stylesheets/main.less
      ├── _layouts/            # Shared resources, copied into the staging tree
      ├── _includes/
      ├── attachments/
      └── img/

A build stages everything under _content/, runs the external site compiler,
and finishes the output under _site/ (nested per branch). Markdown
conversion, stylesheet compilation, site compilation, minification, and link
checking are delegated to the tools named in config.toml.

Run 'docstage gen-config' for a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project directory (holding config.toml, sitemap.txt, and the content root)
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the content directory and list the discovered pages
    Scan {
        /// Dump the inventory as JSON instead of the listing
        #[arg(long)]
        json: bool,
    },
    /// Validate content against the sitemap without writing anything
    Check,
    /// Run the full pipeline: scan → order → stage → compile → finish
    Build(BuildArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Layout variant to install
    #[arg(long, value_enum, default_value_t = LayoutStyle::Inpage)]
    layout: LayoutStyle,

    /// Stage only this group (plus the home page); ordering still covers everything
    #[arg(long)]
    group: Option<String>,

    /// Post-process the previous compiler output instead of recompiling
    #[arg(long)]
    skip_compiler: bool,

    /// Minify the generated HTML in place
    #[arg(long)]
    minify: bool,

    /// Package the finished site as a tarball
    #[arg(long)]
    tarball: bool,

    /// Check the locally served site for dead links
    #[arg(long)]
    check_links: bool,

    /// Refresh per-page revision metadata from version control
    #[arg(long)]
    refresh_revisions: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.project)?;
    let content_root = cli.project.join(&config.content_root);

    match cli.command {
        Command::Scan { json } => {
            let set = scan::scan(&content_root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                output::print_scan_output(&set);
            }
        }
        Command::Check => {
            let mut set = scan::scan(&content_root)?;
            output::print_scan_output(&set);

            let sitemap_path = cli.project.join("sitemap.txt");
            if !sitemap_path.exists() {
                return Err(format!("sitemap not found at {}", sitemap_path.display()).into());
            }
            let outline = sitemap::parse_outline(&std::fs::read_to_string(&sitemap_path)?);
            let ordered = sitemap::order(&mut set, &outline)?;
            println!(
                "==> Sitemap is consistent: {} entries, {} pages",
                ordered.len(),
                set.pages.len()
            );
        }
        Command::Build(args) => {
            let toolchain = SystemToolchain::new(config.tools.clone());
            let options = BuildOptions {
                layout: args.layout,
                group: args.group,
                run_compiler: !args.skip_compiler,
                minify: args.minify,
                tarball: args.tarball,
                check_links: args.check_links,
                refresh_revisions: args.refresh_revisions,
            };
            let site = pipeline::build(&cli.project, &config, &options, &toolchain)?;
            println!("==> Site ready: {}", site.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
