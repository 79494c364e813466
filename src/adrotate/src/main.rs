//! adrotate: render ads, groups and placements from a JSON catalog.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, io};

use adrotate_core::{AppConfig, EntityId, RenderArgs, RequestContext};
use adrotate_render::{Engine, RenderSession};
use adrotate_store::MemoryStore;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "adrotate")]
#[command(about = "Ad selection and rendering from a JSON catalog")]
#[command(version)]
struct Cli {
    /// Catalog fixture with ads, groups and placements
    #[arg(long, env = "ADROTATE_CATALOG")]
    catalog: PathBuf,

    /// Configuration file (TOML); ADROTATE__* variables override it
    #[arg(long, env = "ADROTATE_CONFIG")]
    config: Option<String>,

    /// Request context as JSON (page, visitor, now)
    #[arg(long)]
    context: Option<PathBuf>,

    /// Render arguments as inline JSON
    #[arg(long)]
    args: Option<String>,

    /// Fixed selection seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the request stats to stderr after rendering
    #[arg(long, default_value_t = false)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a single ad
    Ad {
        id: EntityId,

        /// Render with this ad type instead of the stored one
        #[arg(long = "type")]
        type_tag: Option<String>,
    },

    /// Render a group
    Group {
        id: EntityId,

        /// Rotate with this group type instead of the stored one
        #[arg(long = "type")]
        type_tag: Option<String>,
    },

    /// Render a placement by slug or id
    Placement { id: String },

    /// Inject content placements into a post body
    Inject {
        /// Post body file (default: stdin)
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adrotate=info,adrotate_render=info,adrotate_store=info".into()),
        )
        .json()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(seed) = cli.seed {
        config.selection.seed = Some(seed);
    }

    let store = MemoryStore::from_path(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog.display()))?;
    info!(catalog = %cli.catalog.display(), entities = store.len(), "Catalog ready");

    let ctx = match &cli.context {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading context {}", path.display()))?;
            serde_json::from_str::<RequestContext>(&raw).context("parsing request context")?
        }
        None => RequestContext::default(),
    };
    let args = match &cli.args {
        Some(raw) => serde_json::from_str::<RenderArgs>(raw).context("parsing render args")?,
        None => RenderArgs::new(),
    };

    let engine = Engine::new(Arc::new(store), config);
    let mut session = engine.session(ctx);
    let output = render(&mut session, cli.command, args)?;
    println!("{output}");

    if cli.stats {
        let stats = serde_json::to_string_pretty(&session.stats().to_json())?;
        eprintln!("{stats}");
    }
    Ok(())
}

fn render(session: &mut RenderSession<'_>, command: Commands, args: RenderArgs) -> anyhow::Result<String> {
    let output = match command {
        Commands::Ad { id, type_tag } => session.render_ad(id, type_tag.as_deref(), args),
        Commands::Group { id, type_tag } => session.render_group(id, type_tag.as_deref(), args),
        Commands::Placement { id } => session.render_placement(&id, args),
        Commands::Inject { file } => {
            let content = match file {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("reading post body {}", path.display()))?,
                None => {
                    let mut content = String::new();
                    io::stdin().read_to_string(&mut content).context("reading stdin")?;
                    content
                }
            };
            session.inject_content(&content)
        }
    };
    Ok(output)
}
