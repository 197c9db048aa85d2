use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use partition_wm::common::config::{Config, SpaceMode, config_file};
use partition_wm::common::log;
use partition_wm::layout_engine::{LayoutEngine, LayoutEvent, SerializedNode, SpaceId};
use partition_wm::model::WindowId;
use partition_wm::sys::geometry::Rect;
use serde::Serialize;

#[derive(Parser)]
#[command(version, about = "Inspect binary space partitioning layouts")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration file for problems.
    Validate,
    /// Compute the window frames of a layout on a screen.
    Layout {
        /// Layout file (ron) to load.
        #[arg(long, value_name = "PATH")]
        layout: Option<PathBuf>,

        /// Usable screen area as "x,y,width,height".
        #[arg(long, default_value = "0,0,1920,1080")]
        frame: Rect,

        #[arg(long, default_value_t = 1)]
        screen: u32,

        #[arg(long, default_value_t = 1)]
        desktop: u32,

        /// Tiling mode, overriding the configured one ("bsp", "monocle" or "float").
        #[arg(long)]
        mode: Option<SpaceMode>,

        /// Windows to add after the layout is loaded.
        #[arg(long, value_delimiter = ',')]
        windows: Vec<u32>,

        /// Print frames as JSON.
        #[arg(long)]
        json: bool,

        /// Also print the tree.
        #[arg(long)]
        tree: bool,
    },
    /// Print the name and tag of a space.
    Tag {
        #[arg(long, default_value_t = 1)]
        screen: u32,

        #[arg(long, default_value_t = 1)]
        desktop: u32,
    },
}

#[derive(Serialize)]
struct FrameRow {
    window: WindowId,
    #[serde(flatten)]
    frame: Rect,
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();

    if let Err(e) = run(opt) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let path = path.unwrap_or_else(config_file);
    if path.exists() {
        Config::read(&path).with_context(|| format!("reading {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config = load_config(opt.config)?;
    match opt.command {
        Commands::Validate => {
            let issues = config.validate();
            if !issues.is_empty() {
                for issue in &issues {
                    eprintln!("  - {issue}");
                }
                bail!("config validation failed with {} issue(s)", issues.len());
            }
            println!("Config validation passed");
        }
        Commands::Layout {
            layout,
            frame,
            screen,
            desktop,
            mode,
            windows,
            json,
            tree,
        } => {
            let space = SpaceId::new(screen, desktop);
            let mut settings = config.settings.layout;
            if let Some(mode) = mode {
                settings.mode = mode;
                settings.spaces.iter_mut().for_each(|rule| rule.mode = None);
            }
            let mut engine = LayoutEngine::new(settings);
            let _ = engine.activate_space(space, frame);
            if let Some(path) = layout {
                let shape = SerializedNode::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?;
                let _ = engine.apply_shape(space, &shape)?;
            }
            for id in windows {
                let _ = engine.handle_event(LayoutEvent::WindowAdded { space, window: WindowId(id) })?;
            }

            let frames = engine.frames(space)?;
            if json {
                let rows: Vec<FrameRow> =
                    frames.into_iter().map(|(window, frame)| FrameRow { window, frame }).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for (window, frame) in frames {
                    println!("{window}\t{frame}");
                }
            }
            if tree {
                print!("{}", engine.draw_tree(space)?);
            }
        }
        Commands::Tag { screen, desktop } => {
            let engine = LayoutEngine::new(config.settings.layout);
            let space = SpaceId::new(screen, desktop);
            println!("{} {}", engine.space_name(space), engine.space_tag(space, None));
        }
    }
    Ok(())
}
