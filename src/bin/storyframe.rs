use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use storyframe::VideoDirectory as _;

#[derive(Parser, Debug)]
#[command(name = "storyframe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a story image from a composition config JSON.
    Render(RenderArgs),
    /// Search the video directory and print the records as JSON.
    Search(SearchArgs),
    /// List a channel's uploads, newest first, as JSON.
    Channel(ChannelArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input composition config JSON.
    #[arg(long)]
    config: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the image as a data URI on stdout instead of (or besides) --out.
    #[arg(long)]
    data_uri: bool,

    /// Font file for the label and title; system bold sans-serif otherwise.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Avatar service endpoint; the user email is appended as the seed.
    #[arg(long)]
    avatar_template: Option<String>,

    /// Per-fetch timeout in seconds.
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct SearchArgs {
    /// Search query.
    query: String,

    /// API key; falls back to the STORYFRAME_YT_API_KEY environment variable.
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Parser, Debug)]
struct ChannelArgs {
    /// Channel id (the `UC...` form).
    channel_id: String,

    /// API key; falls back to the STORYFRAME_YT_API_KEY environment variable.
    #[arg(long)]
    api_key: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Search(args) => cmd_search(args),
        Command::Channel(args) => cmd_channel(args),
    }
}

fn read_config_json(path: &Path) -> anyhow::Result<storyframe::CompositionConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let config: storyframe::CompositionConfig =
        serde_json::from_reader(r).with_context(|| "parse composition config JSON")?;
    Ok(config)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if args.out.is_none() && !args.data_uri {
        anyhow::bail!("choose an output: --out <path> and/or --data-uri");
    }

    let config = read_config_json(&args.config)?;

    let mut opts = storyframe::ComposerOpts {
        fetch_timeout: Duration::from_secs(args.timeout_secs),
        ..Default::default()
    };
    if let Some(template) = args.avatar_template {
        opts.avatar_url_template = template;
    }
    opts.font_path = args.font;

    let composer = storyframe::StoryComposer::new(opts)?;
    let image = composer.compose(&config)?;

    if let Some(out) = &args.out {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        std::fs::write(out, &image.png)
            .with_context(|| format!("write png '{}'", out.display()))?;
        eprintln!("wrote {} ({}x{})", out.display(), image.width, image.height);
    }
    if args.data_uri {
        println!("{}", image.to_data_uri());
    }
    Ok(())
}

fn cmd_search(args: SearchArgs) -> anyhow::Result<()> {
    let directory = make_directory(args.api_key)?;
    let videos = directory.search_videos(&args.query)?;
    println!("{}", serde_json::to_string_pretty(&videos)?);
    Ok(())
}

fn cmd_channel(args: ChannelArgs) -> anyhow::Result<()> {
    let directory = make_directory(args.api_key)?;
    let videos = directory.channel_videos(&args.channel_id)?;
    println!("{}", serde_json::to_string_pretty(&videos)?);
    Ok(())
}

fn make_directory(api_key: Option<String>) -> anyhow::Result<storyframe::YouTubeDirectory> {
    let timeout = Duration::from_secs(20);
    let directory = match api_key {
        Some(key) => storyframe::YouTubeDirectory::new(key, timeout)?,
        None => storyframe::YouTubeDirectory::from_env(timeout)?,
    };
    Ok(directory)
}
