use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "textbehind", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite text behind the subject of an image and export it at native resolution.
    Compose(ComposeArgs),
    /// Render the on-screen editor canvas as a PNG.
    Preview(PreviewArgs),
    /// List the picker fonts and whether a face is installed for each.
    Fonts(FontsArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Photo to place text behind.
    #[arg(long)]
    image: PathBuf,

    /// Precomputed cutout of the subject (PNG with transparency).
    #[arg(long, conflicts_with = "remover")]
    cutout: Option<PathBuf>,

    /// External segmentation program; its arguments come from `--remover-arg`.
    #[arg(long)]
    remover: Option<String>,

    /// Argument for `--remover`, may contain `{input}`, `{output}` and `{model}`.
    #[arg(long = "remover-arg", requires = "remover", allow_hyphen_values = true)]
    remover_args: Vec<String>,

    /// Treat the remover output as a grayscale matte instead of a finished cutout.
    #[arg(long)]
    mask: bool,

    /// JSON array of text layers replacing the default one (display-canvas coordinates).
    #[arg(long)]
    layers: Option<PathBuf>,

    /// Replace the text of the default layer.
    #[arg(long, conflicts_with = "layers")]
    text: Option<String>,

    /// Studio configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Directory the export is written to.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Keep the selection frame around the selected layer.
    #[arg(long)]
    select: bool,
}

#[derive(Args, Debug)]
struct FontsArgs {
    /// Studio configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Fonts(args) => cmd_fonts(args),
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("TEXTBEHIND_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<textbehind::StudioConfig> {
    let cfg = match path {
        Some(p) => textbehind::StudioConfig::from_path(p)?,
        None => textbehind::StudioConfig::default(),
    };
    Ok(cfg.with_env_overrides())
}

fn read_layers_json(path: &Path) -> anyhow::Result<Vec<textbehind::NewTextLayer>> {
    let f = File::open(path).with_context(|| format!("open layers '{}'", path.display()))?;
    let layers: Vec<textbehind::NewTextLayer> =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse layers JSON")?;
    Ok(layers)
}

fn make_remover(
    input: &InputArgs,
    cfg: &textbehind::StudioConfig,
) -> anyhow::Result<Box<dyn textbehind::BackgroundRemover>> {
    let base: Box<dyn textbehind::BackgroundRemover> = if let Some(path) = &input.cutout {
        Box::new(textbehind::CutoutFileRemover::new(path))
    } else if let Some(program) = &input.remover {
        Box::new(textbehind::CommandRemover::new(
            program.clone(),
            input.remover_args.clone(),
        )?)
    } else if let Some(argv) = &cfg.removal.command {
        Box::new(textbehind::CommandRemover::from_argv(argv)?)
    } else {
        anyhow::bail!("no background remover: pass --cutout, --remover, or set removal.command");
    };

    if input.mask {
        Ok(Box::new(textbehind::MaskRemover::new(base)))
    } else {
        Ok(base)
    }
}

/// Upload the image and apply the requested layer edits.
fn open_studio(input: &InputArgs) -> anyhow::Result<textbehind::Studio> {
    let cfg = load_config(input.config.as_deref())?;
    let remover = make_remover(input, &cfg)?;
    let fonts = textbehind::FontBook::load(&cfg.fonts);
    if fonts.is_empty() {
        tracing::warn!("no fonts found; non-empty text cannot be rendered");
    }

    let mut studio = textbehind::Studio::new(cfg, fonts);
    let upload = textbehind::UploadFile::from_path(&input.image)?;
    studio.submit_upload(upload, remover.as_ref())?;

    if let Some(path) = &input.layers {
        let layers = read_layers_json(path)?;
        let default_ids = studio
            .session()
            .map(|s| s.store().ids())
            .unwrap_or_default();
        for id in default_ids {
            studio.remove_layer(id);
        }
        let mut last = None;
        for layer in layers {
            last = Some(studio.add_layer(layer)?);
        }
        studio.select(last);
    } else if let Some(text) = &input.text {
        let patch = textbehind::TextLayerPatch {
            text: Some(text.clone()),
            ..textbehind::TextLayerPatch::default()
        };
        studio.update_selected(&patch);
    }
    Ok(studio)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let mut studio = open_studio(&args.input)?;
    let mut sink = textbehind::DirectoryDownloads::new(&args.out_dir);
    let exported = studio.export(&mut sink)?;

    for path in sink.written() {
        eprintln!(
            "wrote {} ({}x{})",
            path.display(),
            exported.width,
            exported.height
        );
    }
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let mut studio = open_studio(&args.input)?;
    if !args.select {
        studio.select(None);
    }
    studio.initialize_compositor(textbehind::RenderSettings::default());

    let frame = match studio.render_frame()? {
        textbehind::Frame::Canvas(frame) => frame,
        textbehind::Frame::Placeholder(msg) => anyhow::bail!("canvas not ready: {msg}"),
    };

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .to_rgba_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_fonts(args: FontsArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let fonts = textbehind::FontBook::load(&cfg.fonts);

    println!("{} faces loaded", fonts.face_count());
    for choice in textbehind::AVAILABLE_FONTS {
        let mark = if fonts.has_family(choice.family) {
            "installed"
        } else {
            "missing"
        };
        println!("  {:<20} {mark}", choice.name);
    }
    Ok(())
}
