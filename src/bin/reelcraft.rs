use std::f64::consts::{FRAC_PI_2, PI};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use kurbo::Shape as _;
use reelcraft::{
    ChunkBody, DrawStep, FfmpegAudioDecoder, FfmpegClipSource, FfmpegSink, Fps,
    HostOpts, Point, Rect, RenderHost, RenderOpts, Rgba8Premul, SessionCtx, SessionOpts,
    SoundOptions, VideoSrc,
};

#[derive(Parser, Debug)]
#[command(name = "reelcraft", version)]
struct Cli {
    /// Log render unit and host transitions to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of the demo as a PNG.
    Frame(FrameArgs),
    /// Print the demo's compiled audio timeline as JSON.
    Instructions(DemoArgs),
    /// Render the demo to an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Canvas width.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Canvas height.
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Sound played on every quarter turn, relative to `--assets`.
    #[arg(long, default_value = "beep.wav")]
    beep: String,

    /// Root directory for sound and clip sources.
    #[arg(long, default_value = ".")]
    assets: PathBuf,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    demo: DemoArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    demo: DemoArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Mix and mux the audio timeline (requires the `media-ffmpeg` feature).
    #[arg(long)]
    audio: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Instructions(args) => cmd_instructions(args),
        Command::Render(args) => cmd_render(args),
    }
}

/// A dot orbiting the canvas center twice, beeping on every quarter turn.
struct Orbit {
    beep: String,
}

const TURNS: f64 = 2.0;
const RADIANS_PER_SEC: f64 = PI;

impl VideoSrc for Orbit {
    fn chunk(&mut self, _index: usize) -> Option<ChunkBody> {
        let beep = self.beep.clone();
        Some(ChunkBody::setup(move |ctx: &mut SessionCtx<'_>| {
            let center = Point::new(f64::from(ctx.width()) / 2.0, f64::from(ctx.height()) / 2.0);
            let radius = f64::from(ctx.width().min(ctx.height())) * 0.35;
            let bounds = Rect::new(0.0, 0.0, f64::from(ctx.width()), f64::from(ctx.height()));
            let mut quarters_played = 0u32;

            let draw: DrawStep = Box::new(move |ctx| {
                let angle = ctx.current_time() * RADIANS_PER_SEC;
                if angle >= TURNS * 2.0 * PI {
                    return Ok(true);
                }
                let quarter = (angle / FRAC_PI_2).floor() as u32;
                if quarter >= quarters_played {
                    ctx.play_sound(beep.clone(), SoundOptions::default());
                    quarters_played = quarter + 1;
                }

                let dot = Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                );
                let surface = ctx.surface();
                surface.fill_rect(bounds, Rgba8Premul::opaque(18, 20, 28));
                let ring = kurbo::Circle::new(center, radius).to_path(0.1);
                surface.fill_path(&ring, Rgba8Premul::opaque(36, 40, 56));
                let disc = kurbo::Circle::new(dot, radius * 0.12).to_path(0.1);
                surface.fill_path(&disc, Rgba8Premul::opaque(240, 180, 60));
                Ok(false)
            });
            Ok(draw)
        }))
    }
}

fn render_demo(args: &DemoArgs) -> anyhow::Result<RenderHost> {
    let opts = HostOpts {
        width: args.width,
        height: args.height,
        frame_rate: Fps::integer(args.fps)?,
        session: SessionOpts {
            assets_root: args.assets.clone(),
            ..SessionOpts::default()
        },
        ..HostOpts::default()
    };
    let mut host =
        RenderHost::new(opts).with_clip_source(Box::new(FfmpegClipSource::new(&args.assets)));
    host.bind(Orbit {
        beep: args.beep.clone(),
    })?;
    if host.render(RenderOpts::default())?.is_none() {
        anyhow::bail!("render was aborted");
    }
    Ok(host)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let host = render_demo(&args.demo)?;
    let frames = host.frames().unwrap_or_default();
    let frame = frames.get(args.frame).cloned().with_context(|| {
        format!(
            "frame {} out of range (demo has {} frames)",
            args.frame,
            frames.len()
        )
    })?;

    reelcraft::ensure_parent_dir(&args.out)?;
    frame
        .into_rgba_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_instructions(args: DemoArgs) -> anyhow::Result<()> {
    let host = render_demo(&args)?;
    let instructions = host.audio_instructions().cloned().unwrap_or_default();
    let json = serde_json::to_string_pretty(&instructions).context("serialize instructions")?;
    println!("{json}");
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if !reelcraft::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg not found on PATH");
    }
    let mut host = render_demo(&args.demo)?;
    let decoder = FfmpegAudioDecoder::new(&args.demo.assets);
    let decoder = args
        .audio
        .then_some(&decoder as &dyn reelcraft::AudioDecoder);

    let mut sink = FfmpegSink::new(&args.out).with_background(Rgba8Premul::opaque(18, 20, 28));
    let stats = host
        .generate_video(&mut sink, decoder, true)
        .with_context(|| format!("generate '{}'", args.out.display()))?;

    if stats.fell_behind {
        eprintln!("note: encoding fell behind the frame rate");
    }
    eprintln!("wrote {} ({} frames)", args.out.display(), stats.frames_painted);
    Ok(())
}
