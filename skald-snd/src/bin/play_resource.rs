//! Play one embedded resource straight out of a bundle file.
//!
//! Developer utility for exercising the sound backend without the story
//! engine: point it at a bundle, give the resource's byte offset, length
//! and kind, and it plays the resource on the requested channel.
//!
//! ```bash
//! play-resource game.bundle --offset 4096 --length 731022 --kind mp3 --loop
//! ```

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skald_common::{Channel, Settings};
use skald_snd::engine::AudioThread;
use skald_snd::playback::Outcome;
use skald_snd::resource::ResourceKind;
use skald_snd::sink::CpalSink;

#[derive(Parser, Debug)]
#[command(name = "play-resource")]
#[command(about = "Play one embedded resource from a media bundle")]
#[command(version)]
struct Args {
    /// Bundle file containing the resource
    bundle: PathBuf,

    /// Byte offset of the resource inside the bundle
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Resource length in bytes (0 = rest of the file)
    #[arg(long, default_value_t = 0)]
    length: u64,

    /// Resource kind (midi, xm, s3m, mod, mp3, wav)
    #[arg(long)]
    kind: String,

    /// Playback channel (music or sample)
    #[arg(long, default_value = "music")]
    channel: String,

    /// Logical volume, 0 to 100
    #[arg(long, default_value_t = 100)]
    volume: i32,

    /// Loop until interrupted
    #[arg(long = "loop")]
    looped: bool,

    /// Settings file (defaults to SKALD_CONFIG or the user config dir)
    #[arg(long, env = "SKALD_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skald_snd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let kind = ResourceKind::from_name(&args.kind)
        .with_context(|| format!("unknown resource kind '{}'", args.kind))?;
    let channel = match args.channel.as_str() {
        "music" => Channel::Music,
        "sample" => Channel::Sample,
        other => bail!("unknown channel '{}'", other),
    };

    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;

    let mut bundle = File::open(&args.bundle)
        .with_context(|| format!("failed to open bundle {}", args.bundle.display()))?;
    let total = bundle.metadata()?.len();
    if args.offset > total {
        bail!("offset {} is beyond the end of the bundle ({} bytes)", args.offset, total);
    }
    let length = if args.length == 0 {
        total - args.offset
    } else {
        args.length
    };
    bundle.seek(SeekFrom::Start(args.offset))?;

    let device = settings.device.clone();
    let audio = AudioThread::spawn(move || CpalSink::open(device.as_deref()), settings, None)
        .context("failed to start audio thread")?;
    let handle = audio.handle();
    handle.set_volume(channel, args.volume);

    info!(
        bundle = %args.bundle.display(),
        offset = args.offset,
        length,
        kind = kind.name(),
        "playing resource"
    );
    match handle.play(channel, bundle, length, kind, args.looped)? {
        Outcome::Started => {}
        Outcome::Declined => bail!("the {} channel is disabled in settings", args.channel),
    }

    while handle.is_playing(channel) {
        thread::sleep(Duration::from_millis(200));
    }

    audio.shutdown();
    Ok(())
}
