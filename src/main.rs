use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use mediatee::media::{AudioProperties, VideoProperties};
use mediatee::source::{ColorSource, CommandAudioSource, CommandVideoSource, ToneSource};
use mediatee::tee::{TeeFrame, TeeTransformer};
use mediatee::{
    AudioChunk, Device, FrameReader, MediaProperties, StartPolicy, TeeConfig, TeeReader, VideoFrame,
};
use std::{panic, process};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = cli().get_matches();

    // kill the process as soon as a worker task panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(105);
    }));

    // SIGINT ends the run; the tee child is killed with us
    ctrlc::set_handler(move || {
        process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let tee_config = tee_config(&matches)?;
    let frames = *matches.get_one::<u64>("frames").unwrap_or(&100);
    let paced = matches.get_flag("paced");
    let source_cmd = matches.get_one::<String>("source-cmd");

    let device = match matches.get_one::<String>("kind").map(String::as_str) {
        Some("video") => {
            let props = video_properties(&matches);
            match source_cmd {
                Some(cmd) => Device::video(
                    CommandVideoSource::new(cmd, "source", props).with_stderr(matches.get_flag("show-stderr")),
                ),
                None => Device::video(
                    ColorSource::new(parse_rgb(matches.get_one::<String>("color"))?)
                        .with_properties(props)
                        .paced(paced),
                ),
            }
        }
        _ => {
            let props = audio_properties(&matches);
            match source_cmd {
                Some(cmd) => Device::audio(
                    CommandAudioSource::new(cmd, "source", props).with_stderr(matches.get_flag("show-stderr")),
                ),
                None => Device::audio(
                    ToneSource::new(*matches.get_one::<f32>("frequency").unwrap_or(&440.0))
                        .with_properties(props)
                        .paced(paced),
                ),
            }
        }
    };

    log::info!("{} device {} -> `{}`", device.kind(), device.id(), tee_config.command);
    device.open().await.context("failed to open source")?;

    let result = record(&device, &tee_config, frames).await;

    device.close().await.context("failed to close source")?;
    result
}

async fn record(device: &Device, tee_config: &TeeConfig, frames: u64) -> anyhow::Result<()> {
    match device {
        Device::Audio(audio) => {
            let reader = audio.audio_record(MediaProperties::default()).await?;
            pump(TeeTransformer::<AudioChunk>::new(tee_config)?.apply(reader), frames).await
        }
        Device::Video(video) => {
            let reader = video.video_record(MediaProperties::default()).await?;
            pump(TeeTransformer::<VideoFrame>::new(tee_config)?.apply(reader), frames).await
        }
    }
}

/// Pull up to `frames` frames through the tee, then shut it down
async fn pump<R>(mut reader: TeeReader<R>, frames: u64) -> anyhow::Result<()>
where
    R: FrameReader,
    R::Frame: TeeFrame,
{
    let stats = reader.stats();
    for _ in 0..frames {
        match reader.read().await {
            Ok((_frame, release)) => release.release(),
            Err(e) if e.is_end_of_stream() => {
                log::info!("source ended");
                break;
            }
            Err(e) => return Err(e).context("tee stopped"),
        }
    }
    reader.close().await?;

    log::info!("mirrored {} frame(s), {} byte(s)", stats.frames(), stats.bytes());
    Ok(())
}

fn tee_config(matches: &ArgMatches) -> anyhow::Result<TeeConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => TeeConfig::from_file(path).with_context(|| format!("loading {path}"))?,
        None => TeeConfig::default(),
    };

    if let Some(command) = matches.get_one::<String>("tee") {
        config.command = command.clone();
    }
    if let Some(label) = matches.get_one::<String>("label") {
        config.label = label.clone();
    }
    if matches.get_flag("show-stdout") {
        config.show_stdout = true;
    }
    if matches.get_flag("show-stderr") {
        config.show_stderr = true;
    }
    if matches.get_flag("immediate") {
        config.start = StartPolicy::Immediate;
    }
    if config.command.trim().is_empty() {
        bail!("no tee command given, use --tee or a config file");
    }
    Ok(config)
}

fn audio_properties(matches: &ArgMatches) -> AudioProperties {
    AudioProperties {
        channel_count: *matches.get_one::<u16>("channels").unwrap_or(&2),
        sample_rate: *matches.get_one::<u32>("sample-rate").unwrap_or(&48000),
        samples_per_chunk: *matches.get_one::<usize>("samples").unwrap_or(&960),
        sample_format: matches
            .get_one::<String>("sample-format")
            .cloned()
            .unwrap_or_default(),
    }
}

fn video_properties(matches: &ArgMatches) -> VideoProperties {
    VideoProperties {
        width: *matches.get_one::<u32>("width").unwrap_or(&320),
        height: *matches.get_one::<u32>("height").unwrap_or(&240),
        frame_format: matches
            .get_one::<String>("pix-format")
            .cloned()
            .unwrap_or_default(),
        frame_rate: *matches.get_one::<f32>("fps").unwrap_or(&30.0),
    }
}

fn parse_rgb(value: Option<&String>) -> anyhow::Result<[u8; 3]> {
    let Some(value) = value else {
        return Ok([0, 128, 255]);
    };
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid colour {value:?}"))?;
    match parts.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => bail!("colour must be r,g,b, got {value:?}"),
    }
}

fn cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("kind")
                .short('k')
                .long("kind")
                .value_name("KIND")
                .help("Media kind to generate and tee.")
                .value_parser(["audio", "video"])
                .default_value("audio"),
        )
        .arg(
            Arg::new("tee")
                .short('t')
                .long("tee")
                .value_name("COMMAND")
                .help("Command receiving the raw frames on stdin, e.g. \"sh -c 'cat > out.raw'\"."),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON tee configuration; flags override its fields."),
        )
        .arg(
            Arg::new("label")
                .short('l')
                .long("label")
                .value_name("LABEL")
                .help("Prefix for forwarded tee output."),
        )
        .arg(
            Arg::new("frames")
                .short('n')
                .long("frames")
                .value_name("N")
                .help("Number of frames to pull.")
                .value_parser(value_parser!(u64))
                .default_value("100"),
        )
        .arg(
            Arg::new("show-stdout")
                .long("show-stdout")
                .help("Log the tee command's stdout.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("show-stderr")
                .long("show-stderr")
                .help("Log the stderr of the tee and source commands.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("immediate")
                .long("immediate")
                .help("Start the tee command before the first frame (it won't see the frame environment).")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("paced")
                .long("paced")
                .help("Deliver test frames in real time.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("source-cmd")
                .short('s')
                .long("source-cmd")
                .value_name("COMMAND")
                .help("Read raw frames from this command's stdout instead of a test pattern."),
        )
        .arg(
            Arg::new("frequency")
                .long("frequency")
                .value_name("HZ")
                .value_parser(value_parser!(f32))
                .default_value("440"),
        )
        .arg(
            Arg::new("sample-rate")
                .long("sample-rate")
                .value_parser(value_parser!(u32))
                .default_value("48000"),
        )
        .arg(
            Arg::new("channels")
                .long("channels")
                .value_parser(value_parser!(u16))
                .default_value("2"),
        )
        .arg(
            Arg::new("samples")
                .long("samples")
                .help("Samples per channel in each chunk.")
                .value_parser(value_parser!(usize))
                .default_value("960"),
        )
        .arg(
            Arg::new("sample-format")
                .long("sample-format")
                .help("Int16Interleaved, Float32Interleaved, Int16NonInterleaved, Float32NonInterleaved.")
                .default_value("Int16Interleaved"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(value_parser!(u32))
                .default_value("320"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(value_parser!(u32))
                .default_value("240"),
        )
        .arg(
            Arg::new("pix-format")
                .long("pix-format")
                .help("I420 or RGBA.")
                .default_value("I420"),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_parser(value_parser!(f32))
                .default_value("30"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("R,G,B")
                .help("Colour of the video test pattern."),
        )
}
