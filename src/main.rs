use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use oheya_alarm::config::DEFAULT_CONFIG_PATH;
use oheya_alarm::frame_capture::FrameArchive;
use oheya_alarm::notifier::SlackCredentials;
use oheya_alarm::{
    Camera, CpalPlayer, FrameSource, Monitor, NullPresenter, Presenter, Result, RoomClassifier,
    RunMode, Settings, SlackNotifier, TerminalPresenter,
};

/// Watches the room through a camera and raises a Slack alarm when it stays messy.
#[derive(Parser, Debug)]
#[command(name = "oheya-alarm", version)]
struct Cli {
    /// Turn on the messy-room alarm
    #[arg(short, long)]
    alert: bool,

    /// Play sounds
    #[arg(short, long)]
    sound: bool,

    /// Save every captured frame under the capture folder, sorted by result
    #[arg(short = 'i', long)]
    save_image: bool,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Do not draw the status display
    #[arg(long)]
    no_display: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Start.");

    if let Err(e) = run(cli).await {
        error!("{:?}", e);
        std::process::exit(1);
    }

    info!("Completed.");
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)?;
    let mode = RunMode {
        alert: cli.alert,
        sound: cli.sound,
        save_image: cli.save_image,
    };
    settings.validate(mode.alert, mode.sound)?;

    // Fail on missing sound assets before touching the camera.
    let player = if mode.sound {
        Some(CpalPlayer::new(&settings.sound_dir)?)
    } else {
        None
    };

    let camera = Camera::open_expected(settings.camera_count, settings.camera_raw_size)?;
    info!("Using camera {}", camera.index());

    let classifier = RoomClassifier::new(
        settings.classifier_url.clone(),
        settings.http_timeout(),
        settings.retry,
    )?;
    let notifier = SlackNotifier::new(
        SlackCredentials {
            webhook_url: settings.slack_webhook_url.clone(),
            user_id: settings.slack_user_id.clone(),
            token: settings.slack_token.clone(),
            channel_id: settings.slack_channel_id.clone(),
        },
        settings.slack_upload_url.clone(),
        settings.http_timeout(),
        settings.retry,
    )?;

    if cli.no_display {
        start(camera, classifier, notifier, NullPresenter, &settings, mode, player).await
    } else {
        let presenter = TerminalPresenter::stdout(settings.preview_path.clone());
        start(camera, classifier, notifier, presenter, &settings, mode, player).await
    }
}

async fn start<S, P>(
    source: S,
    classifier: RoomClassifier,
    notifier: SlackNotifier,
    presenter: P,
    settings: &Settings,
    mode: RunMode,
    player: Option<CpalPlayer>,
) -> Result<()>
where
    S: FrameSource,
    P: Presenter,
{
    let mut monitor = Monitor::new(source, classifier, notifier, presenter, settings, mode);
    if let Some(player) = player {
        monitor = monitor.with_sound(Box::new(player));
    }
    if mode.save_image {
        let run_name = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let archive = FrameArchive::create(&settings.capture_root, &run_name)?;
        info!("Saving frames under {}", archive.run_dir().display());
        monitor = monitor.with_archive(archive);
    }
    monitor.run().await
}
