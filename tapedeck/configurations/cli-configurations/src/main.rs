pub(crate) mod shell;
pub(crate) mod utils;

use ::infrastructures::boundaries::ConsoleView;
use ::infrastructures::gateways::libraries::FilesystemMediaLibrary;
use ::infrastructures::gateways::media_sources::YtdlpMediaSource;
use ::infrastructures::gateways::media_sources::DEFAULT_FORMAT;
use ::infrastructures::gateways::players::SystemMediaPlayer;
use ::use_cases::boundaries::DownloadPlaylistOutputBoundary;
use ::use_cases::boundaries::PlaybackOutputBoundary;
use ::use_cases::gateways::MediaLibrary;
use ::use_cases::gateways::MediaPlayer;
use ::use_cases::gateways::MediaSource;
use ::use_cases::interactors::DownloadPlaylistInteractor;
use ::use_cases::interactors::PlaybackInteractor;
use ::use_cases::playback::PlaybackCursor;

use crate::shell::Shell;
use crate::utils::aliases::Fallible;
use crate::utils::extensions::OptionExt;

#[tokio::main]
async fn main() -> Fallible<()> {
    let command = ::clap::Command::new("tapedeck")
        .about("Download a YouTube playlist in order and watch it while it downloads")
        .arg(
            ::clap::Arg::new("directory")
                .short('o')
                .long("directory")
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        )
        .arg(
            ::clap::Arg::new("url")
                .short('i')
                .long("url")
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("ytdlp")
                .long("ytdlp")
                .default_value("yt-dlp")
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("format")
                .long("format")
                .default_value(DEFAULT_FORMAT)
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("poll-interval")
                .long("poll-interval")
                .default_value("500")
                .value_parser(::clap::value_parser!(u64).range(1..)),
        )
        .arg(
            ::clap::Arg::new("autoplay")
                .long("autoplay")
                .action(::clap::ArgAction::SetTrue),
        )
        .arg(
            ::clap::Arg::new("player")
                .long("player")
                .value_parser(::clap::value_parser!(::std::ffi::OsString)),
        )
        .arg(
            ::clap::Arg::new("logs")
                .long("logs")
                .default_value("logs")
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        );

    let matches = command.get_matches();

    let writer = ::tracing_appender::rolling::daily(matches.get_one::<::std::path::PathBuf>("logs").ok()?, "tapedeck.log");
    let (writer, _guard) = ::tracing_appender::non_blocking(writer);

    ::tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            ::tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| ::tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();

    let player = ::std::sync::Arc::new(
        SystemMediaPlayer::builder()
            .maybe_program(matches.get_one::<::std::ffi::OsString>("player").cloned())
            .build(),
    );

    let view = ::std::sync::Arc::new(ConsoleView::new(
        matches
            .get_flag("autoplay")
            .then(|| ::std::sync::Arc::clone(&player) as ::std::sync::Arc<dyn MediaPlayer>),
    ));

    let media_source = ::std::sync::Arc::new(
        YtdlpMediaSource::builder()
            .program(matches.get_one::<::std::string::String>("ytdlp").ok()?.to_owned())
            .format(matches.get_one::<::std::string::String>("format").ok()?.to_owned())
            .build(),
    );

    let cursor = ::std::sync::Arc::new(PlaybackCursor::new(
        ::std::sync::Arc::new(FilesystemMediaLibrary) as ::std::sync::Arc<dyn MediaLibrary>
    ));

    let downloads = ::std::sync::Arc::new(
        DownloadPlaylistInteractor::builder()
            .output_boundary(::std::sync::Arc::clone(&view) as ::std::sync::Arc<dyn DownloadPlaylistOutputBoundary>)
            .media_source(media_source as ::std::sync::Arc<dyn MediaSource>)
            .cursor(::std::sync::Arc::clone(&cursor))
            .poll_interval(::std::time::Duration::from_millis(*matches.get_one::<u64>("poll-interval").ok()?))
            .build(),
    );

    let playback = ::std::sync::Arc::new(
        PlaybackInteractor::builder()
            .output_boundary(::std::sync::Arc::clone(&view) as ::std::sync::Arc<dyn PlaybackOutputBoundary>)
            .cursor(::std::sync::Arc::clone(&cursor))
            .player(player as ::std::sync::Arc<dyn MediaPlayer>)
            .build(),
    );

    ::tracing::info!(version = env!("CARGO_PKG_VERSION"), "tapedeck started");

    let url = matches.get_one::<::std::string::String>("url").cloned();
    let start_immediately = url.is_some();

    let shell = Shell::builder()
        .view(view)
        .downloads(downloads)
        .playback(playback)
        .cursor(cursor)
        .maybe_url(url)
        .maybe_folder(matches.get_one::<::std::path::PathBuf>("directory").cloned())
        .build();

    shell.run(start_immediately).await
}
