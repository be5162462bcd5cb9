use ::domain::PlaylistUrl;
use ::infrastructures::boundaries::ConsoleView;
use ::use_cases::boundaries::Accept;
use ::use_cases::boundaries::CancelDownloadRequestModel;
use ::use_cases::boundaries::PlayFirstRequestModel;
use ::use_cases::boundaries::PlayNextRequestModel;
use ::use_cases::boundaries::StartDownloadRequestModel;
use ::use_cases::boundaries::TogglePauseRequestModel;
use ::use_cases::interactors::DownloadPlaylistInteractor;
use ::use_cases::interactors::PlaybackInteractor;
use ::use_cases::models::descriptors::JobState;
use ::use_cases::playback::PlaybackCursor;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Url(String),
    Folder(Option<::std::path::PathBuf>),
    Start {
        url: Option<String>,
        folder: Option<::std::path::PathBuf>,
    },
    Pause,
    Cancel,
    First,
    Next,
    Status,
    Quit,
}

fn grammar() -> ::clap::Command {
    ::clap::Command::new("tapedeck")
        .multicall(true)
        .subcommand_required(true)
        .subcommand(
            ::clap::Command::new("url")
                .about("Check and remember a playlist URL")
                .arg(::clap::Arg::new("url").required(true)),
        )
        .subcommand(
            ::clap::Command::new("folder")
                .about("Show or set the download folder")
                .arg(::clap::Arg::new("path").num_args(1..)),
        )
        .subcommand(
            ::clap::Command::new("start")
                .about("Download a playlist into the folder")
                .arg(::clap::Arg::new("url"))
                .arg(::clap::Arg::new("folder").num_args(1..)),
        )
        .subcommand(::clap::Command::new("pause").about("Pause or resume the running download"))
        .subcommand(::clap::Command::new("cancel").about("Stop the running download after the current video"))
        .subcommand(::clap::Command::new("first").about("Play the first downloaded video"))
        .subcommand(::clap::Command::new("next").about("Play the next downloaded video"))
        .subcommand(::clap::Command::new("status").about("Show the download state and selections"))
        .subcommand(::clap::Command::new("quit").visible_alias("exit").about("Cancel any download and leave"))
}

/// Words after the command are joined back, so folders may contain spaces.
fn joined_path(matches: &::clap::ArgMatches, id: &str) -> Option<::std::path::PathBuf> {
    matches
        .get_many::<String>(id)
        .map(|parts| parts.map(String::as_str).collect::<Vec<_>>().join(" ").into())
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ::clap::Error> {
        let matches = grammar().try_get_matches_from(line.split_whitespace())?;

        let command = match matches.subcommand() {
            Some(("url", matches)) => Self::Url(matches.get_one::<String>("url").cloned().unwrap_or_default()),
            Some(("folder", matches)) => Self::Folder(joined_path(matches, "path")),
            Some(("start", matches)) => Self::Start {
                url: matches.get_one::<String>("url").cloned(),
                folder: joined_path(matches, "folder"),
            },
            Some(("pause", _)) => Self::Pause,
            Some(("cancel", _)) => Self::Cancel,
            Some(("first", _)) => Self::First,
            Some(("next", _)) => Self::Next,
            Some(("status", _)) => Self::Status,
            Some(("quit", _)) => Self::Quit,

            _ => unreachable!(),
        };

        Ok(command)
    }
}

/// Interactive front end: reads commands from stdin and drives the interactors.
#[derive(::bon::Builder)]
pub struct Shell {
    view: ::std::sync::Arc<ConsoleView>,
    downloads: ::std::sync::Arc<DownloadPlaylistInteractor>,
    playback: ::std::sync::Arc<PlaybackInteractor>,
    cursor: ::std::sync::Arc<PlaybackCursor>,

    url: Option<String>,
    folder: Option<::std::path::PathBuf>,

    #[builder(skip)]
    job: Option<::tokio::task::JoinHandle<()>>,
}

impl Shell {
    pub async fn run(mut self, start_immediately: bool) -> Fallible<()> {
        use ::colored::Colorize as _;
        use ::tokio::io::AsyncBufReadExt as _;

        self.view.println(format!("Type {} for the list of commands.", "help".cyan()));

        if start_immediately {
            self.execute(Command::Start { url: None, folder: None }).await?;
        }

        let mut lines = ::tokio::io::BufReader::new(::tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Ok(Command::Quit) => {
                    if self.is_busy() {
                        ::std::sync::Arc::clone(&self.downloads).accept(CancelDownloadRequestModel).await?;
                    }

                    break;
                },
                Ok(command) => {
                    if let Err(error) = self.execute(command).await {
                        ::tracing::warn!(error = %error, "command failed");
                        self.view.println(format!("{:#}", error).red());
                    }
                },
                Err(error) => self.view.println(error.render().ansi()),
            }
        }

        // Closing stdin lets a running download finish.
        if let Some(job) = self.job.take() {
            if let Err(error) = job.await {
                ::tracing::error!(error = %error, "download task panicked");
            }
        }

        Ok(())
    }

    fn is_busy(&self) -> bool {
        matches!(self.downloads.state(), JobState::Validating | JobState::Running)
    }

    /// Empty when nothing was chosen; the use cases report that themselves.
    fn folder(&self) -> MaybeOwnedPath {
        self.folder.clone().unwrap_or_default().into()
    }

    async fn execute(&mut self, command: Command) -> Fallible<()> {
        use ::colored::Colorize as _;

        match command {
            Command::Url(url) => {
                match PlaylistUrl::is_valid(&url) {
                    true => self.view.println("Valid playlist URL.".green()),
                    false => self.view.println("Not a YouTube playlist URL.".red()),
                }

                self.url = Some(url);
            },

            Command::Folder(None) => match &self.folder {
                Some(folder) => self.view.println(format!("Download folder: {}", folder.display())),
                None => self.view.println("No download folder selected.".yellow()),
            },

            Command::Folder(Some(folder)) => {
                let is_dir = ::tokio::fs::metadata(&folder).await.map(|metadata| metadata.is_dir()).unwrap_or(false);

                if !is_dir {
                    ::anyhow::bail!("'{}' is not a folder", folder.display());
                }

                self.view.println(format!("Download folder: {}", folder.display()));
                self.folder = Some(folder);
            },

            Command::Start { url, folder } => {
                if url.is_some() {
                    self.url = url;
                }

                if folder.is_some() {
                    self.folder = folder;
                }

                let request = StartDownloadRequestModel::builder()
                    .url(self.url.clone().unwrap_or_default())
                    .folder(self.folder())
                    .build();

                let downloads = ::std::sync::Arc::clone(&self.downloads);

                self.job = Some(::tokio::spawn(async move {
                    if let Err(error) = downloads.accept(request).await {
                        ::tracing::debug!(error = %error, "download ended early");
                    }
                }));
            },

            Command::Pause => {
                ::std::sync::Arc::clone(&self.downloads).accept(TogglePauseRequestModel).await?;
            },

            Command::Cancel => {
                ::std::sync::Arc::clone(&self.downloads).accept(CancelDownloadRequestModel).await?;
            },

            Command::First => {
                let request = PlayFirstRequestModel::builder().folder(self.folder()).build();

                if let Err(error) = ::std::sync::Arc::clone(&self.playback).accept(request).await {
                    ::tracing::debug!(error = %error, "nothing played");
                }
            },

            Command::Next => {
                let request = PlayNextRequestModel::builder().folder(self.folder()).build();

                if let Err(error) = ::std::sync::Arc::clone(&self.playback).accept(request).await {
                    ::tracing::debug!(error = %error, "nothing played");
                }
            },

            Command::Status => {
                let folder = self.folder.as_deref().map(|folder| folder.display().to_string());

                self.view.println(format!("State:    {:?}", self.downloads.state()));
                self.view.println(format!("URL:      {}", self.url.as_deref().unwrap_or("-")));
                self.view.println(format!("Folder:   {}", folder.as_deref().unwrap_or("-")));
                self.view.println(format!("Playback: #{}", self.cursor.current() + 1));
            },

            Command::Quit => {},
        }

        Ok(())
    }
}
