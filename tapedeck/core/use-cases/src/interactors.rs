use ::async_trait::async_trait;
use ::domain::Playlist;
use ::domain::PlaylistUrl;

use crate::boundaries::Accept;
use crate::boundaries::CancelDownloadRequestModel;
use crate::boundaries::DownloadPlaylistOutputBoundary;
use crate::boundaries::PlayFirstRequestModel;
use crate::boundaries::PlayNextRequestModel;
use crate::boundaries::PlaybackOutputBoundary;
use crate::boundaries::StartDownloadRequestModel;
use crate::boundaries::TogglePauseRequestModel;
use crate::boundaries::Update;
use crate::controls::JobControl;
use crate::gateways::MediaPlayer;
use crate::gateways::MediaSource;
use crate::models::descriptors::DownloadSample;
use crate::models::descriptors::JobOutcome;
use crate::models::descriptors::JobState;
use crate::models::errors::DownloadError;
use crate::models::errors::PlaybackError;
use crate::models::events::DiagnosticLevel;
use crate::models::events::LogEvent;
use crate::models::events::NotificationEvent;
use crate::models::events::PlaybackReadyEvent;
use crate::models::events::PlaybackStartedEvent;
use crate::models::events::ProgressEvent;
use crate::models::events::StartedEvent;
use crate::models::events::TerminalEvent;
use crate::models::events::TerminalKind;
use crate::playback::PlaybackCursor;
use crate::progress::ProgressTracker;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;

pub const DEFAULT_POLL_INTERVAL: ::std::time::Duration = ::std::time::Duration::from_millis(500);

/// Runs one playlist at a time, item by item, into a folder.
///
/// `Start` is meant to be spawned onto its own task: it only returns once the
/// job is over. A `Start` arriving mid-job cancels the running one and waits
/// for it to drain first. `TogglePause` and `Cancel` act on the current job's
/// [`JobControl`] and return immediately.
#[derive(::bon::Builder)]
pub struct DownloadPlaylistInteractor {
    output_boundary: ::std::sync::Arc<dyn DownloadPlaylistOutputBoundary>,
    media_source: ::std::sync::Arc<dyn MediaSource>,
    cursor: ::std::sync::Arc<PlaybackCursor>,

    #[builder(default = DEFAULT_POLL_INTERVAL)]
    poll_interval: ::std::time::Duration,

    #[builder(skip = ::tokio::sync::Mutex::new(::std::sync::Arc::new(JobControl::new())))]
    control: ::tokio::sync::Mutex<::std::sync::Arc<JobControl>>,

    #[builder(skip = ::tokio::sync::watch::Sender::new(JobState::Idle))]
    state: ::tokio::sync::watch::Sender<JobState>,

    /// Held by a job from validation to deactivation.
    #[builder(skip)]
    running: ::tokio::sync::Mutex<()>,
}

impl DownloadPlaylistInteractor {
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> ::tokio::sync::watch::Receiver<JobState> {
        self.state.subscribe()
    }

    /// Only the job owning the current token may move the state machine.
    async fn transition(&self, control: &::std::sync::Arc<JobControl>, state: JobState) {
        if ::std::sync::Arc::ptr_eq(&*self.control.lock().await, control) {
            ::tracing::debug!(?state, "job state changed");
            self.state.send_replace(state);
        }
    }

    async fn emit<Event>(&self, event: Event) -> Fallible<()>
    where
        dyn DownloadPlaylistOutputBoundary: Update<Event>,
        Event: ::core::marker::Send + ::core::marker::Sync,
    {
        Update::<Event>::update(::std::sync::Arc::clone(&self.output_boundary), &event).await
    }

    async fn log(&self, level: DiagnosticLevel, text: impl Into<String>) -> Fallible<()> {
        self.emit(LogEvent::new(level, text.into().into())).await
    }

    async fn notify(&self, level: DiagnosticLevel, title: &'static str, message: impl Into<String>) -> Fallible<()> {
        self.emit(NotificationEvent::new(level, title.into(), message.into().into())).await
    }

    async fn report(&self, error: &DownloadError) -> Fallible<()> {
        let title = match error {
            DownloadError::ItemFetch { .. } => "Download Error",
            _ => "Error",
        };

        self.log(DiagnosticLevel::Error, error.to_string()).await?;
        self.notify(DiagnosticLevel::Error, title, error.to_string()).await
    }

    fn validate(request: &StartDownloadRequestModel) -> Result<PlaylistUrl, DownloadError> {
        if request.url.is_empty() {
            return Err(DownloadError::InvalidInput("missing playlist URL".into()));
        }

        if request.folder.as_os_str().is_empty() {
            return Err(DownloadError::InvalidInput("missing download folder".into()));
        }

        PlaylistUrl::parse(request.url.clone())
            .map_err(|error| DownloadError::InvalidInput(error.to_string().into()))
    }

    async fn run(
        &self, control: &JobControl, playlist: &Playlist, folder: &MaybeOwnedPath,
    ) -> Fallible<JobOutcome> {
        let total = playlist.items.len();
        let mut tracker = ProgressTracker::new(total);

        for (position, item) in playlist.items.iter().enumerate() {
            if control.is_canceled() || control.wait_while_paused(self.poll_interval).await {
                ::tracing::info!(index = item.index, "download canceled before item");
                return Ok(JobOutcome::Canceled);
            }

            let filename = item.filename();
            let started_at = ::tokio::time::Instant::now();

            ::tracing::debug!(index = item.index, %filename, "fetching item");

            let persisted = ::std::sync::Arc::clone(&self.media_source)
                .fetch_and_persist(item.handle.clone(), folder.clone(), filename.clone().into())
                .await;

            match persisted {
                Ok(persisted) => {
                    let sample = DownloadSample {
                        index: item.index,
                        bytes: persisted.bytes_written,
                        duration: started_at.elapsed(),
                    };

                    let state = tracker.on_sample(&sample, total - (position + 1));

                    ::tracing::info!(
                        index = item.index,
                        bytes = sample.bytes,
                        speed = state.instant_speed_mbps,
                        "item downloaded"
                    );

                    self.emit(ProgressEvent::new(item.index, state)).await?;
                    self.log(
                        DiagnosticLevel::Info,
                        format!("Downloaded '{}' at {:.2} MB/s", filename, state.instant_speed_mbps),
                    )
                    .await?;

                    if item.index == 0 {
                        self.emit(PlaybackReadyEvent::new(persisted.path)).await?;
                    }
                },

                Err(source) => {
                    let error = DownloadError::ItemFetch {
                        index: item.index,
                        title: item.title.clone(),
                        source,
                    };

                    ::tracing::warn!(index = item.index, error = %error, "item skipped");
                    self.report(&error).await?;
                },
            }
        }

        Ok(JobOutcome::Completed { folder: folder.clone() })
    }

    async fn drive(
        &self, control: &::std::sync::Arc<JobControl>, playlist: &Playlist, folder: &MaybeOwnedPath, title: &str,
    ) -> Fallible<JobOutcome> {
        ::std::sync::Arc::clone(&self.output_boundary).activate().await?;

        self.emit(StartedEvent::new(playlist.title.clone(), playlist.items.len())).await?;
        self.log(DiagnosticLevel::Info, format!("Starting download for playlist: '{}'", title)).await?;
        self.notify(DiagnosticLevel::Info, "Downloading", format!("Downloading playlist: '{}'", title)).await?;

        let outcome = self.run(control, playlist, folder).await?;

        self.finish(control, title, outcome).await
    }

    async fn finish(
        &self, control: &::std::sync::Arc<JobControl>, title: &str, outcome: JobOutcome,
    ) -> Fallible<JobOutcome> {
        match &outcome {
            JobOutcome::Completed { folder } => {
                ::tracing::info!(%title, "download completed");

                self.cursor.reset();
                self.transition(control, JobState::Completed).await;

                self.log(DiagnosticLevel::Info, "Download completed successfully.").await?;
                self.notify(
                    DiagnosticLevel::Info,
                    "Success",
                    format!("Download complete!\nFiles saved to '{}'.", folder.display()),
                )
                .await?;
                self.emit(TerminalEvent::new(TerminalKind::Completed, folder.display().to_string().into())).await?;
            },

            JobOutcome::Canceled => {
                ::tracing::info!(%title, "download canceled");

                self.transition(control, JobState::Canceled).await;
                self.emit(TerminalEvent::new(TerminalKind::Canceled, "Download canceled.".into())).await?;
            },
        }

        Ok(outcome)
    }
}

#[async_trait]
impl Accept<StartDownloadRequestModel> for DownloadPlaylistInteractor {
    type Outcome = JobOutcome;

    async fn accept(self: ::std::sync::Arc<Self>, request: StartDownloadRequestModel) -> Fallible<JobOutcome> {
        let control = ::std::sync::Arc::new(JobControl::new());

        let previous = ::std::mem::replace(&mut *self.control.lock().await, ::std::sync::Arc::clone(&control));
        previous.cancel();

        self.cursor.reset();

        let _running = self.running.lock().await;

        if control.is_canceled() {
            ::tracing::debug!(url = %request.url, "download replaced before it started");
            return Ok(JobOutcome::Canceled);
        }

        let url = match Self::validate(&request) {
            Ok(url) => url,
            Err(error) => {
                ::tracing::warn!(url = %request.url, folder = %request.folder.display(), "rejected download request");

                self.transition(&control, JobState::Idle).await;
                self.report(&error).await?;

                return Err(error.into());
            },
        };

        self.transition(&control, JobState::Validating).await;

        let playlist = match ::std::sync::Arc::clone(&self.media_source).fetch_item_list(url.clone()).await {
            Ok(playlist) => playlist,
            Err(source) => {
                let error = DownloadError::PlaylistFetch(source);

                ::tracing::error!(%url, error = %error, "playlist enumeration failed");

                self.transition(&control, JobState::Failed).await;
                self.report(&error).await?;
                self.emit(TerminalEvent::new(TerminalKind::Failed, error.to_string().into())).await?;
                self.transition(&control, JobState::Idle).await;

                return Err(error.into());
            },
        };

        let title = playlist.title.as_deref().unwrap_or(playlist.url.list_id()).to_owned();
        let total = playlist.items.len();

        ::tracing::info!(%url, %title, total, folder = %request.folder.display(), "download started");

        self.transition(&control, JobState::Running).await;

        let outcome = self.drive(&control, &playlist, &request.folder, &title).await;

        if let Err(error) = &outcome {
            ::tracing::error!(%title, error = %error, "download aborted");
            self.transition(&control, JobState::Failed).await;
        }

        ::std::sync::Arc::clone(&self.output_boundary).deactivate().await?;

        outcome
    }
}

#[async_trait]
impl Accept<TogglePauseRequestModel> for DownloadPlaylistInteractor {
    /// Whether the job is paused afterwards.
    type Outcome = bool;

    async fn accept(self: ::std::sync::Arc<Self>, _: TogglePauseRequestModel) -> Fallible<bool> {
        let paused = self.control.lock().await.toggle_pause();

        ::tracing::info!(paused, "pause toggled");

        let state = if paused { "Paused" } else { "Resumed" };
        self.log(DiagnosticLevel::Info, format!("Download {}.", state)).await?;

        Ok(paused)
    }
}

#[async_trait]
impl Accept<CancelDownloadRequestModel> for DownloadPlaylistInteractor {
    type Outcome = ();

    async fn accept(self: ::std::sync::Arc<Self>, _: CancelDownloadRequestModel) -> Fallible<()> {
        self.control.lock().await.cancel();
        self.cursor.reset();

        ::tracing::info!("cancel requested");

        self.log(DiagnosticLevel::Info, "Download canceled.").await?;
        self.notify(DiagnosticLevel::Info, "Canceled", "Download canceled!").await
    }
}

/// Hands the files under the cursor to the media player.
#[derive(::bon::Builder)]
pub struct PlaybackInteractor {
    output_boundary: ::std::sync::Arc<dyn PlaybackOutputBoundary>,
    cursor: ::std::sync::Arc<PlaybackCursor>,
    player: ::std::sync::Arc<dyn MediaPlayer>,
}

impl PlaybackInteractor {
    async fn emit<Event>(&self, event: Event) -> Fallible<()>
    where
        dyn PlaybackOutputBoundary: Update<Event>,
        Event: ::core::marker::Send + ::core::marker::Sync,
    {
        Update::<Event>::update(::std::sync::Arc::clone(&self.output_boundary), &event).await
    }

    async fn report(&self, message: String) -> Fallible<()> {
        self.emit(LogEvent::new(DiagnosticLevel::Error, message.clone().into())).await?;
        self.emit(NotificationEvent::new(DiagnosticLevel::Error, "Error".into(), message.into())).await
    }

    async fn play(&self, resolved: Result<::std::path::PathBuf, PlaybackError>) -> Fallible<::std::path::PathBuf> {
        let path = match resolved {
            Ok(path) => path,
            Err(error) => {
                ::tracing::warn!(index = self.cursor.current(), error = %error, "nothing to play");

                self.report(error.to_string()).await?;

                return Err(error.into());
            },
        };

        if let Err(error) = ::std::sync::Arc::clone(&self.player).play(path.clone().into()).await {
            ::tracing::error!(path = %path.display(), error = %error, "player failed to start");

            self.report(format!("Cannot play '{}': {:#}", path.display(), error)).await?;

            return Err(error);
        }

        ::tracing::info!(index = self.cursor.current(), path = %path.display(), "playback started");

        self.emit(PlaybackStartedEvent::new(self.cursor.current(), path.clone().into())).await?;

        Ok(path)
    }
}

#[async_trait]
impl Accept<PlayFirstRequestModel> for PlaybackInteractor {
    type Outcome = ::std::path::PathBuf;

    async fn accept(self: ::std::sync::Arc<Self>, request: PlayFirstRequestModel) -> Fallible<::std::path::PathBuf> {
        let resolved = self.cursor.play_first(&request.folder).await;

        self.play(resolved).await
    }
}

#[async_trait]
impl Accept<PlayNextRequestModel> for PlaybackInteractor {
    type Outcome = ::std::path::PathBuf;

    async fn accept(self: ::std::sync::Arc<Self>, request: PlayNextRequestModel) -> Fallible<::std::path::PathBuf> {
        let resolved = self.cursor.play_next(&request.folder).await;

        self.play(resolved).await
    }
}
