pub mod events {
    use crate::models::descriptors::ProgressState;
    use crate::utils::aliases::MaybeOwnedPath;
    use crate::utils::aliases::MaybeOwnedString;

    /// The playlist was enumerated and the job is about to run.
    #[derive(Debug, Clone, PartialEq, Eq, ::derive_new::new)]
    pub struct StartedEvent {
        pub title: Option<MaybeOwnedString>,
        pub total: usize,
    }

    /// One item finished; emitted in strictly increasing index order.
    #[derive(Debug, Clone, PartialEq, ::derive_new::new)]
    pub struct ProgressEvent {
        pub completed_index: usize,
        pub state: ProgressState,
    }

    #[derive(Debug, Clone, PartialEq, Eq, ::derive_new::new)]
    pub struct LogEvent {
        pub level: DiagnosticLevel,
        pub text: MaybeOwnedString,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DiagnosticLevel {
        Info,
        Warning,
        Error,
    }

    /// Something the user must acknowledge, the console equivalent of a dialog box.
    #[derive(Debug, Clone, PartialEq, Eq, ::derive_new::new)]
    pub struct NotificationEvent {
        pub level: DiagnosticLevel,
        pub title: MaybeOwnedString,
        pub message: MaybeOwnedString,
    }

    #[derive(Debug, Clone, PartialEq, Eq, ::derive_new::new)]
    pub struct TerminalEvent {
        pub kind: TerminalKind,
        pub detail: MaybeOwnedString,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TerminalKind {
        Completed,
        Canceled,
        Failed,
    }

    /// The first item of the playlist landed on disk.
    #[derive(Debug, Clone, PartialEq, Eq, ::derive_new::new)]
    pub struct PlaybackReadyEvent {
        pub path: MaybeOwnedPath,
    }

    #[derive(Debug, Clone, PartialEq, Eq, ::derive_new::new)]
    pub struct PlaybackStartedEvent {
        pub index: usize,
        pub path: MaybeOwnedPath,
    }
}

pub mod descriptors {
    use crate::utils::aliases::MaybeOwnedPath;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum JobState {
        Idle,
        Validating,
        Running,
        Completed,
        Canceled,
        Failed,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum JobOutcome {
        Completed { folder: MaybeOwnedPath },
        Canceled,
    }

    /// Measured right after one item is persisted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DownloadSample {
        pub index: usize,
        pub bytes: u64,
        pub duration: ::std::time::Duration,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct ProgressState {
        pub completed_count: usize,
        pub total_count: usize,
        pub instant_speed_mbps: f64,
        pub average_speed_mbps: f64,
        pub eta_seconds: f64,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PersistedItem {
        pub bytes_written: u64,
        pub path: MaybeOwnedPath,
    }
}

pub mod errors {
    use crate::utils::aliases::MaybeOwnedPath;
    use crate::utils::aliases::MaybeOwnedString;

    #[derive(Debug, ::thiserror::Error)]
    pub enum DownloadError {
        #[error("Please provide a valid playlist URL and folder: {0}.")]
        InvalidInput(MaybeOwnedString),

        #[error("Failed to process playlist: {0:#}")]
        PlaylistFetch(#[source] ::anyhow::Error),

        #[error("Error downloading '{title}': {source:#}")]
        ItemFetch {
            index: usize,
            title: MaybeOwnedString,
            #[source]
            source: ::anyhow::Error,
        },
    }

    #[derive(Debug, ::thiserror::Error)]
    pub enum PlaybackError {
        #[error("Please select a download folder first.")]
        NoFolderSelected,

        #[error("No more videos to play.")]
        IndexOutOfRange { index: usize, count: usize },

        #[error("Cannot read folder '{}': {source:#}", .folder.display())]
        Unreadable {
            folder: MaybeOwnedPath,
            #[source]
            source: ::anyhow::Error,
        },
    }
}
