use ::async_trait::async_trait;
use ::domain::DownloadItem;
use ::domain::ItemHandle;
use ::domain::Playlist;
use ::domain::PlaylistUrl;
use ::futures::prelude::*;
use ::use_cases::gateways::MediaSource;
use ::use_cases::models::descriptors::PersistedItem;
use ::use_cases::models::events::DiagnosticLevel;

use crate::utils::aliases::BoxedStream;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;
use crate::utils::extensions::OptionExt;

/// Progressive streams only, so a single file carries both audio and video.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4][vcodec!=none][acodec!=none]/best[ext=mp4]";

#[derive(::bon::Builder)]
#[builder(on(_, into))]
pub struct YtdlpMediaSource {
    #[builder(default = MaybeOwnedString::Borrowed("yt-dlp"))]
    program: MaybeOwnedString,

    #[builder(default = MaybeOwnedString::Borrowed(DEFAULT_FORMAT))]
    format: MaybeOwnedString,
}

#[async_trait]
impl MediaSource for YtdlpMediaSource {
    async fn fetch_item_list(self: ::std::sync::Arc<Self>, url: PlaylistUrl) -> Fallible<Playlist> {
        #[rustfmt::skip]
        let (stdout, stderr, status) = TokioCommandExecutor::execute(&*self.program, [
            &*url,
            "--color", "no_color",
            "--flat-playlist",
            "--yes-playlist",
            "--print", "playlist:[playlist]%(title)s",
            "--print", "video:[playlist-item]%(id)s;%(url)s;%(title)s",
        ])?;

        let (listing, stderr) = ::tokio::join!(YtdlpListing::from_lines(stdout), stderr.collect::<Vec<_>>().boxed());

        let status = status.await??;
        let listing = listing.unwrap_or_default();
        let diagnostics = YtdlpDiagnostic::from_stderr(&stderr);

        for diagnostic in &diagnostics {
            ::tracing::warn!(%url, level = ?diagnostic.level, message = %diagnostic.message, "yt-dlp diagnostic");
        }

        if listing.items.is_empty() && (!status.success() || YtdlpDiagnostic::any_error(&diagnostics)) {
            ::anyhow::bail!(YtdlpDiagnostic::summarize(&diagnostics, status));
        }

        ::tracing::debug!(%url, items = listing.items.len(), "playlist enumerated");

        Ok(Playlist {
            url,
            title: listing.title,
            items: listing.items,
        })
    }

    async fn fetch_and_persist(
        self: ::std::sync::Arc<Self>, handle: ItemHandle, folder: MaybeOwnedPath, filename: MaybeOwnedString,
    ) -> Fallible<PersistedItem> {
        let template = filename.replace('%', "%%");

        #[rustfmt::skip]
        let (stdout, stderr, status) = TokioCommandExecutor::execute(&*self.program, [
            &*handle,
            "--color", "no_color",
            "--no-playlist",
            "--format", &*self.format,
            "--paths", folder.to_str().ok()?,
            "--output", &*template,
            "--force-overwrites",
            "--print", "after_move:[item-completed]%(filepath)s",
        ])?;

        let (stdout, stderr) = ::tokio::join!(stdout.collect::<Vec<_>>().boxed(), stderr.collect::<Vec<_>>().boxed());

        let status = status.await??;

        if !status.success() {
            ::anyhow::bail!(YtdlpDiagnostic::summarize(&YtdlpDiagnostic::from_stderr(&stderr), status));
        }

        let path = stdout
            .iter()
            .filter_map(|line| line.strip_prefix("[item-completed]"))
            .map(|path| ::std::path::PathBuf::from(path.trim()))
            .last()
            .unwrap_or_else(|| folder.join(&*filename));
        let bytes_written = ::tokio::fs::metadata(&path).await?.len();

        ::tracing::debug!(%handle, path = %path.display(), bytes_written, "item persisted");

        Ok(PersistedItem {
            bytes_written,
            path: path.into(),
        })
    }
}

type CommandOutput = (
    BoxedStream<MaybeOwnedString>,
    BoxedStream<MaybeOwnedString>,
    ::tokio::task::JoinHandle<::std::io::Result<::std::process::ExitStatus>>,
);

trait CommandExecutor {
    fn execute<Program, Args>(program: Program, args: Args) -> Fallible<CommandOutput>
    where
        Program: AsRef<::std::ffi::OsStr>,
        Args: IntoIterator,
        Args::Item: AsRef<::std::ffi::OsStr>;
}

struct TokioCommandExecutor;

impl CommandExecutor for TokioCommandExecutor {
    fn execute<Program, Args>(program: Program, args: Args) -> Fallible<CommandOutput>
    where
        Program: AsRef<::std::ffi::OsStr>,
        Args: IntoIterator,
        Args::Item: AsRef<::std::ffi::OsStr>,
    {
        use ::tokio::io::AsyncBufReadExt as _;

        let (stdout_tx, stdout_rx) = ::tokio::sync::mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = ::tokio::sync::mpsc::unbounded_channel();

        let mut process = ::tokio::process::Command::new(program)
            .args(args)
            .stdin(::std::process::Stdio::null())
            .stdout(::std::process::Stdio::piped())
            .stderr(::std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = process.stdout.take().ok()?;
        let stderr = process.stderr.take().ok()?;

        ::tokio::spawn(async move {
            let lines = ::tokio::io::BufReader::new(stdout).lines();

            ::tokio_stream::wrappers::LinesStream::new(lines)
                .filter_map(|line| async move { line.ok() })
                .map(MaybeOwnedString::Owned)
                .map(Ok)
                .try_for_each(|line| async { stdout_tx.send(line) })
                .await
        });

        ::tokio::spawn(async move {
            let lines = ::tokio::io::BufReader::new(stderr).lines();

            ::tokio_stream::wrappers::LinesStream::new(lines)
                .filter_map(|line| async move { line.ok() })
                .map(MaybeOwnedString::Owned)
                .map(Ok)
                .try_for_each(|line| async { stderr_tx.send(line) })
                .await
        });

        let status = ::tokio::spawn(async move { process.wait().await });

        Ok((
            ::std::boxed::Box::pin(::tokio_stream::wrappers::UnboundedReceiverStream::new(stdout_rx)),
            ::std::boxed::Box::pin(::tokio_stream::wrappers::UnboundedReceiverStream::new(stderr_rx)),
            status,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct YtdlpDiagnostic {
    level: DiagnosticLevel,
    message: MaybeOwnedString,
}

impl YtdlpDiagnostic {
    fn from_stderr(lines: &[MaybeOwnedString]) -> Vec<Self> {
        lines.iter().filter_map(|line| Self::from_line(line)).collect()
    }

    fn any_error(diagnostics: &[Self]) -> bool {
        diagnostics.iter().any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    /// Error lines if there are any, otherwise the exit status.
    fn summarize(diagnostics: &[Self], status: ::std::process::ExitStatus) -> String {
        let errors = diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .map(|diagnostic| &*diagnostic.message)
            .collect::<Vec<_>>();

        match errors.is_empty() {
            true => format!("yt-dlp exited with {}", status),
            false => errors.join("; "),
        }
    }
}

trait FromYtdlpLine: ::core::marker::Send + ::core::marker::Sync {
    fn from_line<Line>(line: Line) -> Option<Self>
    where
        Line: AsRef<str>,
        Self: Sized;
}

impl FromYtdlpLine for YtdlpDiagnostic {
    fn from_line<Line>(line: Line) -> Option<Self>
    where
        Line: AsRef<str>,
        Self: Sized,
    {
        let attrs = line.as_ref().splitn(2, ':');
        let [level, message] = YtdlpAttributes::parse(attrs)?.into();

        Some(Self {
            level: match level.singlevalued()?.as_ref() {
                "WARNING" => DiagnosticLevel::Warning,
                "ERROR" => DiagnosticLevel::Error,
                _ => return None,
            },
            message: message.singlevalued()?,
        })
    }
}

#[derive(Debug, Default)]
struct YtdlpListing {
    title: Option<MaybeOwnedString>,
    items: Vec<DownloadItem>,
}

#[async_trait]
trait FromYtdlpLines: ::core::marker::Send + ::core::marker::Sync {
    async fn from_lines<Lines, Line>(lines: Lines) -> Option<Self>
    where
        Lines: ::futures::Stream<Item = Line> + ::core::marker::Send,
        Line: AsRef<str> + ::core::marker::Send,
        Self: Sized;
}

#[async_trait]
impl FromYtdlpLines for YtdlpListing {
    async fn from_lines<Lines, Line>(lines: Lines) -> Option<Self>
    where
        Lines: ::futures::Stream<Item = Line> + ::core::marker::Send,
        Line: AsRef<str> + ::core::marker::Send,
        Self: Sized,
    {
        let mut listing = Self::default();

        ::futures::pin_mut!(lines);

        while let Some(line) = lines.next().await {
            if let Some(line) = line.as_ref().strip_prefix("[playlist-item]") {
                // Titles may contain the separator, so they are kept whole as the last field.
                let Some(attrs) = YtdlpAttributes::<3>::parse(line.splitn(3, ';')) else {
                    continue;
                };
                let [id, url, title] = attrs.into();

                let Some(id) = id.singlevalued() else {
                    continue;
                };

                listing.items.push(DownloadItem {
                    index: listing.items.len(),
                    title: title.singlevalued().unwrap_or_else(|| id.clone()),
                    handle: url.singlevalued().unwrap_or(id),
                });
            } else if let Some(line) = line.as_ref().strip_prefix("[playlist]") {
                listing.title = YtdlpAttribute(line).singlevalued();
            }
        }

        Some(listing)
    }
}

#[derive(Clone)]
struct YtdlpAttribute<'a>(&'a str);

impl<'a> YtdlpAttribute<'a> {
    fn singlevalued(self) -> Option<MaybeOwnedString> {
        match self.0.trim() {
            "" | "NA" => None,
            attr => Some(attr.to_owned().into()),
        }
    }
}

struct YtdlpAttributes<'a, const N: usize>([YtdlpAttribute<'a>; N]);

impl<'a, const N: usize> From<YtdlpAttributes<'a, N>> for [YtdlpAttribute<'a>; N] {
    fn from(outer: YtdlpAttributes<'a, N>) -> Self {
        outer.0
    }
}

impl<'a, const N: usize> YtdlpAttributes<'a, N> {
    fn parse<Attrs>(attrs: Attrs) -> Option<Self>
    where
        Attrs: Iterator<Item = &'a str>,
    {
        let attrs = attrs
            .map(YtdlpAttribute)
            .collect::<Vec<_>>()
            .try_into()
            .ok()?;

        Some(Self(attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(lines: &[&'static str]) -> impl ::futures::Stream<Item = &'static str> + Send {
        ::futures::stream::iter(lines.to_vec())
    }

    #[tokio::test]
    async fn parses_a_flat_playlist_listing() {
        let listing = YtdlpListing::from_lines(lines(&[
            "[playlist]Road trip",
            "[playlist-item]abc;https://www.youtube.com/watch?v=abc;First; part one",
            "[playlist-item]def;https://www.youtube.com/watch?v=def;NA",
            "[playlist-item]ghi;NA;Third",
            "unrelated output",
        ]))
        .await
        .unwrap();

        assert_eq!(listing.title.as_deref(), Some("Road trip"));
        assert_eq!(listing.items.len(), 3);

        assert_eq!(listing.items[0].index, 0);
        assert_eq!(listing.items[0].title, "First; part one");
        assert_eq!(listing.items[0].handle, "https://www.youtube.com/watch?v=abc");

        assert_eq!(listing.items[1].index, 1);
        assert_eq!(listing.items[1].title, "def");

        assert_eq!(listing.items[2].handle, "ghi");
    }

    #[tokio::test]
    async fn skips_malformed_items_without_shifting_indices() {
        let listing = YtdlpListing::from_lines(lines(&[
            "[playlist-item]only-an-id",
            "[playlist-item]NA;https://example.com;No id",
            "[playlist-item]xyz;https://www.youtube.com/watch?v=xyz;Kept",
        ]))
        .await
        .unwrap();

        assert_eq!(listing.title, None);
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].index, 0);
        assert_eq!(listing.items[0].title, "Kept");
    }

    #[test]
    fn recognizes_warning_and_error_lines() {
        let warning = YtdlpDiagnostic::from_line("WARNING: [youtube] falling back: no formats").unwrap();
        assert_eq!(warning.level, DiagnosticLevel::Warning);
        assert_eq!(warning.message, "[youtube] falling back: no formats");

        let error = YtdlpDiagnostic::from_line("ERROR: [youtube:tab] PL123: This playlist does not exist").unwrap();
        assert_eq!(error.level, DiagnosticLevel::Error);

        assert!(YtdlpDiagnostic::from_line("[download] 42.0% of 10.00MiB").is_none());
        assert!(YtdlpDiagnostic::from_line("DEBUG: noise").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn summarizes_errors_before_the_exit_status() {
        use ::std::os::unix::process::ExitStatusExt as _;

        let status = ::std::process::ExitStatus::from_raw(1 << 8);

        let diagnostics = [
            YtdlpDiagnostic::from_line("WARNING: slow").unwrap(),
            YtdlpDiagnostic::from_line("ERROR: first").unwrap(),
            YtdlpDiagnostic::from_line("ERROR: second").unwrap(),
        ];

        assert!(YtdlpDiagnostic::any_error(&diagnostics));
        assert_eq!(YtdlpDiagnostic::summarize(&diagnostics, status), "first; second");
        assert!(YtdlpDiagnostic::summarize(&diagnostics[..1], status).starts_with("yt-dlp exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn executor_streams_both_outputs_and_the_exit_status() {
        let (stdout, stderr, status) =
            TokioCommandExecutor::execute("sh", ["-c", "echo one; echo two; echo 'ERROR: broken' >&2; exit 3"])
                .unwrap();

        let (stdout, stderr) = ::tokio::join!(stdout.collect::<Vec<_>>(), stderr.collect::<Vec<_>>());

        assert_eq!(stdout, ["one", "two"]);
        assert_eq!(stderr, ["ERROR: broken"]);
        assert_eq!(status.await.unwrap().unwrap().code(), Some(3));
    }

    #[test]
    fn keeps_only_diagnostics_from_captured_stderr() {
        let stderr = [
            MaybeOwnedString::Borrowed("[youtube] PL123: Downloading webpage"),
            MaybeOwnedString::Borrowed("WARNING: slow"),
            MaybeOwnedString::Owned("ERROR: gone".to_owned()),
        ];

        let diagnostics = YtdlpDiagnostic::from_stderr(&stderr);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[1].message, "gone");
    }

    /// Writes an executable shell script standing in for yt-dlp.
    #[cfg(unix)]
    fn fake_ytdlp(folder: &::std::path::Path, body: &str) -> ::std::path::PathBuf {
        use ::std::os::unix::fs::PermissionsExt as _;

        let program = folder.join("fake-yt-dlp");
        ::std::fs::write(&program, format!("#!/bin/sh\n{}\n", body)).unwrap();
        ::std::fs::set_permissions(&program, ::std::fs::Permissions::from_mode(0o755)).unwrap();

        program
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lists_a_playlist_through_the_program() {
        let folder = ::tempfile::tempdir().unwrap();
        let program = fake_ytdlp(
            folder.path(),
            "echo '[playlist]Course'; echo '[playlist-item]a1;https://y/a1;Intro'; echo 'WARNING: slow' >&2",
        );

        let source = ::std::sync::Arc::new(
            YtdlpMediaSource::builder().program(program.to_string_lossy().into_owned()).build(),
        );
        let url = PlaylistUrl::parse("https://www.youtube.com/playlist?list=PL123").unwrap();

        let playlist = source.fetch_item_list(url).await.unwrap();

        assert_eq!(playlist.title.as_deref(), Some("Course"));
        assert_eq!(playlist.items.len(), 1);
        assert_eq!(playlist.items[0].handle, "https://y/a1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn persists_an_item_where_the_program_reports_it() {
        let folder = ::tempfile::tempdir().unwrap();
        let target = folder.path().join("000_Intro.mp4");
        let program = fake_ytdlp(
            folder.path(),
            &format!("printf 'abcd' > '{0}'; echo '[item-completed]{0}'", target.display()),
        );

        let source = ::std::sync::Arc::new(
            YtdlpMediaSource::builder().program(program.to_string_lossy().into_owned()).build(),
        );

        let persisted = source
            .fetch_and_persist("a1".into(), folder.path().to_path_buf().into(), "000_Intro.mp4".into())
            .await
            .unwrap();

        assert_eq!(persisted.bytes_written, 4);
        assert_eq!(&*persisted.path, target.as_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_item_reports_the_error_lines() {
        let folder = ::tempfile::tempdir().unwrap();
        let program = fake_ytdlp(folder.path(), "echo 'ERROR: Video unavailable' >&2; exit 1");

        let source = ::std::sync::Arc::new(
            YtdlpMediaSource::builder().program(program.to_string_lossy().into_owned()).build(),
        );

        let error = source
            .fetch_and_persist("a1".into(), folder.path().to_path_buf().into(), "000_a.mp4".into())
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Video unavailable");
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let source = ::std::sync::Arc::new(
            YtdlpMediaSource::builder().program("tapedeck-no-such-program").build(),
        );

        let url = PlaylistUrl::parse("https://www.youtube.com/playlist?list=PL123").unwrap();

        assert!(source.fetch_item_list(url).await.is_err());
    }
}
