use ::async_trait::async_trait;
use ::use_cases::boundaries::Activate;
use ::use_cases::boundaries::Update;
use ::use_cases::gateways::MediaPlayer;
use ::use_cases::models::events::DiagnosticLevel;
use ::use_cases::models::events::LogEvent;
use ::use_cases::models::events::NotificationEvent;
use ::use_cases::models::events::PlaybackReadyEvent;
use ::use_cases::models::events::PlaybackStartedEvent;
use ::use_cases::models::events::ProgressEvent;
use ::use_cases::models::events::StartedEvent;
use ::use_cases::models::events::TerminalEvent;
use ::use_cases::models::events::TerminalKind;

use crate::utils::aliases::Fallible;

macro_rules! lazy_progress_style {
    ($template:expr) => {
        ::once_cell::sync::Lazy::new(|| {
            ::indicatif::ProgressStyle::with_template($template)
                .unwrap_or_else(|_| ::indicatif::ProgressStyle::default_bar())
                .progress_chars("##-")
        })
    };
}

macro_rules! lazy_color {
    ($color:expr) => {
        ::once_cell::sync::Lazy::new(|| {
            use ::colored::Colorize as _;

            $color
        })
    };
}

static PROGRESS_BAR_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
    lazy_progress_style!("{prefix} {bar:50} {pos}/{len}\n{msg}");

/// Renders a download job and playback feedback on the terminal.
///
/// One bar per job, created on activation. Everything else is printed above
/// it as colored lines.
pub struct ConsoleView {
    progress_bars: ::indicatif::MultiProgress,
    progress_bar: ::tokio::sync::Mutex<Option<::indicatif::ProgressBar>>,
    autoplay: Option<::std::sync::Arc<dyn MediaPlayer>>,
}

impl ConsoleView {
    pub fn new(autoplay: Option<::std::sync::Arc<dyn MediaPlayer>>) -> Self {
        let progress_bars = ::indicatif::MultiProgress::new();
        progress_bars.set_draw_target(::indicatif::ProgressDrawTarget::hidden());

        Self {
            progress_bars,
            progress_bar: ::tokio::sync::Mutex::new(None),
            autoplay,
        }
    }

    /// Prints above the bar, or plainly when no job is shown.
    pub fn println(&self, line: impl ::std::fmt::Display) {
        self.progress_bars.suspend(|| println!("{}", line));
    }
}

#[async_trait]
impl Activate for ConsoleView {
    async fn activate(self: ::std::sync::Arc<Self>) -> Fallible<()> {
        let mut current = self.progress_bar.lock().await;

        if let Some(previous) = current.take() {
            self.progress_bars.remove(&previous);
        }

        let progress_bar = self
            .progress_bars
            .add(::indicatif::ProgressBar::no_length().with_style(PROGRESS_BAR_STYLE.clone()));

        progress_bar.set_prefix(format!("{}", FormattedTitle(None)));
        progress_bar.set_message(format!("{}\n{}", FormattedSpeed::UNINIT, FormattedEta::UNINIT));

        self.progress_bars.set_draw_target(::indicatif::ProgressDrawTarget::stderr());
        progress_bar.tick();

        *current = Some(progress_bar);

        Ok(())
    }

    async fn deactivate(self: ::std::sync::Arc<Self>) -> Fallible<()> {
        self.progress_bars.set_draw_target(::indicatif::ProgressDrawTarget::hidden());

        Ok(())
    }
}

#[async_trait]
impl Update<StartedEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &StartedEvent) -> Fallible<()> {
        let StartedEvent { title, total } = event;

        if let Some(progress_bar) = self.progress_bar.lock().await.as_ref() {
            progress_bar.set_length(*total as u64);
            progress_bar.set_position(0);
            progress_bar.set_prefix(format!("{}", FormattedTitle(title.as_deref())));
        }

        Ok(())
    }
}

#[async_trait]
impl Update<ProgressEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &ProgressEvent) -> Fallible<()> {
        let ProgressEvent { state, .. } = event;

        if let Some(progress_bar) = self.progress_bar.lock().await.as_ref() {
            progress_bar.set_position(state.completed_count as u64);
            progress_bar.set_message(format!(
                "{}\n{}",
                FormattedSpeed(state.instant_speed_mbps, state.average_speed_mbps),
                FormattedEta(state.eta_seconds),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Update<LogEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &LogEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let LogEvent { level, text } = event;

        let text = match level {
            DiagnosticLevel::Info => text.normal(),
            DiagnosticLevel::Warning => text.yellow(),
            DiagnosticLevel::Error => text.red(),
        };

        self.println(text);

        Ok(())
    }
}

#[async_trait]
impl Update<NotificationEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &NotificationEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let NotificationEvent { level, title, message } = event;

        let title = match level {
            DiagnosticLevel::Info => title.green().bold(),
            DiagnosticLevel::Warning => title.yellow().bold(),
            DiagnosticLevel::Error => title.red().bold(),
        };

        for (position, line) in message.lines().enumerate() {
            match position {
                0 => self.println(format!("{} {} {}", *CLAPPER, title, line.white().bold())),
                _ => self.println(format!("   {}", line.white())),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Update<TerminalEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &TerminalEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        static PROGRESS_BAR_FINISH_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
            lazy_progress_style!("{prefix} {bar:50.green} {pos}/{len}\n{msg}");
        static PROGRESS_BAR_ABANDON_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
            lazy_progress_style!("{prefix} {bar:50.yellow} {pos}/{len}\n{msg}");

        let progress_bar = self.progress_bar.lock().await;

        let Some(progress_bar) = progress_bar.as_ref().filter(|progress_bar| !progress_bar.is_finished()) else {
            return Ok(());
        };

        match event.kind {
            TerminalKind::Completed => {
                progress_bar.set_style(PROGRESS_BAR_FINISH_STYLE.clone());
                progress_bar.set_prefix(progress_bar.prefix().green().to_string());
                progress_bar.finish();
            },
            TerminalKind::Canceled => {
                progress_bar.set_style(PROGRESS_BAR_ABANDON_STYLE.clone());
                progress_bar.set_prefix(progress_bar.prefix().color(GRAY).to_string());
                progress_bar.abandon_with_message(event.detail.yellow().to_string());
            },
            TerminalKind::Failed => progress_bar.abandon_with_message(event.detail.red().to_string()),
        }

        Ok(())
    }
}

#[async_trait]
impl Update<PlaybackReadyEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &PlaybackReadyEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let path = event.path.display().to_string();

        let Some(player) = self.autoplay.as_ref() else {
            self.println(format!("First video ready: {} (type {} to watch it)", path.white().bold(), "first".cyan()));
            return Ok(());
        };

        // Autoplay failures never reach the download job.
        if let Err(error) = ::std::sync::Arc::clone(player).play(event.path.clone()).await {
            ::tracing::warn!(%path, error = %error, "autoplay failed");
            self.println(format!("Cannot play '{}': {:#}", path, error).yellow());
        }

        Ok(())
    }
}

#[async_trait]
impl Update<PlaybackStartedEvent> for ConsoleView {
    async fn update(self: ::std::sync::Arc<Self>, event: &PlaybackStartedEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let PlaybackStartedEvent { index, path } = event;

        let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

        self.println(format!("Playing #{}: {}", index + 1, name.white().bold()));

        Ok(())
    }
}

static CLAPPER: ::once_cell::sync::Lazy<::colored::ColoredString> = lazy_color!("🎬".normal());

static NULL: ::once_cell::sync::Lazy<::colored::ColoredString> = lazy_color!("N/A".yellow().bold());

const GRAY: ::colored::Color = ::colored::Color::TrueColor { r: 150, g: 150, b: 150 };

struct FormattedTitle<'a>(Option<&'a str>);

impl ::std::fmt::Display for FormattedTitle<'_> {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        use ::colored::Colorize as _;

        match self.0 {
            Some(title) => write!(formatter, "{:<24}", title.white().bold()),
            None => write!(formatter, "{:<24}", *NULL),
        }
    }
}

struct FormattedSpeed(f64, f64);

impl FormattedSpeed {
    const UNINIT: Self = Self(0.0, 0.0);
}

impl ::std::fmt::Display for FormattedSpeed {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "Speed: {:.2} MB/s (instant), {:.2} MB/s (avg)", self.0, self.1)
    }
}

struct FormattedEta(f64);

impl FormattedEta {
    const UNINIT: Self = Self(0.0);
}

impl ::std::fmt::Display for FormattedEta {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        let eta = ::std::time::Duration::try_from_secs_f64(self.0).unwrap_or_default();

        write!(formatter, "Estimated Time Left: {:.1} sec ({})", self.0, FormattedDuration(eta))
    }
}

struct FormattedDuration(::std::time::Duration);

impl ::std::fmt::Display for FormattedDuration {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        let duration = ::time::Duration::try_from(self.0).unwrap_or(::time::Duration::MAX);

        let hours = duration.whole_hours();
        let minutes = duration.whole_minutes() % 60;
        let seconds = duration.whole_seconds() % 60;

        write!(formatter, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_speed_and_eta_like_the_status_labels() {
        assert_eq!(FormattedSpeed(5.0, 2.5).to_string(), "Speed: 5.00 MB/s (instant), 2.50 MB/s (avg)");
        assert_eq!(FormattedEta(6.0).to_string(), "Estimated Time Left: 6.0 sec (00:00:06)");
        assert_eq!(FormattedEta(3725.0).to_string(), "Estimated Time Left: 3725.0 sec (01:02:05)");
    }

    #[test]
    fn survives_non_finite_eta() {
        assert!(FormattedEta(f64::INFINITY).to_string().ends_with("(00:00:00)"));
        assert!(FormattedEta(-1.0).to_string().ends_with("(00:00:00)"));
    }

    #[tokio::test]
    async fn updates_without_an_active_job_are_harmless() {
        let view = ::std::sync::Arc::new(ConsoleView::new(None));

        let state = ::use_cases::models::descriptors::ProgressState::default();

        assert!(::std::sync::Arc::clone(&view).update(&ProgressEvent::new(0, state)).await.is_ok());
        assert!(::std::sync::Arc::clone(&view)
            .update(&TerminalEvent::new(TerminalKind::Failed, "unreachable".into()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn each_activation_gets_a_fresh_bar() {
        let view = ::std::sync::Arc::new(ConsoleView::new(None));

        ::std::sync::Arc::clone(&view).activate().await.unwrap();
        ::std::sync::Arc::clone(&view).update(&StartedEvent::new(None, 4)).await.unwrap();
        assert_eq!(view.progress_bar.lock().await.as_ref().and_then(|bar| bar.length()), Some(4));

        ::std::sync::Arc::clone(&view)
            .update(&TerminalEvent::new(TerminalKind::Completed, "/tmp".into()))
            .await
            .unwrap();
        ::std::sync::Arc::clone(&view).deactivate().await.unwrap();
        assert!(view.progress_bar.lock().await.as_ref().is_some_and(|bar| bar.is_finished()));

        ::std::sync::Arc::clone(&view).activate().await.unwrap();
        assert_eq!(view.progress_bar.lock().await.as_ref().map(|bar| bar.position()), Some(0));
    }
}
