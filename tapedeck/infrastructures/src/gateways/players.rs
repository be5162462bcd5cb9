use ::async_trait::async_trait;
use ::use_cases::gateways::MediaPlayer;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;

/// Hands a file to whatever the desktop associates with it.
#[derive(::bon::Builder)]
pub struct SystemMediaPlayer {
    /// Replaces the platform opener, e.g. `mpv` or `vlc`.
    #[builder(into)]
    program: Option<::std::ffi::OsString>,
}

impl SystemMediaPlayer {
    fn expression(&self, path: &::std::path::Path) -> ::duct::Expression {
        if let Some(program) = &self.program {
            return ::duct::cmd(program.clone(), [path.as_os_str()]);
        }

        #[cfg(target_os = "windows")]
        let expression = ::duct::cmd("cmd", [
            ::std::ffi::OsStr::new("/C"),
            ::std::ffi::OsStr::new("start"),
            ::std::ffi::OsStr::new(""),
            path.as_os_str(),
        ]);

        #[cfg(target_os = "macos")]
        let expression = ::duct::cmd("open", [path.as_os_str()]);

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let expression = ::duct::cmd("xdg-open", [path.as_os_str()]);

        expression
    }
}

#[async_trait]
impl MediaPlayer for SystemMediaPlayer {
    /// Returns as soon as the player is launched. The process is reaped on its
    /// own thread and a failing exit only shows up in the logs.
    async fn play(self: ::std::sync::Arc<Self>, path: MaybeOwnedPath) -> Fallible<()> {
        if !::tokio::fs::try_exists(&path).await? {
            ::anyhow::bail!("'{}' does not exist", path.display());
        }

        ::tracing::debug!(path = %path.display(), "opening media");

        let handle = self
            .expression(&path)
            .stdout_null()
            .stderr_capture()
            .unchecked()
            .start()?;

        ::std::thread::Builder::new()
            .name("media-player".into())
            .spawn(move || match handle.wait() {
                Ok(output) if output.status.success() => ::tracing::debug!("media player exited"),
                Ok(output) => ::tracing::warn!(
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "media player failed"
                ),
                Err(error) => ::tracing::warn!(error = %error, "media player vanished"),
            })?;

        Ok(())
    }
}
