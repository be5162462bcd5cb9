use ::async_trait::async_trait;

use crate::models::events::LogEvent;
use crate::models::events::NotificationEvent;
use crate::models::events::PlaybackReadyEvent;
use crate::models::events::PlaybackStartedEvent;
use crate::models::events::ProgressEvent;
use crate::models::events::StartedEvent;
use crate::models::events::TerminalEvent;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;

#[async_trait]
pub trait Accept<Request>: Send + Sync {
    type Outcome: Send;

    async fn accept(self: ::std::sync::Arc<Self>, request: Request) -> Fallible<Self::Outcome>;
}

#[async_trait]
pub trait Update<Event>: Send + Sync {
    async fn update(self: ::std::sync::Arc<Self>, event: &Event) -> Fallible<()>;
}

#[async_trait]
pub trait Activate: Send + Sync {
    async fn activate(self: ::std::sync::Arc<Self>) -> Fallible<()>;
    async fn deactivate(self: ::std::sync::Arc<Self>) -> Fallible<()>;
}

pub trait DownloadPlaylistOutputBoundary:
    Activate
    + Update<StartedEvent>
    + Update<ProgressEvent>
    + Update<LogEvent>
    + Update<NotificationEvent>
    + Update<TerminalEvent>
    + Update<PlaybackReadyEvent>
{
}

impl<View> DownloadPlaylistOutputBoundary for View where
    View: Activate
        + Update<StartedEvent>
        + Update<ProgressEvent>
        + Update<LogEvent>
        + Update<NotificationEvent>
        + Update<TerminalEvent>
        + Update<PlaybackReadyEvent>
{
}

pub trait PlaybackOutputBoundary: Update<LogEvent> + Update<NotificationEvent> + Update<PlaybackStartedEvent> {}

impl<View> PlaybackOutputBoundary for View where
    View: Update<LogEvent> + Update<NotificationEvent> + Update<PlaybackStartedEvent>
{
}

#[derive(Debug, Clone, ::bon::Builder)]
#[builder(on(_, into))]
pub struct StartDownloadRequestModel {
    pub url: MaybeOwnedString,
    pub folder: MaybeOwnedPath,
}

#[derive(Debug, Clone, Copy)]
pub struct TogglePauseRequestModel;

#[derive(Debug, Clone, Copy)]
pub struct CancelDownloadRequestModel;

#[derive(Debug, Clone, ::bon::Builder)]
#[builder(on(_, into))]
pub struct PlayFirstRequestModel {
    pub folder: MaybeOwnedPath,
}

#[derive(Debug, Clone, ::bon::Builder)]
#[builder(on(_, into))]
pub struct PlayNextRequestModel {
    pub folder: MaybeOwnedPath,
}
