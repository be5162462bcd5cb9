use ::async_trait::async_trait;
use ::domain::ItemHandle;
use ::domain::Playlist;
use ::domain::PlaylistUrl;

use crate::models::descriptors::PersistedItem;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;

/// Where playlists and their media streams come from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Items come back in playlist order, indexed from zero.
    async fn fetch_item_list(self: ::std::sync::Arc<Self>, url: PlaylistUrl) -> Fallible<Playlist>;

    /// Blocks until the item is fully written to `folder/filename` or failed.
    async fn fetch_and_persist(
        self: ::std::sync::Arc<Self>, handle: ItemHandle, folder: MaybeOwnedPath, filename: MaybeOwnedString,
    ) -> Fallible<PersistedItem>;
}

#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Names of the entries directly inside `folder`, in no particular order.
    async fn list(self: ::std::sync::Arc<Self>, folder: MaybeOwnedPath) -> Fallible<Vec<MaybeOwnedString>>;
}

#[async_trait]
pub trait MediaPlayer: Send + Sync {
    async fn play(self: ::std::sync::Arc<Self>, path: MaybeOwnedPath) -> Fallible<()>;
}
