use ::domain::PLAYABLE_EXTENSION;

use crate::gateways::MediaLibrary;
use crate::models::errors::PlaybackError;

/// Position within the sorted playable files of a folder.
///
/// The folder is listed again on every resolution, so files appearing or
/// disappearing between calls are simply reflected.
pub struct PlaybackCursor {
    library: ::std::sync::Arc<dyn MediaLibrary>,
    index: ::std::sync::atomic::AtomicUsize,
}

impl PlaybackCursor {
    pub fn new(library: ::std::sync::Arc<dyn MediaLibrary>) -> Self {
        Self {
            library,
            index: ::std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> usize {
        self.index.load(::std::sync::atomic::Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.index.store(0, ::std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn play_first(&self, folder: &::std::path::Path) -> Result<::std::path::PathBuf, PlaybackError> {
        self.reset();

        self.resolve(folder, 0).await
    }

    /// Advances even when the result is out of range.
    pub async fn play_next(&self, folder: &::std::path::Path) -> Result<::std::path::PathBuf, PlaybackError> {
        let index = self.index.fetch_add(1, ::std::sync::atomic::Ordering::SeqCst) + 1;

        self.resolve(folder, index).await
    }

    pub async fn resolve(
        &self, folder: &::std::path::Path, index: usize,
    ) -> Result<::std::path::PathBuf, PlaybackError> {
        if folder.as_os_str().is_empty() {
            return Err(PlaybackError::NoFolderSelected);
        }

        let mut names = ::std::sync::Arc::clone(&self.library)
            .list(folder.to_path_buf().into())
            .await
            .map_err(|source| PlaybackError::Unreadable { folder: folder.to_path_buf().into(), source })?
            .into_iter()
            .filter(|name| name.ends_with(PLAYABLE_EXTENSION))
            .collect::<Vec<_>>();

        names.sort();

        let count = names.len();

        names
            .get(index)
            .map(|name| folder.join(&**name))
            .ok_or(PlaybackError::IndexOutOfRange { index, count })
    }
}
