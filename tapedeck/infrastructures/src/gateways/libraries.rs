use ::async_trait::async_trait;
use ::futures::prelude::*;
use ::use_cases::gateways::MediaLibrary;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;

/// Lists a download folder on the local filesystem.
pub struct FilesystemMediaLibrary;

#[async_trait]
impl MediaLibrary for FilesystemMediaLibrary {
    async fn list(self: ::std::sync::Arc<Self>, folder: MaybeOwnedPath) -> Fallible<Vec<MaybeOwnedString>> {
        let entries = ::tokio::fs::read_dir(&folder).await?;

        let names = ::tokio_stream::wrappers::ReadDirStream::new(entries)
            .try_filter_map(|entry| async move {
                let is_file = entry.file_type().await?.is_file();
                let name = entry.file_name().into_string().ok();

                Ok::<_, ::std::io::Error>(name.filter(|_| is_file).map(MaybeOwnedString::Owned))
            })
            .try_collect::<Vec<_>>()
            .await?;

        ::tracing::trace!(folder = %folder.display(), entries = names.len(), "folder listed");

        Ok(names)
    }
}
