pub(crate) mod utils;

use crate::utils::aliases::MaybeOwnedString;

/// Extension of every file the downloader writes and the player picks up.
pub const PLAYABLE_EXTENSION: &str = ".mp4";

/// Longest title fragment kept in a persisted filename.
pub const MAX_TITLE_LENGTH: usize = 40;

/// Width of the zero-padded index prefix. Sorting breaks past 999 items.
pub const INDEX_WIDTH: usize = 3;

static PLAYLIST_URL_PATTERN: ::once_cell::sync::Lazy<::regex::Regex> = ::once_cell::sync::Lazy::new(|| {
    ::regex::Regex::new(r"^(https?://)?(www\.|m\.)?(youtube\.com|youtu\.be)/(playlist\?list=|watch\?.*?&list=)([a-zA-Z0-9_-]+)$")
        .unwrap()
});

/// A playlist URL accepted by [`PlaylistUrl::is_valid`]. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaylistUrl(MaybeOwnedString);

#[derive(Debug, Clone, PartialEq, Eq, ::thiserror::Error)]
#[error("not a playlist url: {0:?}")]
pub struct InvalidPlaylistUrl(pub MaybeOwnedString);

impl PlaylistUrl {
    /// Whole-string match against the youtube playlist grammar. Never touches the network.
    pub fn is_valid(url: &str) -> bool {
        PLAYLIST_URL_PATTERN.is_match(url)
    }

    pub fn parse<Url>(url: Url) -> Result<Self, InvalidPlaylistUrl>
    where
        Url: Into<MaybeOwnedString>,
    {
        let url = url.into();

        match Self::is_valid(&url) {
            true => Ok(Self(url)),
            false => Err(InvalidPlaylistUrl(url)),
        }
    }

    /// The `list=` identifier.
    pub fn list_id(&self) -> &str {
        PLAYLIST_URL_PATTERN
            .captures(&self.0)
            .and_then(|captures| captures.get(5))
            .map_or("", |id| id.as_str())
    }
}

impl ::std::ops::Deref for PlaylistUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ::std::fmt::Display for PlaylistUrl {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Opaque token the media source hands out to fetch one item later.
pub type ItemHandle = MaybeOwnedString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub url: PlaylistUrl,
    pub title: Option<MaybeOwnedString>,
    pub items: Vec<DownloadItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub index: usize,
    pub title: MaybeOwnedString,
    pub handle: ItemHandle,
}

impl DownloadItem {
    /// `007_Some_Title.mp4`: the index prefix makes lexical order equal playlist order.
    pub fn filename(&self) -> String {
        format!(
            "{:0width$}_{}{}",
            self.index,
            sanitize_title(&self.title, MAX_TITLE_LENGTH),
            PLAYABLE_EXTENSION,
            width = INDEX_WIDTH,
        )
    }
}

/// Truncates to `max_length` characters, trims, then maps spaces and
/// filesystem-reserved characters to underscores.
pub fn sanitize_title(title: &str, max_length: usize) -> String {
    let truncated = title.chars().take(max_length).collect::<String>();

    truncated
        .trim()
        .chars()
        .map(|char| match char {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            char if char.is_control() => '_',
            char => char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &[&str] = &[
        "https://www.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG",
        "http://youtube.com/playlist?list=abc",
        "youtube.com/playlist?list=A_b-9",
        "https://m.youtube.com/playlist?list=X",
        "https://youtu.be/playlist?list=X",
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123",
        "www.youtube.com/watch?v=a&t=10&list=PL_9-z",
    ];

    const INVALID: &[&str] = &[
        "",
        "https://www.youtube.com/playlist?list=",
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://www.youtube.com/watch?list=PL123",
        "https://vimeo.com/playlist?list=PL123",
        "ftp://youtube.com/playlist?list=PL123",
        " https://youtube.com/playlist?list=PL123",
        "https://youtube.com/playlist?list=PL123 ",
        "https://youtube.com/playlist?list=PL123&index=2",
        "https://youtube.com/playlist?list=PL!23",
        "https://music.youtube.com/playlist?list=PL123",
        "prefix https://youtube.com/playlist?list=PL123",
    ];

    #[test]
    fn url_pattern_compiles() {
        ::once_cell::sync::Lazy::force(&PLAYLIST_URL_PATTERN);
    }

    #[test]
    fn accepts_playlist_urls() {
        for url in VALID {
            assert!(PlaylistUrl::is_valid(url), "{url} should be accepted");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for url in INVALID {
            assert!(!PlaylistUrl::is_valid(url), "{url:?} should be rejected");
        }
    }

    #[test]
    fn removing_the_list_parameter_invalidates() {
        for url in VALID {
            let start = url.find("list=").unwrap();
            let stripped = &url[..start];

            assert!(!PlaylistUrl::is_valid(stripped), "{stripped} should be rejected");
        }
    }

    #[test]
    fn parse_keeps_the_url_and_exposes_the_list_id() {
        let url = PlaylistUrl::parse("https://www.youtube.com/watch?v=a&list=PL_9-z").unwrap();

        assert_eq!(&*url, "https://www.youtube.com/watch?v=a&list=PL_9-z");
        assert_eq!(url.list_id(), "PL_9-z");
        assert_eq!(PlaylistUrl::parse("nope"), Err(InvalidPlaylistUrl("nope".into())));
    }

    #[test]
    fn filename_is_padded_and_sanitized() {
        let item = DownloadItem {
            index: 7,
            title: "  Intro to Rust: part 1/2  ".into(),
            handle: "https://youtu.be/x".into(),
        };

        assert_eq!(item.filename(), "007_Intro_to_Rust__part_1_2.mp4");
    }

    #[test]
    fn sanitize_truncates_before_trimming() {
        let title = format!("{}   tail", "a".repeat(38));

        assert_eq!(sanitize_title(&title, MAX_TITLE_LENGTH), "a".repeat(38));
        assert_eq!(sanitize_title("short title", MAX_TITLE_LENGTH), "short_title");
    }

    #[test]
    fn filenames_sort_in_playlist_order() {
        let mut names = [12, 3, 100, 0]
            .into_iter()
            .map(|index| DownloadItem { index, title: "t".into(), handle: "h".into() }.filename())
            .collect::<Vec<_>>();

        names.sort();

        assert_eq!(names, ["000_t.mp4", "003_t.mp4", "012_t.mp4", "100_t.mp4"]);
    }
}
