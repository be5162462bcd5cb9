pub mod aliases {
    pub type Fallible<T> = ::anyhow::Result<T>;

    pub type MaybeOwnedPath = ::std::borrow::Cow<'static, ::std::path::Path>;
}

pub mod extensions {
    use crate::utils::aliases::Fallible;

    pub trait OptionExt<T> {
        fn ok(self) -> Fallible<T>;
    }

    impl<T> OptionExt<T> for Option<T> {
        #[track_caller]
        fn ok(self) -> Fallible<T> {
            let location = ::std::panic::Location::caller();

            self.ok_or_else(|| {
                ::anyhow::anyhow!("missing value at {}:{}:{}", location.file(), location.line(), location.column())
            })
        }
    }
}
