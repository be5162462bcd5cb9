pub(crate) mod utils;

pub mod boundaries;

pub mod gateways {
    pub mod libraries;
    pub mod media_sources;
    pub mod players;
}
