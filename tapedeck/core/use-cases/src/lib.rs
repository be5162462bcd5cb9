pub mod boundaries;
pub mod controls;
pub mod gateways;
pub mod interactors;
pub mod models;
pub mod playback;
pub mod progress;
pub mod utils;
