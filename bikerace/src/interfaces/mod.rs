pub mod api;
pub mod local_api;
pub mod race_state;
