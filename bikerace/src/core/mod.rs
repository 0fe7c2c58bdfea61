pub mod competitor;
pub mod controller;
pub mod listing;
pub mod race;
pub mod scheduler;
pub mod sequence;
pub mod social;
pub mod track;
