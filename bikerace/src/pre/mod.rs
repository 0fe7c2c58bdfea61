pub mod read_catalog;
pub mod sim_opts;
