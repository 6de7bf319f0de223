//! Domain types shared by the dataset, the search pipeline and the CLI.

pub mod types;
