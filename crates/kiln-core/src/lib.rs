#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod env;
pub mod error;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod plugins;
pub mod profile;
pub mod rules;
pub mod style;
pub mod testconf;
pub mod version;

pub use config::Config;
pub use env::BuildEnv;
pub use error::Error;
pub use paths::ProjectPaths;
pub use pipeline::{BuildArtifacts, BuildError, OutputFile, Pipeline};
pub use profile::{BuildProfile, Mode};
pub use version::VERSION;
