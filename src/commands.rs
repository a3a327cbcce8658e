//! CLI command definitions
//!
//! Defines the clap commands for the scenario harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::bridge::SuiteProfile;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every scenario file in a directory
    Run {
        /// Directory containing scenario files
        dir: PathBuf,

        /// Only run test cases whose name contains this pattern
        #[arg(long, short)]
        filter: Option<String>,

        /// Host for scenarios that use relative URLs
        #[arg(long)]
        host: Option<String>,

        /// Port for scenarios that use relative URLs
        #[arg(long)]
        port: Option<u16>,

        /// Environment value for $ENVIRON (KEY=VALUE)
        /// Can be specified multiple times: --env USER_TOKEN=abc --env AODH_THRESHOLD=10
        #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Expose process environment variables to scenarios
        #[arg(long)]
        inherit_env: bool,

        /// Prepare the environment for a telemetry suite
        #[arg(long, value_enum, requires = "catalog")]
        profile: Option<SuiteProfile>,

        /// JSON file with tokens, service catalogs and resource ids
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// List the test cases a directory registers
    #[command(alias = "ls")]
    List {
        /// Directory containing scenario files
        dir: PathBuf,
    },

    /// Parse and compile a scenario file without running it
    Check {
        /// Path to the scenario file
        path: PathBuf,
    },

    /// Print the effective configuration
    Config,
}
