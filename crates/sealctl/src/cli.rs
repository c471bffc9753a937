//! Command-line surface.

use clap::{Parser, Subcommand};

/// sealctl - seal and open OAuth token bundles at rest
///
/// Passphrases are read from SEALCTL_PASSPHRASE and SEALCTL_NEW_PASSPHRASE.
/// Input is read from stdin; results are written to stdout.
#[derive(Debug, Parser)]
#[command(name = "sealctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the configured passphrase against the strength policy
    Check,

    /// Seal a token-bundle JSON object read from stdin
    Seal {
        /// Key version to seal under (defaults to the current version)
        #[arg(long, value_name = "N")]
        key_version: Option<u32>,

        /// Emit the compact `ts1.` form instead of JSON
        #[arg(long)]
        compact: bool,
    },

    /// Open an envelope (JSON or compact) read from stdin
    Open,

    /// Show envelope metadata without decrypting
    Inspect,

    /// Re-encrypt an envelope under the current key version
    Reseal {
        /// Emit the compact `ts1.` form instead of JSON
        #[arg(long)]
        compact: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_seal_flags() {
        let cli = Cli::try_parse_from(["sealctl", "seal", "--key-version", "1", "--compact"]).unwrap();
        match cli.command {
            Command::Seal {
                key_version,
                compact,
            } => {
                assert_eq!(key_version, Some(1));
                assert!(compact);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["sealctl"]).is_err());
    }
}
