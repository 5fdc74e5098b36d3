//! Command-line interface handling for the server list tool.
//!
//! This module provides command-line argument parsing using the `clap`
//! builder API.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Parameters of a simulated status ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArgs {
    /// Player name to associate with the address before pinging
    pub player: Option<String>,
    pub address: IpAddr,
    pub protocol: i32,
    pub online: u32,
    pub max: u32,
    /// Virtual host the client connected through
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Render the status response a client would receive
    Preview(PreviewArgs),
    /// List loaded profiles in evaluation order
    Profiles,
    /// Validate configuration and profiles
    Check,
}

/// Command line arguments parsed from user input.
///
/// Global options override the matching configuration file settings.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the profiles directory
    pub profiles_dir: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    pub command: CliCommand,
}

impl CliArgs {
    /// Builds the clap command definition.
    pub fn command() -> Command {
        Command::new("serverlist")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Preview and validate server list ping profiles")
            .subcommand_required(true)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("serverlist.toml")
                    .global(true),
            )
            .arg(
                Arg::new("profiles")
                    .short('p')
                    .long("profiles")
                    .value_name("DIR")
                    .help("Profiles directory path")
                    .global(true),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)")
                    .global(true),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue)
                    .global(true),
            )
            .subcommand(
                Command::new("preview")
                    .about("Render the status response for a simulated ping")
                    .arg(
                        Arg::new("player")
                            .long("player")
                            .value_name("NAME")
                            .help("Player name known for the pinging address"),
                    )
                    .arg(
                        Arg::new("address")
                            .long("address")
                            .value_name("IP")
                            .value_parser(value_parser!(IpAddr))
                            .default_value("127.0.0.1"),
                    )
                    .arg(
                        Arg::new("protocol")
                            .long("protocol")
                            .value_name("VERSION")
                            .value_parser(value_parser!(i32))
                            .default_value("763"),
                    )
                    .arg(
                        Arg::new("online")
                            .long("online")
                            .value_name("COUNT")
                            .value_parser(value_parser!(u32))
                            .default_value("0"),
                    )
                    .arg(
                        Arg::new("max")
                            .long("max")
                            .value_name("COUNT")
                            .value_parser(value_parser!(u32))
                            .default_value("20"),
                    )
                    .arg(
                        Arg::new("host")
                            .long("host")
                            .value_name("HOST")
                            .help("Virtual host sent in the handshake"),
                    ),
            )
            .subcommand(Command::new("profiles").about("List profiles in evaluation order"))
            .subcommand(Command::new("check").about("Validate configuration and profiles"))
    }

    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        let command = match matches.subcommand() {
            Some(("preview", preview)) => CliCommand::Preview(PreviewArgs {
                player: preview.get_one::<String>("player").cloned(),
                address: preview
                    .get_one::<IpAddr>("address")
                    .copied()
                    .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                protocol: preview.get_one::<i32>("protocol").copied().unwrap_or_default(),
                online: preview.get_one::<u32>("online").copied().unwrap_or_default(),
                max: preview.get_one::<u32>("max").copied().unwrap_or_default(),
                host: preview.get_one::<String>("host").cloned(),
            }),
            Some(("profiles", _)) => CliCommand::Profiles,
            _ => CliCommand::Check,
        };

        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("serverlist.toml")),
            profiles_dir: matches.get_one::<String>("profiles").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let matches = CliArgs::command().try_get_matches_from(args).unwrap();
        CliArgs::from_matches(&matches)
    }

    #[test]
    fn test_preview_defaults() {
        let args = parse(&["serverlist", "preview"]);
        assert_eq!(args.config_path, PathBuf::from("serverlist.toml"));
        assert!(args.profiles_dir.is_none());
        assert!(!args.json_logs);
        assert_eq!(
            args.command,
            CliCommand::Preview(PreviewArgs {
                player: None,
                address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                protocol: 763,
                online: 0,
                max: 20,
                host: None,
            })
        );
    }

    #[test]
    fn test_preview_with_values_and_global_flags() {
        let args = parse(&[
            "serverlist",
            "preview",
            "--player",
            "Steve",
            "--address",
            "10.0.0.7",
            "--online",
            "5",
            "--max",
            "8",
            "--host",
            "play.example.net",
            "--config",
            "custom.toml",
            "--json-logs",
        ]);
        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert!(args.json_logs);
        match args.command {
            CliCommand::Preview(preview) => {
                assert_eq!(preview.player.as_deref(), Some("Steve"));
                assert_eq!(preview.address, "10.0.0.7".parse::<IpAddr>().unwrap());
                assert_eq!((preview.online, preview.max), (5, 8));
                assert_eq!(preview.host.as_deref(), Some("play.example.net"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_other_subcommands() {
        let args = parse(&["serverlist", "-p", "/srv/profiles", "profiles"]);
        assert_eq!(args.command, CliCommand::Profiles);
        assert_eq!(args.profiles_dir, Some(PathBuf::from("/srv/profiles")));

        let args = parse(&["serverlist", "check", "--log-level", "debug"]);
        assert_eq!(args.command, CliCommand::Check);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        assert!(CliArgs::command().try_get_matches_from(["serverlist"]).is_err());
        assert!(CliArgs::command()
            .try_get_matches_from(["serverlist", "preview", "--online", "many"])
            .is_err());
    }
}
