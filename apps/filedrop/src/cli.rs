//! Command-line parsing.

use std::path::PathBuf;

use anyhow::{bail, Context};

pub const USAGE: &str = "\
usage:
  filedrop [--server <url>] upload <local-file> <remote-path>
  filedrop [--server <url>] download <remote-path> <local-file>
  filedrop --help";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload { local: PathBuf, remote: String },
    Download { remote: String, local: PathBuf },
    Help,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    /// Overrides `server_url` from the configuration file.
    pub server: Option<String>,
    pub command: Command,
}

impl Cli {
    /// Parses arguments, excluding the program name.
    pub fn parse<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut server = None;
        let mut positional = Vec::new();

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => {
                    return Ok(Self {
                        server,
                        command: Command::Help,
                    });
                }
                "-s" | "--server" => {
                    let url = args.next().context("--server requires a URL")?;
                    server = Some(url);
                }
                _ if arg.starts_with("--server=") => {
                    server = Some(arg["--server=".len()..].to_string());
                }
                _ if arg.starts_with('-') && arg.len() > 1 => bail!("unknown option: {arg}"),
                _ => positional.push(arg),
            }
        }

        let command = match positional.as_slice() {
            [] => Command::Help,
            [cmd, local, remote] if cmd == "upload" => Command::Upload {
                local: PathBuf::from(local),
                remote: remote.clone(),
            },
            [cmd, remote, local] if cmd == "download" => Command::Download {
                remote: remote.clone(),
                local: PathBuf::from(local),
            },
            [cmd, ..] if cmd == "upload" || cmd == "download" => {
                bail!("{cmd} takes exactly two arguments")
            }
            [cmd, ..] => bail!("unknown command: {cmd}"),
        };

        Ok(Self { server, command })
    }
}
