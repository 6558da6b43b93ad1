// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

pub fn create_app() -> Command {
  Command::new("arwtool")
    .version(crate_version!())
    .author("Daniel V. <daniel@chaospixel.com>")
    .about("ARWtool - Inspect and decode Sony ARW raw files")
    .subcommand_required(true)
    .arg_required_else_help(true)
    .arg(
      Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .global(true)
        .help("Print more messages"),
    )
    .arg(
      Arg::new("debug")
        .short('d')
        .action(ArgAction::Count)
        .global(true)
        .help("Sets the level of debugging information"),
    )
    .subcommand(
      Command::new("analyze")
        .about("Analyze ARW container structure")
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Format metadata as JSON"))
        .arg(
          Arg::new("yaml")
            .long("yaml")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Format metadata as YAML"),
        )
        .arg(
          Arg::new("dump")
            .long("dump")
            .action(ArgAction::SetTrue)
            .conflicts_with_all(["json", "yaml"])
            .help("Print a plain text dump of all IFDs"),
        )
        .arg(file_arg("FILE", "Input file")),
    )
    .subcommand(
      Command::new("extract")
        .about("Extract embedded JPEG previews")
        .arg(Arg::new("recursive").short('r').long("recursive").action(ArgAction::SetTrue).help("Process input directory recursive"))
        .arg(override_arg())
        .arg(file_arg("INPUT", "Input file or directory"))
        .arg(file_arg("OUTPUT", "Output file or existing directory")),
    )
    .subcommand(
      Command::new("decode")
        .about("Decode raw pixels as PGM")
        .arg(Arg::new("checksum").long("checksum").action(ArgAction::SetTrue).help("Write MD5 checksum of raw pixels to STDOUT"))
        .arg(key_arg())
        .arg(
          Arg::new("width")
            .long("width")
            .value_parser(value_parser!(usize))
            .help("Override the row width in samples"),
        )
        .arg(
          Arg::new("max_chain")
            .long("max-chain")
            .value_parser(value_parser!(usize))
            .help("Maximum number of chained IFDs to read"),
        )
        .arg(override_arg())
        .arg(file_arg("FILE", "Input file"))
        .arg(
          Arg::new("OUTPUT")
            .value_parser(value_parser!(PathBuf))
            .conflicts_with("checksum")
            .help("Output PGM file, STDOUT if omitted"),
        ),
    )
    .subcommand(
      Command::new("decrypt")
        .about("Write the decrypted SR2 sub IFD region")
        .arg(override_arg())
        .arg(file_arg("FILE", "Input file"))
        .arg(file_arg("OUTPUT", "Output file")),
    )
}

fn file_arg(name: &'static str, help: &'static str) -> Arg {
  Arg::new(name).value_parser(value_parser!(PathBuf)).required(true).help(help)
}

fn override_arg() -> Arg {
  Arg::new("override")
    .short('f')
    .long("override")
    .action(ArgAction::SetTrue)
    .help("Override existing files")
}

fn key_arg() -> Arg {
  Arg::new("key")
    .long("key")
    .value_parser(parse_key)
    .help("Decrypt raw strip with this key (8 hex digits)")
}

/// Parse a 4 byte key given as hex string
pub fn parse_key(v: &str) -> Result<[u8; 4], String> {
  let v = v.trim_start_matches("0x");
  <[u8; 4] as hex::FromHex>::from_hex(v).map_err(|err| format!("'{}' is not a valid key: {}", v, err))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn app_is_consistent() {
    create_app().debug_assert();
  }

  #[test]
  fn debug_level_is_counted() {
    let matches = create_app().try_get_matches_from(["arwtool", "-ddd", "analyze", "a.arw"]).unwrap();
    assert_eq!(matches.get_count("debug"), 3);
    let (name, sc) = matches.subcommand().unwrap();
    assert_eq!(name, "analyze");
    assert_eq!(sc.get_one::<PathBuf>("FILE"), Some(&PathBuf::from("a.arw")));
  }

  #[test]
  fn decode_options() {
    let matches = create_app()
      .try_get_matches_from(["arwtool", "decode", "--key", "12345678", "--width", "6048", "a.arw"])
      .unwrap();
    let (_, sc) = matches.subcommand().unwrap();
    assert_eq!(sc.get_one::<[u8; 4]>("key"), Some(&[0x12, 0x34, 0x56, 0x78]));
    assert_eq!(sc.get_one::<usize>("width"), Some(&6048));
    assert!(sc.get_one::<PathBuf>("OUTPUT").is_none());
  }

  #[test]
  fn invalid_key() {
    assert!(parse_key("0x1234").is_err());
    assert!(parse_key("zz345678").is_err());
    assert_eq!(parse_key("0xdeadbeef"), Ok([0xde, 0xad, 0xbe, 0xef]));
    assert!(create_app().try_get_matches_from(["arwtool", "decode", "--key", "12", "a.arw"]).is_err());
  }

  #[test]
  fn subcommand_required() {
    assert!(create_app().try_get_matches_from(["arwtool"]).is_err());
  }
}
