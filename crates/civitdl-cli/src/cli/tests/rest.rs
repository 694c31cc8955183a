use super::parse;
use crate::cli::CliCommand;

#[test]
fn cli_parse_lookup() {
    match parse(&["civitdl", "lookup", "models/foo.safetensors"]) {
        CliCommand::Lookup { path } => assert_eq!(path, "models/foo.safetensors"),
        _ => panic!("expected Lookup"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["civitdl", "checksum", "/tmp/f.bin"]) {
        CliCommand::Checksum { path } => assert_eq!(path, std::path::PathBuf::from("/tmp/f.bin")),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_cache() {
    match parse(&["civitdl", "cache"]) {
        CliCommand::Cache { model } => assert!(model.is_none()),
        _ => panic!("expected Cache"),
    }
    match parse(&["civitdl", "cache", "--model", "1001"]) {
        CliCommand::Cache { model } => assert_eq!(model, Some(1001)),
        _ => panic!("expected Cache --model"),
    }
}
