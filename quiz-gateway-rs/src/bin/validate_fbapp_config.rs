// quiz-gateway-rs/src/bin/validate_fbapp_config.rs
// Usage: validate-fbapp-config [path]
// Defaults to FBAPP_CONFIG_PATH, then `fbapp-config.json`.

use config_rs::ServerSettings;
use quiz_gateway::manifest::validate_manifest_file;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| ServerSettings::from_env().fbapp_config_path);

    match validate_manifest_file(&path) {
        Ok(()) => {
            println!("fbapp-config validation passed.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("fbapp-config validation failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
