// quiz-gateway-rs/src/manifest.rs
// Pre-flight check for the platform manifest (`fbapp-config.json`).
// Fails on the first violation, mirroring how the platform rejects uploads.

use serde_json::{Map, Value};
use std::path::Path;

const ALLOWED_PLATFORM_VERSIONS: &[&str] = &["RICH_GAMEPLAY"];
const ALLOWED_NAVIGATION_MENU_VERSIONS: &[&str] = &["NAV_FLOATING", "NAV_HIDDEN"];
const ALLOWED_ORIENTATIONS: &[&str] = &["PORTRAIT", "LANDSCAPE", "BOTH"];

const REQUIRED_INSTANT_GAMES: &[&str] = &[
    "platform_version",
    "navigation_menu_version",
    "orientation",
    "match_player_config",
];

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("{0} must be an object")]
    NotAnObject(&'static str),

    #[error("{field} must be one of: {allowed}")]
    NotAllowed { field: &'static str, allowed: String },

    #[error("{0}")]
    Constraint(&'static str),
}

/// Read and validate the manifest at `path`.
pub fn validate_manifest_file(path: &Path) -> Result<(), ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    validate_manifest_str(&content)
}

pub fn validate_manifest_str(content: &str) -> Result<(), ManifestError> {
    let manifest: Value = serde_json::from_str(content)?;
    validate_manifest(&manifest)
}

pub fn validate_manifest(manifest: &Value) -> Result<(), ManifestError> {
    let root = manifest
        .as_object()
        .ok_or(ManifestError::NotAnObject("root"))?;

    let instant_games = root
        .get("instant_games")
        .ok_or_else(|| ManifestError::MissingField("root.instant_games".to_string()))?
        .as_object()
        .ok_or(ManifestError::NotAnObject("instant_games"))?;

    for key in REQUIRED_INSTANT_GAMES {
        if !instant_games.contains_key(*key) {
            return Err(ManifestError::MissingField(format!("instant_games.{}", key)));
        }
    }

    check_allowed(
        instant_games,
        "platform_version",
        "instant_games.platform_version",
        ALLOWED_PLATFORM_VERSIONS,
    )?;
    check_allowed(
        instant_games,
        "navigation_menu_version",
        "instant_games.navigation_menu_version",
        ALLOWED_NAVIGATION_MENU_VERSIONS,
    )?;
    check_allowed(
        instant_games,
        "orientation",
        "instant_games.orientation",
        ALLOWED_ORIENTATIONS,
    )?;

    let match_player_config = instant_games
        .get("match_player_config")
        .and_then(Value::as_object)
        .ok_or(ManifestError::NotAnObject("instant_games.match_player_config"))?;

    let minimum_size = match_player_config
        .get("minimum_size")
        .and_then(Value::as_i64)
        .filter(|size| *size >= 2)
        .ok_or(ManifestError::Constraint(
            "instant_games.match_player_config.minimum_size must be an integer >= 2",
        ))?;

    match_player_config
        .get("maximum_size")
        .and_then(Value::as_i64)
        .filter(|size| *size >= minimum_size)
        .ok_or(ManifestError::Constraint(
            "instant_games.match_player_config.maximum_size must be an integer >= minimum_size",
        ))?;

    Ok(())
}

fn check_allowed(
    obj: &Map<String, Value>,
    key: &str,
    field: &'static str,
    allowed: &[&str],
) -> Result<(), ManifestError> {
    match obj.get(key).and_then(Value::as_str) {
        Some(value) if allowed.contains(&value) => Ok(()),
        _ => Err(ManifestError::NotAllowed {
            field,
            allowed: allowed.join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "instant_games": {
                "platform_version": "RICH_GAMEPLAY",
                "navigation_menu_version": "NAV_FLOATING",
                "orientation": "PORTRAIT",
                "match_player_config": { "minimum_size": 2, "maximum_size": 6 }
            }
        })
    }

    #[test]
    fn test_valid_manifest_passes() {
        assert!(validate_manifest(&valid()).is_ok());
    }

    #[test]
    fn test_bundled_manifest_passes() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fbapp-config.json");
        validate_manifest_file(&path).unwrap();
    }

    #[test]
    fn test_missing_instant_games() {
        let err = validate_manifest(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "missing required field: root.instant_games");
    }

    #[test]
    fn test_missing_nested_field() {
        let mut manifest = valid();
        manifest["instant_games"].as_object_mut().unwrap().remove("orientation");
        let err = validate_manifest(&manifest).unwrap_err();
        assert_eq!(err.to_string(), "missing required field: instant_games.orientation");
    }

    #[test]
    fn test_disallowed_enum_value() {
        let mut manifest = valid();
        manifest["instant_games"]["navigation_menu_version"] = json!("NAV_TOP");
        let err = validate_manifest(&manifest).unwrap_err();
        assert_eq!(
            err.to_string(),
            "instant_games.navigation_menu_version must be one of: NAV_FLOATING, NAV_HIDDEN"
        );
    }

    #[test]
    fn test_player_size_constraints() {
        let mut manifest = valid();
        manifest["instant_games"]["match_player_config"]["minimum_size"] = json!(1);
        assert!(matches!(
            validate_manifest(&manifest),
            Err(ManifestError::Constraint(msg)) if msg.contains("minimum_size")
        ));

        let mut manifest = valid();
        manifest["instant_games"]["match_player_config"]["maximum_size"] = json!(1);
        assert!(matches!(
            validate_manifest(&manifest),
            Err(ManifestError::Constraint(msg)) if msg.contains("maximum_size")
        ));

        let mut manifest = valid();
        manifest["instant_games"]["match_player_config"]["minimum_size"] = json!(2.5);
        assert!(validate_manifest(&manifest).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            validate_manifest_str("{ not json"),
            Err(ManifestError::Json(_))
        ));
    }
}
