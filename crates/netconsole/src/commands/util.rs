//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use crate::cli::PayloadArgs;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool, action: &str) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    parse_json(&contents, "from-file")
}

pub fn parse_json(raw: &str, field: &str) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Resolve `--data` / `--from-file` into a JSON body, if either was given.
pub fn optional_body(
    data: Option<&str>,
    from_file: Option<&Path>,
) -> Result<Option<serde_json::Value>, CliError> {
    match (data, from_file) {
        (Some(raw), _) => parse_json(raw, "data").map(Some),
        (None, Some(path)) => read_json_file(path).map(Some),
        (None, None) => Ok(None),
    }
}

/// A required JSON object payload.
pub fn payload(args: &PayloadArgs) -> Result<serde_json::Value, CliError> {
    let body = optional_body(args.data.as_deref(), args.from_file.as_deref())?.ok_or_else(
        || CliError::Validation {
            field: "data".into(),
            reason: "pass --data or --from-file".into(),
        },
    )?;
    if !body.is_object() {
        return Err(CliError::Validation {
            field: "data".into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(body)
}

/// Split `key=value`; the value may itself contain `=`.
pub fn parse_key_value(raw: &str, field: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(CliError::Validation {
            field: field.into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn key_value_keeps_extra_equals() {
        assert_eq!(
            parse_key_value("q=a=b", "param").unwrap(),
            ("q".to_owned(), "a=b".to_owned())
        );
        assert!(parse_key_value("novalue", "param").is_err());
        assert!(parse_key_value("=x", "param").is_err());
    }

    #[test]
    fn payload_must_be_object() {
        let args = PayloadArgs {
            data: Some("[1, 2]".into()),
            from_file: None,
        };
        assert!(matches!(
            payload(&args),
            Err(CliError::Validation { .. })
        ));

        let args = PayloadArgs {
            data: Some(r#"{"name": "core-sw-01"}"#.into()),
            from_file: None,
        };
        assert_eq!(payload(&args).unwrap()["name"], "core-sw-01");
    }

    #[test]
    fn body_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, r#"{"site": "hq"}"#).unwrap();

        let body = optional_body(None, Some(&path)).unwrap().unwrap();
        assert_eq!(body["site"], "hq");
        assert!(optional_body(None, None).unwrap().is_none());
    }
}
