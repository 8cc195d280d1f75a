//! Configuration layering as seen by an embedding application.

use std::io::Write;

use spapi::config::{Loader, Overrides};
use spapi::Error;
use tempfile::NamedTempFile;

/// A JWT secret in the config file must be ignored.
#[test]
fn jwt_secret_in_file_is_ignored() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[auth]
jwt_secret = "this-secret-should-never-be-read-from-a-file"
"#
    )
    .unwrap();

    let config = Loader::new("SUITEFILESECRET")
        .load(Some(file.path()), &Overrides::default())
        .unwrap();
    assert!(config.auth.jwt_secret.is_empty());
}

/// Environment overrides the file and CLI overrides the environment.
#[test]
fn layers_apply_in_order() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 3000

[broker]
endpoint = "/from-file"
enable_help = false
"#
    )
    .unwrap();

    // SAFETY: the prefix is unique to this test.
    unsafe {
        std::env::set_var("SUITELAYERS_ENDPOINT", "/from-env");
        std::env::set_var("SUITELAYERS_ENABLE_HELP", "true");
        std::env::set_var("SUITELAYERS_HELP_KEY", "env-key");
        std::env::set_var("SUITELAYERS_REQUIRE_HTTPS", "false");
    }

    let cli = Overrides {
        endpoint: Some("/from-cli".into()),
        require_https: Some(true),
        ..Default::default()
    };
    let config = Loader::new("SUITELAYERS").load(Some(file.path()), &cli).unwrap();

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.broker.endpoint, "/from-cli");
    assert!(config.broker.enable_help);
    assert_eq!(config.broker.help_key.as_deref(), Some("env-key"));
    assert!(config.broker.require_https);
}

#[test]
fn invalid_boolean_in_env_is_rejected() {
    // SAFETY: the prefix is unique to this test.
    unsafe {
        std::env::set_var("SUITEBADFLAG_ENABLE_HELP", "maybe");
    }
    let result = Loader::new("SUITEBADFLAG").load(None, &Overrides::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn malformed_file_is_a_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[broker\nendpoint = ").unwrap();
    let result = Loader::new("SUITEMALFORMED").load(Some(file.path()), &Overrides::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn short_secret_is_rejected() {
    let cli = Overrides {
        jwt_secret: Some("too-short".into()),
        ..Default::default()
    };
    let result = Loader::new("SUITESHORT").load(None, &cli);
    assert!(matches!(result, Err(Error::Config(_))));
}
