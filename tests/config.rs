mod common;

use std::path::PathBuf;

use common::Sandbox;
use hoist::config::{DEFAULT_PORT, DeploymentConfig, RawInputs, RemoteTarget};
use hoist::error::DeployError;

#[test]
fn defaults_apply() {
    let sandbox = Sandbox::new();
    let inputs = RawInputs {
        branch: Some("   ".into()),
        port: None,
        ..sandbox.inputs()
    };

    let config = DeploymentConfig::from_inputs(&inputs).unwrap();

    assert_eq!(config.branch, "main");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.repo_name(), "app");
    assert_eq!(config.remote.destination(), "deploy@203.0.113.7");
    assert_eq!(config.remote.key_path, PathBuf::from(sandbox.key()));
}

#[test]
fn explicit_values_are_kept() {
    let sandbox = Sandbox::new();
    let inputs = RawInputs {
        branch: Some("release".into()),
        port: Some("9000".into()),
        ..sandbox.inputs()
    };

    let config = DeploymentConfig::from_inputs(&inputs).unwrap();

    assert_eq!(config.branch, "release");
    assert_eq!(config.port, 9000);
    assert_eq!(config.token.expose(), "ghp_s3cret");
}

#[test]
fn each_missing_field_has_its_own_exit_code() {
    let sandbox = Sandbox::new();
    let base = sandbox.inputs();

    let cases: Vec<(RawInputs, i32)> = vec![
        (RawInputs { repo_url: None, ..base.clone() }, 10),
        (RawInputs { token: Some(String::new()), ..base.clone() }, 11),
        (RawInputs { user: None, ..base.clone() }, 12),
        (RawInputs { host: Some(" ".into()), ..base.clone() }, 13),
        (RawInputs { port: Some("web".into()), ..base.clone() }, 16),
    ];

    for (inputs, code) in cases {
        let err = DeploymentConfig::from_inputs(&inputs).unwrap_err();
        assert_eq!(err.exit_code(), code, "{err}");
    }
}

#[test]
fn url_is_checked_first() {
    let err = DeploymentConfig::from_inputs(&RawInputs::default()).unwrap_err();

    assert!(matches!(err, DeployError::MissingRepoUrl));
}

#[test]
fn nonexistent_key_is_rejected() {
    let sandbox = Sandbox::new();
    let missing = sandbox.dir.path().join("nope").display().to_string();
    let inputs = RawInputs {
        key_path: Some(missing.clone()),
        ..sandbox.inputs()
    };

    let err = DeploymentConfig::from_inputs(&inputs).unwrap_err();

    match err {
        DeployError::KeyNotFound(path) => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn directory_is_not_a_key() {
    let sandbox = Sandbox::new();
    let inputs = RawInputs {
        key_path: Some(sandbox.workdir().display().to_string()),
        ..sandbox.inputs()
    };

    let err = RemoteTarget::from_inputs(&inputs).unwrap_err();

    assert_eq!(err.exit_code(), 15);
}

#[test]
fn remote_target_ignores_deploy_fields() {
    let sandbox = Sandbox::new();
    let inputs = RawInputs {
        repo_url: None,
        token: None,
        ..sandbox.inputs()
    };

    let target = RemoteTarget::from_inputs(&inputs).unwrap();

    assert_eq!(target.user, "deploy");
    assert_eq!(target.host, "203.0.113.7");
}
