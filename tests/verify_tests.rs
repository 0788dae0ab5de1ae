// End-to-end verification flow with a scripted runner and in-memory engine


use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use test_utils::{failed, fast_config, ok, program_dir, random_request, FakeEngine, FakeRunner};
use verify_release::engine::{BACKEND_URL_ENV, IGNORE_AMBIENT_PLUGINS_ENV, PASSPHRASE_ENV};
use verify_release::error::VerifyError;
use verify_release::installer::nodejs::npm_program;
use verify_release::installer::InstallOutcome;
use verify_release::process::ProcessRunner;
use verify_release::request::Ecosystem;
use verify_release::staging::TEMP_DIR_PREFIX;
use verify_release::verify::ReleaseVerifier;

fn verifier(runner: &Arc<FakeRunner>, engine: &Arc<FakeEngine>, staging_root: &Path) -> ReleaseVerifier {
    let runner: Arc<dyn ProcessRunner> = runner.clone();
    ReleaseVerifier::new(runner, engine.clone(), reqwest::Client::new(), fast_config())
        .with_staging_root(staging_root)
}

fn is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn test_npm_verification_end_to_end() {
    let scratch = tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().respond("view", vec![ok("\"4.16.2\"")]));
    let engine = Arc::new(FakeEngine::new());
    let request = random_request(Ecosystem::Nodejs, "random-nodejs");

    let report = verifier(&runner, &engine, scratch.path())
        .verify(&request)
        .await
        .unwrap();

    let npm = npm_program();
    assert_eq!(
        runner.command_lines(),
        vec![
            format!("{npm} remove @pulumi/random"),
            format!("{npm} view @pulumi/random@4.16.2 version --json"),
            format!("{npm} install @pulumi/random@4.16.2"),
        ]
    );
    assert_eq!(report.ecosystem, Ecosystem::Nodejs);
    assert!(report.install.is_installed());
    assert!(report.preview.stdout.contains("to create"));

    let created = engine.created();
    assert_eq!(created.len(), 1);
    let stack = &created[0];
    assert_eq!(stack.options.name, "verify-release");
    assert_eq!(stack.options.secrets_provider, "passphrase");
    assert!(stack.work_dir.ends_with("random-nodejs"));

    let temp_root = stack.work_dir.parent().unwrap();
    assert!(temp_root
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(TEMP_DIR_PREFIX));
    assert_eq!(
        stack.options.environment[BACKEND_URL_ENV],
        verify_release::engine::backend_url(temp_root)
    );
    assert_eq!(
        stack.options.environment[PASSPHRASE_ENV],
        "correct-horse-battery-staple"
    );
    assert_eq!(stack.options.environment[IGNORE_AMBIENT_PLUGINS_ENV], "true");

    // Installers run inside the staged copy, never the source program.
    assert!(runner
        .calls()
        .iter()
        .all(|call| call.working_dir.as_deref() == Some(stack.work_dir.as_path())));
    assert_eq!(engine.previewed(), vec![stack.work_dir.clone()]);

    assert!(!temp_root.exists());
    assert!(is_empty(scratch.path()));
}

#[tokio::test]
async fn test_cleanup_after_preview_failure() {
    let scratch = tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().respond("view", vec![ok("\"4.16.2\"")]));
    let engine = Arc::new(FakeEngine::failing_preview());
    let request = random_request(Ecosystem::Nodejs, "random-nodejs");

    let err = verifier(&runner, &engine, scratch.path())
        .verify(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Preview(_)));
    assert_eq!(err.exit_code(), verify_release::exit_codes::PREVIEW_FAILURE);
    assert_eq!(engine.previewed().len(), 1);
    assert!(is_empty(scratch.path()));
}

#[tokio::test]
async fn test_cleanup_after_install_failure() {
    let scratch = tempdir().unwrap();
    let runner = Arc::new(
        FakeRunner::new()
            .respond("view", vec![ok("\"4.16.2\"")])
            .respond("install", vec![failed(1, "npm ERR! ETARGET")]),
    );
    let engine = Arc::new(FakeEngine::new());
    let request = random_request(Ecosystem::Nodejs, "random-nodejs");

    let err = verifier(&runner, &engine, scratch.path())
        .verify(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Install(_)));
    assert!(engine.previewed().is_empty());
    assert!(is_empty(scratch.path()));
}

#[tokio::test]
async fn test_source_program_is_never_modified() {
    let scratch = tempdir().unwrap();
    let source = program_dir("random-nodejs");
    let before = std::fs::read_to_string(source.join("package.json")).unwrap();

    let runner = Arc::new(FakeRunner::new().respond("view", vec![ok("\"4.16.2\"")]));
    let engine = Arc::new(FakeEngine::new());
    let request = random_request(Ecosystem::Nodejs, "random-nodejs");
    verifier(&runner, &engine, scratch.path())
        .verify(&request)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(source.join("package.json")).unwrap(),
        before
    );
    assert!(runner
        .calls()
        .iter()
        .all(|call| call.working_dir.as_deref() != Some(source.as_path())));
}

#[tokio::test]
async fn test_yaml_program_previews_without_install() {
    let scratch = tempdir().unwrap();
    let program = tempdir().unwrap();
    std::fs::write(
        program.path().join("Pulumi.yaml"),
        "name: random-yaml\nruntime: yaml\n",
    )
    .unwrap();

    let runner = Arc::new(FakeRunner::new());
    let engine = Arc::new(FakeEngine::new());
    let mut request = random_request(Ecosystem::Yaml, "random-nodejs");
    request.source_directory = program.path().to_path_buf();

    let report = verifier(&runner, &engine, scratch.path())
        .verify(&request)
        .await
        .unwrap();

    assert_eq!(
        report.install,
        InstallOutcome::Unsupported {
            ecosystem: Ecosystem::Yaml
        }
    );
    assert!(runner.calls().is_empty());
    assert_eq!(engine.previewed().len(), 1);
    assert!(is_empty(scratch.path()));
}

#[tokio::test]
async fn test_concurrent_verifications_are_isolated() {
    let scratch = tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().respond("view", vec![ok("\"4.16.2\"")]));
    let engine = Arc::new(FakeEngine::new());
    let verifier = verifier(&runner, &engine, scratch.path());
    let request = random_request(Ecosystem::Nodejs, "random-nodejs");

    let (first, second) = tokio::join!(verifier.verify(&request), verifier.verify(&request));
    first.unwrap();
    second.unwrap();

    let created = engine.created();
    assert_eq!(created.len(), 2);
    assert_ne!(created[0].work_dir, created[1].work_dir);
    assert!(is_empty(scratch.path()));
}
