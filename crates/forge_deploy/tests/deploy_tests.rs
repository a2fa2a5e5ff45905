//! Integration tests for the deploy pipeline.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use forge_core::{ForgeConfig, GenMode};
use forge_deploy::{
    DeployError, DeployPipeline, MockBuilder, MockScreenshotService, DEPLOY_KEY_LENGTH,
};
use forge_store::{AppStore, DeploymentStore, MemoryStore};

struct Harness {
    store: Arc<MemoryStore>,
    config: ForgeConfig,
    _root: tempfile::TempDir,
}

fn harness() -> Harness {
    let root = tempfile::tempdir().unwrap();
    let config = ForgeConfig {
        output_root: root.path().join("code_output"),
        deploy_root: root.path().join("code_deploy"),
        deploy_domain: "http://localhost".into(),
        ..ForgeConfig::default()
    };
    Harness {
        store: Arc::new(MemoryStore::new()),
        config,
        _root: root,
    }
}

impl Harness {
    fn pipeline(&self) -> DeployPipeline {
        DeployPipeline::new(self.config.clone(), self.store.clone(), self.store.clone())
    }

    async fn app_with_source(&self, mode: GenMode, files: &[(&str, &str)]) -> forge_core::Application {
        let app = self
            .store
            .create_app(1, "app".into(), "an app".into(), Some(mode))
            .await
            .unwrap();
        let dir = self.config.output_dir(mode, app.id);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        app
    }
}

#[tokio::test]
async fn test_deploy_publishes_static_source() {
    let h = harness();
    let app = h
        .app_with_source(
            GenMode::MultiFile,
            &[("index.html", "<html>hi</html>"), ("style.css", "body{}"), ("script.js", "")],
        )
        .await;

    let outcome = h.pipeline().deploy(app.id).await.unwrap();

    assert_eq!(outcome.deploy_key.len(), DEPLOY_KEY_LENGTH);
    assert_eq!(outcome.url, format!("http://localhost/{}", outcome.deploy_key));
    assert_eq!(
        fs::read_to_string(outcome.deploy_dir.join("index.html")).unwrap(),
        "<html>hi</html>"
    );

    // Record and application row both updated
    let record = h.store.get_record(app.id).await.unwrap().unwrap();
    assert_eq!(record.deploy_key, outcome.deploy_key);
    let app = h.store.get_app(app.id).await.unwrap().unwrap();
    assert_eq!(app.deploy_key, Some(outcome.deploy_key));
    assert!(app.deployed_at.is_some());
}

#[tokio::test]
async fn test_deploy_key_stable_across_redeploys() {
    let h = harness();
    let app = h
        .app_with_source(GenMode::Html, &[("index.html", "<html>v1</html>")])
        .await;
    let pipeline = h.pipeline();

    let first = pipeline.deploy(app.id).await.unwrap();

    // Regenerate and redeploy
    let dir = h.config.output_dir(GenMode::Html, app.id);
    fs::write(dir.join("index.html"), "<html>v2</html>").unwrap();
    let second = pipeline.deploy(app.id).await.unwrap();

    assert_eq!(first.deploy_key, second.deploy_key);
    assert_eq!(
        fs::read_to_string(second.deploy_dir.join("index.html")).unwrap(),
        "<html>v2</html>"
    );
}

#[tokio::test]
async fn test_allocated_keys_are_unique_across_apps() {
    let h = harness();
    let pipeline = h.pipeline();
    let mut keys = std::collections::HashSet::new();
    for _ in 0..5 {
        let app = h
            .app_with_source(GenMode::Html, &[("index.html", "<html></html>")])
            .await;
        let outcome = pipeline.deploy(app.id).await.unwrap();
        assert!(h.store.deploy_key_exists(&outcome.deploy_key).await.unwrap());
        assert!(keys.insert(outcome.deploy_key));
    }
}

#[tokio::test]
async fn test_project_build_artifact_is_published() {
    let h = harness();
    let app = h
        .app_with_source(GenMode::VueProject, &[("package.json", "{}")])
        .await;
    let builder = MockBuilder::succeeding();
    let pipeline = h
        .pipeline()
        .with_builder(GenMode::VueProject, Arc::new(builder.clone()));

    let outcome = pipeline.deploy(app.id).await.unwrap();

    // The built dist/ content was published, not the raw source
    assert_eq!(
        fs::read_to_string(outcome.deploy_dir.join("index.html")).unwrap(),
        "<html>built</html>"
    );
    assert!(!outcome.deploy_dir.join("package.json").exists());
    assert_eq!(
        builder.built_dirs(),
        vec![h.config.output_dir(GenMode::VueProject, app.id)]
    );
}

#[tokio::test]
async fn test_missing_build_artifact_aborts_untouched() {
    let h = harness();
    let app = h
        .app_with_source(GenMode::ReactProject, &[("package.json", "{}")])
        .await;
    let pipeline = h
        .pipeline()
        .with_builder(GenMode::ReactProject, Arc::new(MockBuilder::without_artifact()));

    let err = pipeline.deploy(app.id).await.unwrap_err();
    assert!(matches!(err, DeployError::MissingArtifact(_)));

    // Nothing published, nothing recorded
    assert!(!h.config.deploy_root.exists() || fs::read_dir(&h.config.deploy_root).unwrap().next().is_none());
    assert!(h.store.get_record(app.id).await.unwrap().is_none());
    assert!(h.store.get_app(app.id).await.unwrap().unwrap().deploy_key.is_none());
}

#[tokio::test]
async fn test_build_failure_aborts_untouched() {
    let h = harness();
    let app = h
        .app_with_source(GenMode::ReactProject, &[("package.json", "{}")])
        .await;
    let pipeline = h
        .pipeline()
        .with_builder(GenMode::ReactProject, Arc::new(MockBuilder::failing("vite exploded")));

    let err = pipeline.deploy(app.id).await.unwrap_err();
    match err {
        DeployError::Build(message) => assert!(message.contains("vite exploded")),
        other => panic!("expected Build error, got {}", other),
    }
    assert!(h.store.get_record(app.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deploy_without_generated_code_fails() {
    let h = harness();
    let app = h
        .store
        .create_app(1, "empty".into(), "an app".into(), Some(GenMode::Html))
        .await
        .unwrap();

    let err = h.pipeline().deploy(app.id).await.unwrap_err();
    assert!(matches!(err, DeployError::Validation(_)));
}

#[tokio::test]
async fn test_screenshot_updates_cover_eventually() {
    let h = harness();
    let app = h
        .app_with_source(GenMode::Html, &[("index.html", "<html></html>")])
        .await;
    let screenshots = MockScreenshotService::returning("covers/app.png");
    let pipeline = h.pipeline().with_screenshots(Arc::new(screenshots.clone()));

    let outcome = pipeline.deploy(app.id).await.unwrap();

    // The detached task lands after the deploy result was returned
    let mut cover = None;
    for _ in 0..50 {
        cover = h.store.get_app(app.id).await.unwrap().unwrap().cover;
        if cover.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cover.as_deref(), Some("covers/app.png"));
    assert_eq!(screenshots.captured_urls(), vec![outcome.url]);
}

#[tokio::test]
async fn test_screenshot_failure_does_not_affect_deploy() {
    let h = harness();
    let app = h
        .app_with_source(GenMode::Html, &[("index.html", "<html></html>")])
        .await;
    let pipeline = h
        .pipeline()
        .with_screenshots(Arc::new(MockScreenshotService::failing("render down")));

    let outcome = pipeline.deploy(app.id).await;
    assert!(outcome.is_ok());

    tokio::time::sleep(Duration::from_millis(50)).await;
    // Cover stays empty, deploy record stays intact
    let app = h.store.get_app(app.id).await.unwrap().unwrap();
    assert!(app.cover.is_none());
    assert!(app.deploy_key.is_some());
}
