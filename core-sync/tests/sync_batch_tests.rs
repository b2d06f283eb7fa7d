//! End-to-end batch tests: a mocked catalog and stub CDN over a real
//! in-memory store, exercising captcha pause, cancellation, and persistence.

use async_trait::async_trait;
use bytes::Bytes;
use core_designs::{
    create_test_pool, DesignRepository, PlatformLinkRepository, Platform, PublishStatus,
    SqliteAssetRepository, SqliteDesignRepository, SqlitePlatformLinkRepository,
    SqliteTagRepository, TagRepository,
};
use core_sync::{
    AssetDownloader, BatchState, DownloaderConfig, MergeConfig, SyncOrchestrator, SyncSession,
    SyncStage,
};
use mockall::mock;
use provider_makerworld::{
    DesignCatalog, HttpClient, HttpRequest, HttpResponse, RemoteDesignDetail,
    RemoteDesignSummary, RemoteModelFile,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

mock! {
    Catalog {}

    #[async_trait]
    impl DesignCatalog for Catalog {
        async fn list_published(
            &self,
            handle: &str,
            user_id: &str,
        ) -> provider_makerworld::Result<Vec<RemoteDesignSummary>>;
        async fn design_detail(
            &self,
            remote_id: i64,
        ) -> provider_makerworld::Result<RemoteDesignDetail>;
        async fn model_archive_url(&self, remote_id: i64) -> provider_makerworld::Result<String>;
        async fn instance_file_url(&self, instance_id: i64)
            -> provider_makerworld::Result<String>;
    }
}

struct StubHttp {
    routes: HashMap<String, (u16, Vec<u8>)>,
}

impl StubHttp {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    fn route(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.routes.insert(url.to_string(), (status, body.to_vec()));
        self
    }
}

#[async_trait]
impl HttpClient for StubHttp {
    async fn execute(&self, request: HttpRequest) -> provider_makerworld::Result<HttpResponse> {
        let (status, body) = self
            .routes
            .get(&request.url)
            .unwrap_or_else(|| panic!("Unexpected URL: {}", request.url));
        Ok(HttpResponse {
            status: *status,
            headers: HashMap::new(),
            body: Bytes::from(body.clone()),
        })
    }
}

fn summary(id: i64, title: &str) -> RemoteDesignSummary {
    RemoteDesignSummary {
        id,
        public_id: Some(format!("MW-{}", id)),
        title: title.to_string(),
        summary: Some(format!("<p>About {}</p>", title)),
        description: None,
        category_id: Some(90),
        tags: vec!["printed".to_string()],
        license: Some("BY".to_string()),
        cover_url: None,
    }
}

fn detail_with_models(id: i64, title: &str) -> RemoteDesignDetail {
    RemoteDesignDetail {
        summary: summary(id, title),
        model_files: vec![RemoteModelFile {
            name: format!("{}.stl", title),
            size: Some(10),
        }],
        instances: vec![],
    }
}

fn detail_metadata_only(id: i64, title: &str) -> RemoteDesignDetail {
    RemoteDesignDetail {
        summary: summary(id, title),
        model_files: vec![],
        instances: vec![],
    }
}

fn orchestrator(
    catalog: MockCatalog,
    http: StubHttp,
    pool: &SqlitePool,
    assets_root: &std::path::Path,
) -> SyncOrchestrator {
    let assets = Arc::new(SqliteAssetRepository::new(pool.clone()));
    let downloader = AssetDownloader::new(
        Arc::new(http),
        assets.clone(),
        DownloaderConfig::new(assets_root),
    );
    SyncOrchestrator::new(
        Arc::new(catalog),
        downloader,
        Arc::new(SqliteDesignRepository::new(pool.clone())),
        assets,
        Arc::new(SqliteTagRepository::new(pool.clone())),
        Arc::new(SqlitePlatformLinkRepository::new(pool.clone())),
    )
}

#[tokio::test]
async fn test_captcha_on_second_design_pauses_batch() {
    let pool = create_test_pool().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();

    let mut catalog = MockCatalog::new();
    catalog.expect_list_published().returning(|_, _| {
        Ok(vec![
            summary(1, "Alpha"),
            summary(2, "Beta"),
            summary(3, "Gamma"),
        ])
    });
    catalog
        .expect_design_detail()
        .returning(|id| match id {
            1 => Ok(detail_with_models(1, "Alpha")),
            2 => Ok(detail_with_models(2, "Beta")),
            other => panic!("Unexpected detail fetch for {}", other),
        });
    catalog.expect_model_archive_url().returning(|id| {
        Ok(format!("https://makerworld.bblmw.com/archive/{}", id))
    });

    let http = StubHttp::new()
        .route(
            "https://makerworld.bblmw.com/archive/1",
            200,
            b"solid alpha",
        )
        .route("https://makerworld.bblmw.com/archive/2", 418, b"");

    let orchestrator = orchestrator(catalog, http, &pool, tmp.path());
    let session = SyncSession::new("owner-1", "maker", "u-9", vec![1, 2, 3]);
    let report = orchestrator.run_batch(&session).await.unwrap();

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].remote_id, 1);
    assert!(report.failed.is_empty());

    let skipped: Vec<i64> = report.skipped.iter().map(|s| s.remote_id).collect();
    assert_eq!(skipped, vec![2, 3]);
    for skip in &report.skipped {
        assert!(skip.reason.contains("captcha"));
    }

    match report.state {
        BatchState::CaptchaPaused(pause) => {
            assert_eq!(pause.remote_id, 2);
            assert_eq!(pause.name, "Beta");
        }
        other => panic!("Expected captcha pause, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_between_designs() {
    let pool = create_test_pool().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();

    let mut catalog = MockCatalog::new();
    catalog.expect_list_published().returning(|_, _| {
        Ok(vec![
            summary(1, "Alpha"),
            summary(2, "Beta"),
            summary(3, "Gamma"),
        ])
    });
    catalog
        .expect_design_detail()
        .returning(|id| match id {
            1 => Ok(detail_metadata_only(1, "Alpha")),
            other => panic!("Design {} must not start after cancellation", other),
        });

    let orchestrator = orchestrator(catalog, StubHttp::new(), &pool, tmp.path());
    let session = SyncSession::new("owner-1", "maker", "u-9", vec![1, 2, 3]);

    // Cancel while design 1 is persisting; the loop observes it before
    // design 2 starts.
    let token = session.cancel.clone();
    let orchestrator = orchestrator.with_progress(Arc::new(move |event| {
        if event.design_index == 0 && event.stage == SyncStage::Persisting {
            token.cancel();
        }
    }));

    let report = orchestrator.run_batch(&session).await.unwrap();

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].remote_id, 1);
    let skipped: Vec<i64> = report.skipped.iter().map(|s| s.remote_id).collect();
    assert_eq!(skipped, vec![2, 3]);
    for skip in &report.skipped {
        assert_eq!(skip.reason, "cancelled by user");
    }
    assert_eq!(report.state, BatchState::Cancelled);

    // No partial writes for the cancelled designs
    let designs = SqliteDesignRepository::new(pool.clone());
    assert_eq!(designs.list_names("owner-1").await.unwrap(), vec!["Alpha"]);
}

#[tokio::test]
async fn test_new_design_imported_with_link_tags_and_normalized_fields() {
    let pool = create_test_pool().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();

    let mut catalog = MockCatalog::new();
    catalog
        .expect_list_published()
        .returning(|_, _| Ok(vec![summary(7, "Benchy")]));
    catalog
        .expect_design_detail()
        .returning(|_| Ok(detail_metadata_only(7, "Benchy")));

    let orchestrator = orchestrator(catalog, StubHttp::new(), &pool, tmp.path());
    let session = SyncSession::new("owner-1", "maker", "u-9", vec![7]);
    let report = orchestrator.run_batch(&session).await.unwrap();

    assert_eq!(report.state, BatchState::Done);
    assert_eq!(report.completed.len(), 1);
    assert!(report.completed[0].created);

    let designs = SqliteDesignRepository::new(pool.clone());
    let design = designs
        .find_by_id(report.completed[0].design_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(design.name, "Benchy");
    // Single-paragraph wrapper unwrapped, license mapped to local vocabulary
    assert_eq!(design.description, "About Benchy");
    assert_eq!(design.license, "CC-BY-4.0");
    assert_eq!(design.category_makerworld, Some(90));

    let links = SqlitePlatformLinkRepository::new(pool.clone());
    let link = links
        .find_active(Platform::MakerWorld, design.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.remote_id, "MW-7");
    assert_eq!(link.status, PublishStatus::Published.as_i64());
    assert!(link.published_at.is_some());

    let tags = SqliteTagRepository::new(pool.clone());
    let active = tags.active_tags(design.id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].tag, "printed");
}

#[tokio::test]
async fn test_linked_design_updated_per_merge_config() {
    let pool = create_test_pool().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();

    let designs = SqliteDesignRepository::new(pool.clone());
    let design_id = designs
        .insert_imported(&core_designs::NewDesign {
            owner_id: "owner-1".to_string(),
            name: "Old title".to_string(),
            description: "Old description".to_string(),
            license: "CC0-1.0".to_string(),
            category_makerworld: Some(90),
        })
        .await
        .unwrap();
    let links = SqlitePlatformLinkRepository::new(pool.clone());
    links
        .upsert(Platform::MakerWorld, design_id, "MW-7", PublishStatus::Published)
        .await
        .unwrap();

    let mut catalog = MockCatalog::new();
    catalog
        .expect_list_published()
        .returning(|_, _| Ok(vec![summary(7, "New title")]));
    catalog
        .expect_design_detail()
        .returning(|_| Ok(detail_metadata_only(7, "New title")));

    let orchestrator = orchestrator(catalog, StubHttp::new(), &pool, tmp.path());
    let mut session = SyncSession::new("owner-1", "maker", "u-9", vec![7]);
    // Only the name is allowed through
    session.merge_configs.insert(
        7,
        MergeConfig {
            sync_description: false,
            sync_license: false,
            sync_category: false,
            sync_tags: false,
            ..MergeConfig::default()
        },
    );

    let report = orchestrator.run_batch(&session).await.unwrap();
    assert_eq!(report.completed.len(), 1);
    assert!(!report.completed[0].created);
    assert_eq!(report.completed[0].design_id, design_id);
    assert!(report.completed[0]
        .changes
        .iter()
        .any(|c| c.contains("name")));

    let design = designs.find_by_id(design_id).await.unwrap().unwrap();
    assert_eq!(design.name, "New title");
    assert_eq!(design.description, "Old description");
    assert_eq!(design.license, "CC0-1.0");
}

#[tokio::test]
async fn test_skip_config_avoids_all_network_calls() {
    let pool = create_test_pool().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();

    let mut catalog = MockCatalog::new();
    catalog
        .expect_list_published()
        .returning(|_, _| Ok(vec![summary(7, "Benchy")]));
    // No design_detail expectation: a detail fetch would panic the mock.

    let orchestrator = orchestrator(catalog, StubHttp::new(), &pool, tmp.path());
    let mut session = SyncSession::new("owner-1", "maker", "u-9", vec![7]);
    session.merge_configs.insert(
        7,
        MergeConfig {
            skip: true,
            ..MergeConfig::default()
        },
    );

    let report = orchestrator.run_batch(&session).await.unwrap();
    assert!(report.completed.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, "skipped by user");
    assert_eq!(report.state, BatchState::Done);
}

#[tokio::test]
async fn test_detail_failure_downgrades_to_list_data() {
    let pool = create_test_pool().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();

    let mut catalog = MockCatalog::new();
    catalog
        .expect_list_published()
        .returning(|_, _| Ok(vec![summary(7, "Benchy")]));
    catalog.expect_design_detail().returning(|_| {
        Err(provider_makerworld::ProviderError::Parse(
            "unexpected shape".to_string(),
        ))
    });

    let orchestrator = orchestrator(catalog, StubHttp::new(), &pool, tmp.path());
    let session = SyncSession::new("owner-1", "maker", "u-9", vec![7]);
    let report = orchestrator.run_batch(&session).await.unwrap();

    // List-level data was enough to import the design.
    assert_eq!(report.completed.len(), 1);
    assert!(report.failed.is_empty());
}
