//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! clock) and the YouTube Music provider into the reconciliation engine.
//! Desktop hosts typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) and call [`bootstrap_desktop`]; other hosts build a
//! [`CoreDependencies`] bundle themselves and call [`CoreService::bootstrap`].

pub mod error;

pub use error::{CoreError, Result};

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::{
    http::HttpClient,
    playlist::ItemId,
    storage::FileSystemAccess,
    time::Clock,
};
use core_runtime::config::SyncSettings;
use core_sync::{
    AccessorConfig, JsonTemplateCache, MetadataSimilarityJudge, OperationMetrics, Reconciler,
    ReconcilerConfig, ResilientAccessor, ResilientDirectory, SessionReport, SyncError,
    SyncSession, WeeklyConfig, WeeklyReport, WeeklyRotation,
};
use provider_youtube_music::{AuthHeaders, YouTubeMusicConnector};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Template cache file name inside the data directory
const TEMPLATE_CACHE_FILE: &str = "templates.json";

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            filesystem,
            clock,
        }
    }
}

/// Outcome of one [`CoreService::sync`] run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub main: SessionReport,
    /// Absent when weekly playlists are disabled or the rotation failed
    pub weekly: Option<WeeklyReport>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.main.is_success() && self.weekly.as_ref().map_or(true, |w| w.session.is_success())
    }
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    settings: SyncSettings,
    session: Arc<SyncSession>,
    weekly: Option<WeeklyRotation>,
    templates: Arc<JsonTemplateCache>,
    metrics: Arc<OperationMetrics>,
    cancel: CancellationToken,
}

impl CoreService {
    /// Wire the provider and engine from settings and bridge handles.
    ///
    /// Reads the auth header file and loads the template cache; fails when
    /// either cannot be read.
    pub async fn bootstrap(settings: SyncSettings, deps: CoreDependencies) -> Result<Self> {
        let raw_auth = deps
            .filesystem
            .read_file(&settings.auth_path)
            .await
            .map_err(|e| {
                CoreError::InitializationFailed(format!(
                    "Cannot read auth headers from {}: {}",
                    settings.auth_path.display(),
                    e
                ))
            })?;
        let auth = AuthHeaders::from_json(&raw_auth)?;
        let connector = Arc::new(YouTubeMusicConnector::new(deps.http_client.clone(), auth));

        let metrics = Arc::new(OperationMetrics::new(deps.clock.clone()));
        let cancel = CancellationToken::new();
        let accessor_config = AccessorConfig::from_settings(&settings);

        let directory = Arc::new(
            ResilientDirectory::new(
                connector.clone(),
                accessor_config.retry.clone(),
                metrics.clone(),
            )
            .with_cancellation(cancel.clone()),
        );
        let accessor = Arc::new(
            ResilientAccessor::new(connector.clone(), accessor_config, metrics.clone())
                .with_cancellation(cancel.clone()),
        );
        let judge = Arc::new(MetadataSimilarityJudge::new(connector, metrics.clone()));
        let reconciler = Arc::new(Reconciler::new(
            accessor,
            judge,
            ReconcilerConfig::from_settings(&settings),
        ));

        let cache_path = Self::template_cache_path(&settings, deps.filesystem.as_ref()).await?;
        let templates = Arc::new(
            JsonTemplateCache::load(deps.filesystem.clone(), cache_path, deps.clock.clone())
                .await?
                .with_ttl(settings.template_cache_ttl),
        );

        let session = Arc::new(SyncSession::new(
            reconciler,
            directory,
            templates.clone(),
            metrics.clone(),
        ));
        let weekly = WeeklyConfig::from_settings(&settings)
            .map(|config| WeeklyRotation::new(session.clone(), deps.clock.clone(), config));

        info!(
            playlist = %settings.playlist_name,
            strategy = %settings.strategy,
            weekly = weekly.is_some(),
            "Core service initialized"
        );

        Ok(Self {
            settings,
            session,
            weekly,
            templates,
            metrics,
            cancel,
        })
    }

    async fn template_cache_path(
        settings: &SyncSettings,
        filesystem: &dyn FileSystemAccess,
    ) -> Result<PathBuf> {
        if let Some(path) = &settings.template_cache_path {
            return Ok(path.clone());
        }
        let data_dir = filesystem.get_data_directory().await?;
        filesystem.create_dir_all(&data_dir).await?;
        Ok(data_dir.join(TEMPLATE_CACHE_FILE))
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn session(&self) -> &Arc<SyncSession> {
        &self.session
    }

    pub fn metrics(&self) -> &Arc<OperationMetrics> {
        &self.metrics
    }

    /// Token observed by every remote call and backoff sleep
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort the running sync at its next remote call or backoff
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Sync the main playlist, then this week's copy when enabled.
    ///
    /// A failing weekly rotation is logged and reported as absent; only
    /// cancellation aborts the run.
    #[instrument(skip_all, fields(playlist = %self.settings.playlist_name, desired = desired.len()))]
    pub async fn sync(&self, description: &str, desired: &[ItemId]) -> Result<SyncReport> {
        let main = self
            .session
            .sync_named_playlist(
                &self.settings.playlist_name,
                description,
                self.settings.privacy_status(),
                desired,
            )
            .await?;

        let weekly = match &self.weekly {
            Some(rotation) => match rotation.rotate(description, desired).await {
                Ok(report) => Some(report),
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled.into()),
                Err(e) => {
                    warn!(error = %e, "Weekly rotation failed");
                    None
                }
            },
            None => None,
        };

        if weekly.is_some() {
            self.metrics.log_statistics();
        }
        self.templates.log_stats();

        Ok(SyncReport { main, weekly })
    }
}

/// Desktop bootstrapper: installs logging and the reqwest/tokio bridges.
///
/// ```ignore
/// use core_runtime::config::SyncSettings;
///
/// let settings = SyncSettings::from_env()?;
/// let core = core_service::bootstrap_desktop(settings).await?;
/// let report = core.sync("Recent plays", &desired).await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(settings: SyncSettings) -> Result<CoreService> {
    use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
    use bridge_traits::time::SystemClock;
    use core_runtime::logging::{init_logging, LoggingConfig};

    init_logging(LoggingConfig::from_settings(&settings))?;

    let deps = CoreDependencies::new(
        Arc::new(ReqwestHttpClient::new()?),
        Arc::new(TokioFileSystem::new()),
        Arc::new(SystemClock),
    );
    CoreService::bootstrap(settings, deps).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bridge_traits::time::ManualClock;
    use bytes::Bytes;
    use chrono::TimeZone;
    use core_runtime::config::WeeklySettings;
    use core_sync::SessionAction;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    fn ok(body: &'static str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }

    fn settings(dir: &tempfile::TempDir) -> SyncSettings {
        SyncSettings::builder()
            .playlist_name("Recents (auto)")
            .auth_path(dir.path().join("browser.json"))
            .weekly(WeeklySettings {
                enabled: false,
                ..WeeklySettings::default()
            })
            .build()
            .unwrap()
    }

    fn deps(http: MockHttpClient, dir: &tempfile::TempDir) -> CoreDependencies {
        CoreDependencies::new(
            Arc::new(http),
            Arc::new(TokioFileSystem::with_data_directory(dir.path().join("data"))),
            Arc::new(ManualClock::new(
                chrono::Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            )),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_requires_auth_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = CoreService::bootstrap(settings(&dir), deps(MockHttpClient::new(), &dir)).await;

        assert!(matches!(result, Err(CoreError::InitializationFailed(_))));
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_auth_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("browser.json"), br#"{"accept": "*/*"}"#).unwrap();

        let result = CoreService::bootstrap(settings(&dir), deps(MockHttpClient::new(), &dir)).await;

        assert!(matches!(result, Err(CoreError::Provider(_))));
    }

    #[tokio::test]
    async fn test_sync_creates_missing_playlist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("browser.json"), br#"{"cookie": "SAPISID=abc"}"#).unwrap();

        let mut http = MockHttpClient::new();
        http.expect_execute().times(2).returning(|req| {
            if req.url.contains("/browse?") {
                ok(r#"{"contents": {"singleColumnBrowseResultsRenderer": {"tabs": []}}}"#)
            } else {
                assert!(req.url.contains("/playlist/create?"));
                ok(r#"{"playlistId": "PLcreated"}"#)
            }
        });

        let core = CoreService::bootstrap(settings(&dir), deps(http, &dir))
            .await
            .unwrap();
        let desired = vec![ItemId::from("dQw4w9WgXcQ"), ItemId::from("9bZkp7q19f0")];
        let report = core.sync("Recent plays", &desired).await.unwrap();

        assert_eq!(report.main.action, SessionAction::Created);
        assert_eq!(report.main.playlist_id.as_str(), "PLcreated");
        assert!(report.weekly.is_none());
        assert!(report.is_success());
        assert!(dir.path().join("data").join(TEMPLATE_CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn test_cancelled_service_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("browser.json"), br#"{"cookie": "SAPISID=abc"}"#).unwrap();

        let mut http = MockHttpClient::new();
        http.expect_execute().never();

        let core = CoreService::bootstrap(settings(&dir), deps(http, &dir))
            .await
            .unwrap();
        core.cancel();

        let result = core.sync("", &[ItemId::from("dQw4w9WgXcQ")]).await;
        assert!(matches!(result, Err(CoreError::Sync(SyncError::Cancelled))));
    }
}
