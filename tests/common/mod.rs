//! Shared test harness for integration tests.
//!
//! [`TestHarness::start`] builds a full [`AppContext`] over a temp directory,
//! runs the worker pool with in-process fakes for ffprobe and ffmpeg, and
//! serves the router on a random port.
//!
//! The fakes are driven by the uploaded bytes: the first token is the source
//! size (`1280x720`), and `fail:<rung>` makes that rung's transcode fail.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use lf_av::transcode::layout;
use lf_av::{Artifacts, Prober, RungTranscoder, ToolRegistry};
use lf_core::config::Config;
use lf_core::{Error, Rung, SourceDimensions};
use lf_server::context::AppContext;
use lf_server::router::build_router;

pub struct ContentProber;

#[async_trait]
impl Prober for ContentProber {
    fn name(&self) -> &'static str {
        "content"
    }

    async fn probe(&self, path: &Path) -> lf_core::Result<SourceDimensions> {
        let text = tokio::fs::read_to_string(path).await?;
        let token = text.split_whitespace().next().unwrap_or("");
        let (w, h) = token
            .split_once('x')
            .ok_or_else(|| Error::Probe(format!("no video stream in {}", path.display())))?;
        match (w.parse::<u32>(), h.parse::<u32>()) {
            (Ok(w), Ok(h)) => Ok(SourceDimensions::new(w, h)),
            _ => Err(Error::Probe(format!("bad dimensions {token:?}"))),
        }
    }
}

pub struct ContentTranscoder;

#[async_trait]
impl RungTranscoder for ContentTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        output_dir: &Path,
        rung: &Rung,
    ) -> lf_core::Result<Artifacts> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| Error::storage(output_dir, e))?;

        let text = tokio::fs::read_to_string(source).await?;
        if text
            .split_whitespace()
            .any(|t| t == format!("fail:{}", rung.label))
        {
            return Err(Error::Tool {
                tool: "ffmpeg".into(),
                exit_code: Some(1),
                message: format!("fake encoder refused {}", rung.label),
            });
        }

        let artifacts = Artifacts::for_rung(output_dir, rung);
        tokio::fs::write(&artifacts.progressive, b"mp4").await?;
        tokio::fs::write(&artifacts.manifest, b"#EXTM3U\n#EXT-X-ENDLIST\n").await?;
        tokio::fs::write(output_dir.join("segment000.ts"), b"ts").await?;
        Ok(artifacts)
    }
}

/// A running server plus worker pool over a temp directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub addr: SocketAddr,
    pub cancel: CancellationToken,
    pub client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with a config tweak applied on top of the temp-dir defaults.
    pub async fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads");
        config.storage.output_dir = dir.path().join("uploads").join("videos");
        tweak(&mut config);
        lf_server::ensure_storage_dirs(&config.storage).expect("failed to create storage dirs");

        let ctx = AppContext::new(config, Arc::new(ToolRegistry::default()));
        let cancel = ctx.shutdown.clone();

        let pool = ctx.worker_pool(Arc::new(ContentProber), Arc::new(ContentTranscoder));
        tokio::spawn(pool.run(cancel.clone()));

        let app = build_router(ctx.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(lf_server::serve(listener, app, cancel.clone()));

        Self {
            ctx,
            addr,
            cancel,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.ctx.config.storage.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.ctx.config.storage.output_dir
    }

    /// Files directly inside the upload directory.
    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .collect()
    }

    /// POST a file under the `videofile` field.
    pub async fn upload(&self, name: &str, mime: &str, body: &str) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(body.as_bytes().to_vec())
            .file_name(name.to_string())
            .mime_str(mime)
            .unwrap();
        let form = reqwest::multipart::Form::new().part("videofile", part);
        self.client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Upload a video and return its id, asserting 202.
    pub async fn upload_video(&self, name: &str, body: &str) -> String {
        let resp = self.upload(name, "video/mp4", body).await;
        assert_eq!(resp.status(), 202);
        let json: Value = resp.json().await.unwrap();
        json["videoId"].as_str().unwrap().to_string()
    }

    pub async fn job(&self, id: &str) -> Value {
        let resp = self
            .client
            .get(self.url(&format!("/api/jobs/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_terminal(&self, id: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.job(id).await;
            if matches!(job["status"].as_str(), Some("succeeded" | "failed")) {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {id} stuck in {}",
                job["status"]
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn rung_dir(&self, id: &str, rung: &str) -> PathBuf {
        layout::job_dir(self.output_dir(), &lf_core::JobId::new(id).unwrap()).join(rung)
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
