//! The per-page export engine
//!
//! An [`Exporter`] owns one page, its configuration and the single
//! `Idle → Running → Idle` gate. `start_export` answers immediately with
//! [`StartResponse::Started`] or [`StartResponse::Busy`]; the run itself
//! happens on the runtime and reports through an [`EventSink`].

pub mod events;
pub mod options;

pub use events::{ChannelSink, EventSink, ExportEvent, LogSink, RecordingSink};
pub use options::{ExportConfig, ExportOptions};

use crate::browser::LivePage;
use crate::capture::{self, CaptureServices, GlyphFonts, HttpFetcher, ImageFetcher};
use crate::document::{Delivered, DocumentEmitter};
use crate::error::{ExportError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    Idle,
    Running,
}

/// The single in-flight gate
#[derive(Debug)]
pub struct ExportState {
    phase: Mutex<ExportPhase>,
}

impl Default for ExportState {
    fn default() -> Self {
        Self {
            phase: Mutex::new(ExportPhase::Idle),
        }
    }
}

impl ExportState {
    pub fn phase(&self) -> ExportPhase {
        *self.phase.lock()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == ExportPhase::Running
    }

    /// Move to `Running` unless a run is in flight.
    ///
    /// The returned guard moves back to `Idle` when dropped, whatever the
    /// outcome of the run.
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        let mut phase = self.phase.lock();
        if *phase == ExportPhase::Running {
            return None;
        }
        *phase = ExportPhase::Running;
        Some(RunGuard {
            state: Arc::clone(self),
        })
    }
}

pub struct RunGuard {
    state: Arc<ExportState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *self.state.phase.lock() = ExportPhase::Idle;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartResponse {
    Started,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PingResponse {
    Pong,
}

struct Pipeline {
    page: Arc<dyn LivePage>,
    fetcher: Arc<dyn ImageFetcher>,
    fonts: Arc<GlyphFonts>,
    emitter: DocumentEmitter,
    options: ExportOptions,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    fn progress(&self, line: &str) {
        log::info!("{}", line);
        self.sink.emit(ExportEvent::log(line));
    }

    async fn run(&self, config: ExportConfig) -> Result<Delivered> {
        let progress = |line: &str| self.progress(line);
        let services = CaptureServices {
            page: self.page.as_ref(),
            fetcher: self.fetcher.as_ref(),
            fonts: self.fonts.as_ref(),
        };

        let snapshot = capture::capture_snapshot(services, &self.options, config, &progress).await?;

        self.progress("Generating Word document...");
        let delivered = self.emitter.emit(&snapshot).await?;
        self.progress("Done!");
        Ok(delivered)
    }
}

/// Export engine bound to one page
#[derive(Clone)]
pub struct Exporter {
    pipeline: Arc<Pipeline>,
    state: Arc<ExportState>,
    runtime: Handle,
}

/// Assembles an [`Exporter`]; unset collaborators get their defaults
pub struct ExporterBuilder {
    page: Arc<dyn LivePage>,
    options: ExportOptions,
    sink: Arc<dyn EventSink>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    fonts: Option<GlyphFonts>,
    emitter: Option<DocumentEmitter>,
    runtime: Option<Handle>,
}

impl ExporterBuilder {
    pub fn options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn fonts(mut self, fonts: GlyphFonts) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn emitter(mut self, emitter: DocumentEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate the options, load fonts and announce readiness
    pub fn build(self) -> Result<Exporter> {
        self.options.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| ExportError::Runtime(e.to_string()))?,
        };
        let fetcher: Arc<dyn ImageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(self.options.resource_timeout())?),
        };
        let fonts = match self.fonts {
            Some(fonts) => fonts,
            None => GlyphFonts::load(&self.options)?,
        };
        let emitter = self.emitter.unwrap_or_else(|| DocumentEmitter::docx(&self.options));

        let exporter = Exporter {
            pipeline: Arc::new(Pipeline {
                page: self.page,
                fetcher,
                fonts: Arc::new(fonts),
                emitter,
                options: self.options,
                sink: self.sink,
            }),
            state: Arc::new(ExportState::default()),
            runtime,
        };
        exporter.pipeline.sink.emit(ExportEvent::EngineReady);
        Ok(exporter)
    }
}

impl Exporter {
    pub fn builder(page: Arc<dyn LivePage>) -> ExporterBuilder {
        ExporterBuilder {
            page,
            options: ExportOptions::default(),
            sink: Arc::new(LogSink),
            fetcher: None,
            fonts: None,
            emitter: None,
            runtime: None,
        }
    }

    /// Exporter with default collaborators; must be called inside a runtime
    pub fn new(page: Arc<dyn LivePage>, options: ExportOptions, sink: Arc<dyn EventSink>) -> Result<Self> {
        Self::builder(page).options(options).sink(sink).build()
    }

    pub fn ping(&self) -> PingResponse {
        PingResponse::Pong
    }

    pub fn phase(&self) -> ExportPhase {
        self.state.phase()
    }

    pub fn options(&self) -> &ExportOptions {
        &self.pipeline.options
    }

    /// Begin a capture unless one is in flight; never waits for it
    pub fn start_export(&self, config: ExportConfig) -> StartResponse {
        let Some(guard) = self.state.try_begin() else {
            self.pipeline.progress("Export already in progress, please wait...");
            return StartResponse::Busy;
        };

        let pipeline = Arc::clone(&self.pipeline);
        pipeline.sink.emit(ExportEvent::ExportStart);
        self.runtime.spawn(async move {
            let outcome = pipeline.run(config).await;
            // Idle before the terminal event, so its receiver may start again
            drop(guard);
            match outcome {
                Ok(delivered) => pipeline.sink.emit(ExportEvent::ExportDone {
                    file_name: delivered.file_name,
                    location: delivered.location,
                }),
                Err(e) => {
                    log::error!("Export failed: {}", e);
                    pipeline.sink.emit(ExportEvent::ExportError { message: e.to_string() });
                }
            }
        });

        StartResponse::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticPage;
    use crate::capture::FetchedImage;
    use crate::document::{AltChunkDocx, MemoryDelivery, PageSetup};
    use crate::dom::{CapturedNode, CapturedPage};
    use async_trait::async_trait;
    use url::Url;

    struct NoFetch;

    #[async_trait]
    impl ImageFetcher for NoFetch {
        async fn fetch(&self, url: &Url, _referrer: Option<&Url>) -> Result<FetchedImage> {
            Err(ExportError::FetchFailed {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn page() -> Arc<dyn LivePage> {
        Arc::new(StaticPage::new(CapturedPage {
            url: "https://example.com/".to_string(),
            title: "Test".to_string(),
            body: CapturedNode::element("body")
                .with_child(CapturedNode::element("p").with_child(CapturedNode::text("Hello"))),
        }))
    }

    fn exporter(sink: Arc<dyn EventSink>) -> (Exporter, Arc<MemoryDelivery>) {
        let delivery = Arc::new(MemoryDelivery::default());
        let exporter = Exporter::builder(page())
            .sink(sink)
            .fetcher(Arc::new(NoFetch))
            .fonts(GlyphFonts::empty())
            .emitter(DocumentEmitter::new(Arc::new(AltChunkDocx), delivery.clone(), PageSetup::default()))
            .build()
            .unwrap();
        (exporter, delivery)
    }

    #[test]
    fn test_state_gate() {
        let state = Arc::new(ExportState::default());
        let guard = state.try_begin().unwrap();
        assert!(state.is_running());
        assert!(state.try_begin().is_none());
        drop(guard);
        assert_eq!(state.phase(), ExportPhase::Idle);
        assert!(state.try_begin().is_some());
    }

    #[test]
    fn test_response_wire_format() {
        assert_eq!(serde_json::to_value(StartResponse::Busy).unwrap(), serde_json::json!({"status": "busy"}));
        assert_eq!(
            serde_json::to_value(StartResponse::Started).unwrap(),
            serde_json::json!({"status": "started"})
        );
        assert_eq!(serde_json::to_value(PingResponse::Pong).unwrap(), serde_json::json!({"status": "pong"}));
    }

    #[test]
    fn test_build_requires_runtime() {
        let result = Exporter::builder(page())
            .fetcher(Arc::new(NoFetch))
            .fonts(GlyphFonts::empty())
            .build();
        assert!(matches!(result, Err(ExportError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_engine_ready_on_build() {
        let sink = Arc::new(RecordingSink::default());
        let (exporter, _) = exporter(sink.clone());
        assert_eq!(sink.events(), vec![ExportEvent::EngineReady]);
        assert_eq!(exporter.ping(), PingResponse::Pong);
        assert_eq!(exporter.phase(), ExportPhase::Idle);
    }

    #[tokio::test]
    async fn test_export_runs_to_done() {
        let (sink, mut events) = ChannelSink::new();
        let (exporter, delivery) = exporter(Arc::new(sink));

        assert_eq!(exporter.start_export(ExportConfig::default()), StartResponse::Started);
        assert_eq!(exporter.start_export(ExportConfig::default()), StartResponse::Busy);

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let finished = event.is_terminal();
            seen.push(event);
            if finished {
                break;
            }
        }

        assert_eq!(seen[0], ExportEvent::EngineReady);
        assert_eq!(seen[1], ExportEvent::ExportStart);
        assert!(seen.contains(&ExportEvent::log("Export already in progress, please wait...")));
        assert!(seen.contains(&ExportEvent::log("Done!")));
        assert!(matches!(seen.last(), Some(ExportEvent::ExportDone { .. })));
        assert_eq!(delivery.files().len(), 1);
        assert_eq!(exporter.phase(), ExportPhase::Idle);
    }

    /// Starts the next export from inside the terminal event
    struct RestartSink {
        exporter: Mutex<Option<Exporter>>,
        restarts: Mutex<Vec<StartResponse>>,
        done: tokio::sync::Notify,
    }

    impl EventSink for RestartSink {
        fn emit(&self, event: ExportEvent) {
            if !event.is_terminal() {
                return;
            }
            let exporter = self.exporter.lock().take();
            if let Some(exporter) = exporter {
                self.restarts.lock().push(exporter.start_export(ExportConfig::default()));
                self.done.notify_one();
            }
        }
    }

    #[tokio::test]
    async fn test_restart_from_terminal_event_is_accepted() {
        let sink = Arc::new(RestartSink {
            exporter: Mutex::new(None),
            restarts: Mutex::new(Vec::new()),
            done: tokio::sync::Notify::new(),
        });
        let (exporter, _) = exporter(sink.clone());
        *sink.exporter.lock() = Some(exporter.clone());

        assert_eq!(exporter.start_export(ExportConfig::default()), StartResponse::Started);
        sink.done.notified().await;

        assert_eq!(sink.restarts.lock().as_slice(), &[StartResponse::Started]);
    }
}
