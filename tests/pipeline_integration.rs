use async_trait::async_trait;
use page_docx::browser::{BrowserSession, GlyphRequest, LaunchOptions, LivePage, StaticPage};
use page_docx::capture::sanitize::prune_empty_containers;
use page_docx::capture::{CaptureServices, FetchedImage, GlyphFonts, ImageFetcher, Snapshot, capture_snapshot};
use page_docx::dom::{CapturedNode, CapturedPage, LiveDocument, PseudoStyle, RenderInfo};
use page_docx::export::{ChannelSink, EventSink, ExportEvent, ExportPhase, RecordingSink};
use page_docx::tools::{ToolContext, ToolRegistry};
use page_docx::{ExportConfig, ExportError, ExportOptions, Exporter, Result, StartResponse};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Serves `image/png` bodies for URLs containing "ok", fails everything else
#[derive(Default)]
struct MockFetcher {
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url, _referrer: Option<&Url>) -> Result<FetchedImage> {
        self.requested.lock().push(url.to_string());
        if url.as_str().contains("ok") {
            Ok(FetchedImage::new(Some("image/png"), vec![0x89, b'P', b'N', b'G', 1, 2, 3]))
        } else {
            Err(ExportError::FetchFailed {
                url: url.to_string(),
                reason: "HTTP 404".to_string(),
            })
        }
    }
}

fn page(body: CapturedNode) -> StaticPage {
    StaticPage::new(CapturedPage {
        url: "https://example.com/articles/42".to_string(),
        title: "Article".to_string(),
        body,
    })
}

fn paragraph(text: &str) -> CapturedNode {
    CapturedNode::element("p")
        .with_render(RenderInfo::new(600.0, 20.0))
        .with_child(CapturedNode::text(text))
}

async fn capture(page: &StaticPage, fetcher: &MockFetcher) -> Snapshot {
    let fonts = GlyphFonts::empty();
    let services = CaptureServices {
        page,
        fetcher,
        fonts: &fonts,
    };
    capture_snapshot(services, &ExportOptions::default(), ExportConfig::default(), &|_: &str| {})
        .await
        .unwrap()
}

fn html(snapshot: &Snapshot) -> String {
    snapshot.doc.inner_html(snapshot.doc.root())
}

#[tokio::test]
async fn test_inline_formula_renders_as_math() {
    let page = page(CapturedNode::element("body").with_child(paragraph("Cost is $5 and $x+y=5$ inline")));
    let snapshot = capture(&page, &MockFetcher::default()).await;
    let html = html(&snapshot);

    assert!(html.contains("<math"), "{}", html);
    assert!(html.contains("display=\"inline\""));
    assert!(html.contains("Cost is $5 and "));
    assert!(!html.contains("$x+y=5$"));
    assert_eq!(snapshot.stats.formulas, 1);
}

#[tokio::test]
async fn test_lazy_image_resolved_from_data_src() {
    let page = page(
        CapturedNode::element("body").with_child(
            CapturedNode::element("img")
                .with_attribute("src", "data:image/gif;base64,R0lGODlhAQABAAAAACw=")
                .with_attribute("data-src", "/media/ok.png")
                .with_render(RenderInfo::new(1.0, 1.0)),
        ),
    );
    let fetcher = MockFetcher::default();
    let snapshot = capture(&page, &fetcher).await;

    assert_eq!(fetcher.requested()[0], "https://example.com/media/ok.png");
    let img = snapshot.doc.elements_by_tag("img")[0];
    assert!(snapshot.doc.attr(img, "src").unwrap().starts_with("data:image/png;base64,"));
    assert_eq!(snapshot.stats.images_resolved, 1);
}

#[tokio::test]
async fn test_large_data_uri_kept_verbatim() {
    let data_url = format!("data:image/png;base64,{}", "A".repeat(2100));
    let page = page(
        CapturedNode::element("body")
            .with_child(CapturedNode::element("img").with_attribute("src", data_url.as_str())),
    );
    let fetcher = MockFetcher::default();
    let snapshot = capture(&page, &fetcher).await;

    let img = snapshot.doc.elements_by_tag("img")[0];
    assert_eq!(snapshot.doc.attr(img, "src"), Some(data_url.as_str()));
    assert!(fetcher.requested().is_empty());
}

#[tokio::test]
async fn test_no_remote_image_survives() {
    let page = page(
        CapturedNode::element("body")
            .with_child(
                CapturedNode::element("img")
                    .with_attribute("src", "https://cdn.example.com/missing.png")
                    .with_attribute("alt", "Chart"),
            )
            .with_child(paragraph("text"))
            .with_child(CapturedNode::element("img").with_attribute("src", "/also-missing.png"))
            .with_child(CapturedNode::element("img").with_attribute("src", "https://cdn.example.com/ok.png")),
    );
    let snapshot = capture(&page, &MockFetcher::default()).await;

    let images = snapshot.doc.elements_by_tag("img");
    assert_eq!(images.len(), 1);
    for img in images {
        assert!(snapshot.doc.attr(img, "src").unwrap().starts_with("data:"));
    }
    assert!(html(&snapshot).contains(" [Image: Chart] "));
}

#[tokio::test]
async fn test_sanitized_snapshot_shape() {
    let body = CapturedNode::element("body")
        .with_child(
            CapturedNode::element("p")
                .with_child(CapturedNode::text("a"))
                .with_child(CapturedNode::element("br"))
                .with_child(CapturedNode::text(" "))
                .with_child(CapturedNode::element("br"))
                .with_child(CapturedNode::text("b")),
        )
        .with_child(
            CapturedNode::element("div")
                .with_child(CapturedNode::element("div").with_child(CapturedNode::element("span")))
                .with_child(CapturedNode::text("  ")),
        )
        .with_child(CapturedNode::element("script").with_child(CapturedNode::text("alert(1)")))
        .with_child(
            CapturedNode::element("a")
                .with_attribute("href", "/next")
                .with_attribute("onclick", "track()")
                .with_child(CapturedNode::text("next")),
        )
        .with_child(
            CapturedNode::element("p")
                .with_render(RenderInfo::new(0.0, 0.0).with_style("display", "none"))
                .with_child(CapturedNode::text("hidden")),
        );
    let mut snapshot = capture(&page(body), &MockFetcher::default()).await;
    let html = html(&snapshot);

    assert_eq!(snapshot.doc.elements_by_tag("br").len(), 1);
    assert!(snapshot.doc.elements_by_tag("div").is_empty());
    assert!(snapshot.doc.elements_by_tag("span").is_empty());
    assert!(!html.contains("alert"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("hidden"));
    assert!(html.contains("href=\"https://example.com/next\""));

    assert_eq!(prune_empty_containers(&mut snapshot.doc), 0);
}

fn exporter_with(sink: Arc<dyn EventSink>, out_dir: &std::path::Path) -> Exporter {
    let page = page(CapturedNode::element("body").with_child(paragraph("Hello")));
    Exporter::builder(Arc::new(page))
        .options(ExportOptions::default().output_dir(out_dir))
        .sink(sink)
        .fetcher(Arc::new(MockFetcher::default()))
        .fonts(GlyphFonts::empty())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_export_writes_docx_and_gates_second_start() {
    let tmp = tempfile::tempdir().unwrap();
    let (sink, mut events) = ChannelSink::new();
    let exporter = exporter_with(Arc::new(sink), tmp.path());

    assert_eq!(exporter.start_export(ExportConfig::default()), StartResponse::Started);
    assert_eq!(exporter.start_export(ExportConfig::new(true)), StartResponse::Busy);

    let done = loop {
        match events.recv().await.unwrap() {
            ExportEvent::ExportDone { file_name, location } => break (file_name, location),
            ExportEvent::ExportError { message } => panic!("export failed: {}", message),
            _ => {}
        }
    };

    assert!(done.0.starts_with("Page_Export_"));
    let bytes = std::fs::read(tmp.path().join(&done.0)).unwrap();
    assert_eq!(&bytes[..4], b"PK\x03\x04");

    assert_eq!(exporter.phase(), ExportPhase::Idle);
    assert_eq!(exporter.start_export(ExportConfig::default()), StartResponse::Started);
}

/// Restarts the exporter synchronously when it reports completion
#[derive(Default)]
struct RestartOnDone {
    exporter: Mutex<Option<Exporter>>,
    restart: Mutex<Option<StartResponse>>,
}

impl EventSink for RestartOnDone {
    fn emit(&self, event: ExportEvent) {
        if let ExportEvent::ExportDone { .. } = event {
            let exporter = self.exporter.lock().take();
            if let Some(exporter) = exporter {
                *self.restart.lock() = Some(exporter.start_export(ExportConfig::default()));
            }
        }
    }
}

#[tokio::test]
async fn test_start_export_accepted_from_done_event() {
    let tmp = tempfile::tempdir().unwrap();
    let (channel, mut events) = ChannelSink::new();
    let restart = Arc::new(RestartOnDone::default());
    let sinks: Vec<Arc<dyn EventSink>> = vec![restart.clone(), Arc::new(channel)];
    let sink = Arc::new(Fanout(sinks));
    let exporter = exporter_with(sink, tmp.path());
    *restart.exporter.lock() = Some(exporter.clone());

    assert_eq!(exporter.start_export(ExportConfig::default()), StartResponse::Started);
    while !events.recv().await.unwrap().is_terminal() {}

    assert_eq!(*restart.restart.lock(), Some(StartResponse::Started));
}

/// Delivers every event to each inner sink in order
struct Fanout(Vec<Arc<dyn EventSink>>);

impl EventSink for Fanout {
    fn emit(&self, event: ExportEvent) {
        for sink in &self.0 {
            sink.emit(event.clone());
        }
    }
}

/// Replayed page that can draw glyphs the way a browser canvas would
struct CanvasPage(StaticPage);

#[async_trait]
impl LivePage for CanvasPage {
    async fn auto_scroll(&self) -> Result<()> {
        self.0.auto_scroll().await
    }

    async fn capture(&self) -> Result<LiveDocument> {
        self.0.capture().await
    }

    async fn decode_image(&self, src: &Url, timeout: Duration) -> Result<String> {
        self.0.decode_image(src, timeout).await
    }

    async fn draw_glyph(&self, glyph: &GlyphRequest) -> Result<String> {
        assert!(glyph.font.contains("Font Awesome"));
        Ok("data:image/png;base64,aWNvbg==".to_string())
    }
}

#[tokio::test]
async fn test_icon_glyph_embedded_with_default_options() {
    let icon = CapturedNode::element("i")
        .with_attribute("class", "fa fa-user")
        .with_render(RenderInfo::new(14.0, 14.0).with_before(PseudoStyle {
            content: "\"\u{f007}\"".to_string(),
            font_family: "\"Font Awesome 6 Free\"".to_string(),
            font_size: "14px".to_string(),
            font_weight: "900".to_string(),
            color: "rgb(0, 0, 0)".to_string(),
        }));
    let page = CanvasPage(page(CapturedNode::element("body").with_child(paragraph("Profile")).with_child(icon)));
    let options = ExportOptions::default();
    let fonts = GlyphFonts::load(&options).unwrap();
    let fetcher = MockFetcher::default();
    let services = CaptureServices {
        page: &page,
        fetcher: &fetcher,
        fonts: &fonts,
    };
    let snapshot = capture_snapshot(services, &options, ExportConfig::default(), &|_: &str| {})
        .await
        .unwrap();

    assert_eq!(snapshot.stats.visuals, 1);
    assert!(snapshot.doc.elements_by_tag("i").is_empty());
    let images = snapshot.doc.elements_by_tag("img");
    assert_eq!(images.len(), 1);
    assert_eq!(snapshot.doc.attr(images[0], "src"), Some("data:image/png;base64,aWNvbg=="));
}

#[tokio::test]
async fn test_failed_delivery_reports_export_error() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let (sink, mut events) = ChannelSink::new();
    let exporter = exporter_with(Arc::new(sink), &blocker);
    exporter.start_export(ExportConfig::default());

    let event = loop {
        let event = events.recv().await.unwrap();
        if event.is_terminal() {
            break event;
        }
    };
    assert!(matches!(event, ExportEvent::ExportError { message } if message.contains("delivery failed")));
}

#[tokio::test]
async fn test_tools_drive_the_exporter() {
    let tmp = tempfile::tempdir().unwrap();
    let events = Arc::new(RecordingSink::default());
    let exporter = exporter_with(events.clone(), tmp.path());
    let registry = ToolRegistry::with_defaults();
    let mut context = ToolContext::new(&exporter);

    let ping = registry.execute("ping", serde_json::json!({}), &mut context).unwrap();
    assert_eq!(ping.data.unwrap()["status"], "pong");

    let started = registry
        .execute("start_export", serde_json::json!({"autoScroll": false}), &mut context)
        .unwrap();
    assert!(started.success);
    let busy = registry.execute("start_export", serde_json::json!({}), &mut context).unwrap();
    assert!(!busy.success);
    assert_eq!(busy.data.unwrap()["status"], "busy");

    let navigate = registry.execute("navigate", serde_json::json!({"url": "example.com"}), &mut context);
    assert!(matches!(navigate, Err(ExportError::Unsupported(_))));
    assert!(matches!(
        registry.execute("click", serde_json::json!({}), &mut context),
        Err(ExportError::UnknownTool(_))
    ));
    assert!(matches!(
        registry.execute("navigate", serde_json::json!({}), &mut context),
        Err(ExportError::InvalidParameters(_))
    ));
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_export_live_page() {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    let html = "<html><body><h1>Report</h1><p>Energy: $E=mc^2$</p><script>var x = 1;</script></body></html>";
    session
        .navigate(&format!("data:text/html,{}", urlencoding::encode(html)))
        .expect("Failed to navigate");
    session.wait_for_navigation().expect("Navigation did not finish");

    let page = session.page().expect("No page");
    let live = page.capture().await.expect("Capture failed");
    assert!(live.doc.find_descendant_by_tag(live.doc.root(), "h1").is_some());

    let tmp = tempfile::tempdir().unwrap();
    let (sink, mut events) = ChannelSink::new();
    let exporter = Exporter::new(
        Arc::new(page),
        ExportOptions::default().output_dir(tmp.path()),
        Arc::new(sink),
    )
    .expect("Failed to build exporter");
    exporter.start_export(ExportConfig::new(true));

    loop {
        match events.recv().await.expect("event channel closed") {
            ExportEvent::ExportDone { location, .. } => {
                assert!(std::path::Path::new(&location).exists());
                break;
            }
            ExportEvent::ExportError { message } => panic!("export failed: {}", message),
            _ => {}
        }
    }
}
