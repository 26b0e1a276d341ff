//! Resolving every `<img>` to an embedded `data:` source.
//!
//! Per image: pick the effective source (lazy-load attributes replace
//! placeholders), accept large data URIs as they are, then try an in-page
//! decode, a fetch without referrer and a fetch with the page as referrer.

use crate::browser::LivePage;
use crate::capture::{ImageFetcher, ItemOutcome, ResolvedImage, is_data_url};
use crate::dom::{CorrelationId, Document, LiveDocument, NodeId};
use crate::export::ExportOptions;
use futures::StreamExt;
use std::time::Duration;
use url::Url;

/// Data URIs shorter than this are treated as tracking pixels or placeholders
pub const EMBEDDED_DATA_FLOOR: usize = 2000;

/// Attributes lazy-loading libraries keep the real source in, by priority
pub const LAZY_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-original",
    "data-original-src",
    "data-url",
    "data-lazy-src",
];

const SPACER_PATTERN: &str = "spacer.gif";

/// Whether a `src` value stands in for an image that is not loaded yet
pub fn is_placeholder(src: Option<&str>) -> bool {
    match src.map(str::trim) {
        None | Some("") => true,
        Some(src) if is_data_url(src) => src.len() < EMBEDDED_DATA_FLOOR,
        Some(src) => src.contains(SPACER_PATTERN),
    }
}

/// Resolve a reference against the page URL; data URIs are kept verbatim
pub fn absolutize(reference: &str, base: Option<&Url>) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if is_data_url(reference) {
        return Some(reference.to_string());
    }
    match base {
        Some(base) => base.join(reference).ok().map(String::from),
        None => Url::parse(reference).ok().map(String::from),
    }
}

/// The source an image should be resolved from
pub fn effective_source(doc: &Document, img: NodeId, base: Option<&Url>) -> Option<String> {
    let src = doc.attr(img, "src");
    if is_placeholder(src) {
        let lazy = LAZY_ATTRIBUTES
            .iter()
            .filter_map(|name| doc.attr(img, name))
            .find(|value| !value.trim().is_empty());
        if let Some(lazy) = lazy {
            return absolutize(lazy, base);
        }
    }
    src.and_then(|src| absolutize(src, base))
}

/// One image to resolve, detached from the document
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub id: CorrelationId,
    pub source: Option<String>,
}

/// Every indexed `<img>` of the live document with its effective source
pub fn collect_jobs(live: &LiveDocument) -> Vec<ImageJob> {
    live.doc
        .elements_by_tag("img")
        .into_iter()
        .filter_map(|img| {
            let id = live.doc.correlation_id(img)?;
            Some(ImageJob {
                id,
                source: effective_source(&live.doc, img, live.base_url()),
            })
        })
        .collect()
}

/// Resolve all images, at most `options.image_concurrency` at a time.
///
/// Outcomes are returned in document order.
pub async fn resolve_images(
    live: &LiveDocument,
    page: &dyn LivePage,
    fetcher: &dyn ImageFetcher,
    options: &ExportOptions,
    progress: &(dyn Fn(&str) + Send + Sync),
) -> Vec<ItemOutcome<ResolvedImage>> {
    let jobs = collect_jobs(live);
    let total = jobs.len();
    let referrer = live.base_url().cloned();
    let timeout = options.resource_timeout();

    futures::stream::iter(jobs)
        .map(|job| resolve_image(page, fetcher, job, referrer.as_ref(), timeout))
        .buffered(options.image_concurrency.max(1))
        .enumerate()
        .map(|(done, outcome)| {
            if done % 10 == 0 {
                progress(&format!("Processing images: {}/{}", done, total));
            }
            outcome
        })
        .collect()
        .await
}

/// Resolve one image; every failure ends as `Skipped`
pub async fn resolve_image(
    page: &dyn LivePage,
    fetcher: &dyn ImageFetcher,
    job: ImageJob,
    referrer: Option<&Url>,
    timeout: Duration,
) -> ItemOutcome<ResolvedImage> {
    let ImageJob { id, source } = job;
    let Some(source) = source else {
        return ItemOutcome::skipped("no source");
    };

    if is_data_url(&source) {
        return if source.len() >= EMBEDDED_DATA_FLOOR {
            ItemOutcome::Produced(ResolvedImage {
                id,
                data_url: source,
            })
        } else {
            ItemOutcome::skipped("placeholder data URI")
        };
    }

    let url = match Url::parse(&source) {
        Ok(url) => url,
        Err(e) => return ItemOutcome::skipped(format!("invalid source {}: {}", source, e)),
    };

    match page.decode_image(&url, timeout).await {
        Ok(data_url) => return ItemOutcome::Produced(ResolvedImage { id, data_url }),
        Err(e) => log::debug!("In-page decode of {} failed: {}", url, e),
    }

    for referrer in [None, referrer] {
        match fetch_data_url(fetcher, &url, referrer, timeout).await {
            Ok(data_url) => return ItemOutcome::Produced(ResolvedImage { id, data_url }),
            Err(reason) => log::debug!(
                "Fetch of {} ({}) failed: {}",
                url,
                if referrer.is_some() { "with referrer" } else { "no referrer" },
                reason
            ),
        }
    }

    log::warn!("Image {} could not be embedded", url);
    ItemOutcome::skipped(format!("{} could not be decoded or fetched", url))
}

async fn fetch_data_url(
    fetcher: &dyn ImageFetcher,
    url: &Url,
    referrer: Option<&Url>,
    timeout: Duration,
) -> Result<String, String> {
    let body = tokio::time::timeout(timeout, fetcher.fetch(url, referrer))
        .await
        .map_err(|_| format!("timed out after {:?}", timeout))?
        .map_err(|e| e.to_string())?;
    body.to_data_url()
        .ok_or_else(|| "response is not an image".to_string())
}
