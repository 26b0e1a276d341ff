use crate::capture::{ResolvedImage, VisualAsset};
use crate::dom::{Document, ElementData, SnapshotLookup};

/// Replace each rasterized element with an `<img>` of its asset.
///
/// Assets whose element is gone (pruned, or inside an element replaced
/// earlier) are dropped. Returns the number of replacements.
pub fn apply_visual_assets(doc: &mut Document, assets: &[VisualAsset]) -> usize {
    let lookup = SnapshotLookup::build(doc);
    let mut applied = 0;

    for asset in assets {
        let Some(target) = lookup.find(doc, asset.id) else {
            log::debug!("No snapshot element for visual {}", asset.id);
            continue;
        };
        if target == doc.root() {
            continue;
        }

        let img = doc.create_element_with(
            ElementData::new("img")
                .with_attribute("src", asset.data_url.as_str())
                .with_attribute("width", asset.width.to_string())
                .with_attribute("height", asset.height.to_string())
                .with_attribute("style", "vertical-align:middle;"),
        );
        doc.replace(target, img);
        applied += 1;
    }
    applied
}

/// Point each resolved `<img>` at its embedded source.
///
/// `srcset` and `loading` are dropped so the data URI is the only source.
pub fn apply_resolved_images(doc: &mut Document, images: &[ResolvedImage]) -> usize {
    let lookup = SnapshotLookup::build(doc);
    let mut applied = 0;

    for image in images {
        let Some(target) = lookup.find(doc, image.id).filter(|&node| doc.is_tag(node, "img")) else {
            log::debug!("No snapshot image for {}", image.id);
            continue;
        };
        doc.set_attr(target, "src", image.data_url.as_str());
        doc.remove_attr(target, "srcset");
        doc.remove_attr(target, "loading");
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{CorrelationId, NodeIndex};

    fn snapshot() -> Document {
        let mut doc = Document::new("body");
        let root = doc.root();
        let p = doc.create_element("p");
        let icon = doc.create_element_with(ElementData::new("i").with_attribute("class", "fa fa-star"));
        let container = doc.create_element("mjx-container");
        let svg = doc.create_element("svg");
        let img = doc.create_element_with(
            ElementData::new("img")
                .with_attribute("src", "https://example.com/a.png")
                .with_attribute("srcset", "a.png 1x, a@2x.png 2x")
                .with_attribute("loading", "lazy"),
        );
        doc.append(root, p);
        doc.append(p, icon);
        doc.append(p, container);
        doc.append(container, svg);
        doc.append(root, img);
        NodeIndex::assign(&mut doc);
        doc
    }

    fn id_of(doc: &Document, tag: &str) -> CorrelationId {
        doc.correlation_id(doc.elements_by_tag(tag)[0]).unwrap()
    }

    fn asset(id: CorrelationId) -> VisualAsset {
        VisualAsset {
            id,
            data_url: "data:image/png;base64,AAAA".to_string(),
            width: 16,
            height: 14,
        }
    }

    #[test]
    fn test_visual_replaces_element() {
        let mut doc = snapshot();
        let id = id_of(&doc, "i");
        assert_eq!(apply_visual_assets(&mut doc, &[asset(id)]), 1);

        let p = doc.elements_by_tag("p")[0];
        assert!(doc.elements_by_tag("i").is_empty());
        assert!(doc.inner_html(p).starts_with(
            "<img src=\"data:image/png;base64,AAAA\" width=\"16\" height=\"14\" style=\"vertical-align:middle;\">"
        ));
    }

    #[test]
    fn test_nested_asset_after_container_is_dropped() {
        let mut doc = snapshot();
        let container = id_of(&doc, "mjx-container");
        let svg = id_of(&doc, "svg");

        assert_eq!(apply_visual_assets(&mut doc, &[asset(container), asset(svg)]), 1);
        assert!(doc.elements_by_tag("svg").is_empty());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut doc = snapshot();
        assert_eq!(apply_visual_assets(&mut doc, &[asset(CorrelationId(999))]), 0);
        assert_eq!(
            apply_resolved_images(
                &mut doc,
                &[ResolvedImage {
                    id: CorrelationId(999),
                    data_url: "data:x".to_string()
                }]
            ),
            0
        );
    }

    #[test]
    fn test_resolved_image_updates_attributes() {
        let mut doc = snapshot();
        let id = id_of(&doc, "img");
        let applied = apply_resolved_images(
            &mut doc,
            &[ResolvedImage {
                id,
                data_url: "data:image/png;base64,BBBB".to_string(),
            }],
        );
        assert_eq!(applied, 1);

        let img = doc.elements_by_tag("img")[0];
        assert_eq!(doc.attr(img, "src"), Some("data:image/png;base64,BBBB"));
        assert_eq!(doc.attr(img, "srcset"), None);
        assert_eq!(doc.attr(img, "loading"), None);
    }

    #[test]
    fn test_resolved_image_requires_img_target() {
        let mut doc = snapshot();
        let id = id_of(&doc, "p");
        let applied = apply_resolved_images(
            &mut doc,
            &[ResolvedImage {
                id,
                data_url: "data:image/png;base64,BBBB".to_string(),
            }],
        );
        assert_eq!(applied, 0);
        assert_eq!(doc.attr(doc.elements_by_tag("p")[0], "src"), None);
    }
}
