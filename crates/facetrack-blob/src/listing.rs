//! Container listing and block list documents.

use serde::{Deserialize, Serialize};

use crate::error::{BlobError, BlobResult};

/// A blob returned by a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

impl BlobItem {
    /// True for analysis result documents.
    pub fn is_json(&self) -> bool {
        self.name.ends_with(".json")
    }
}

/// One page of a container listing.
#[derive(Debug, Clone, Default)]
pub struct BlobPage {
    pub blobs: Vec<BlobItem>,
    /// Marker for the next page, absent on the last page
    pub next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: BlobsElement,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobsElement {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEntry {
    name: String,
    #[serde(default)]
    properties: Option<BlobProperties>,
}

#[derive(Debug, Deserialize)]
struct BlobProperties {
    #[serde(rename = "Content-Length", default)]
    content_length: Option<u64>,
    #[serde(rename = "Content-Type", default)]
    content_type: Option<String>,
}

/// Parse a `List Blobs` response body.
pub fn parse_list_response(xml: &str) -> BlobResult<BlobPage> {
    let results: EnumerationResults =
        quick_xml::de::from_str(xml).map_err(|e| BlobError::InvalidListing(e.to_string()))?;

    let blobs = results
        .blobs
        .blob
        .into_iter()
        .map(|entry| {
            let (content_length, content_type) = match entry.properties {
                Some(p) => (p.content_length, p.content_type),
                None => (None, None),
            };
            BlobItem {
                name: entry.name,
                content_length,
                content_type,
            }
        })
        .collect();

    Ok(BlobPage {
        blobs,
        next_marker: results.next_marker.filter(|m| !m.is_empty()),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename = "BlockList")]
struct BlockList<'a> {
    #[serde(rename = "Latest")]
    latest: &'a [String],
}

/// Body of a `Put Block List` request committing `block_ids` in order.
pub fn block_list_xml(block_ids: &[String]) -> BlobResult<String> {
    let body = quick_xml::se::to_string(&BlockList { latest: block_ids })
        .map_err(|e| BlobError::config_error(format!("failed to encode block list: {}", e)))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>{}", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_with_marker() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://sto.blob.core.windows.net/" ContainerName="asset-out">
  <Blobs>
    <Blob>
      <Name>clip_annotations.json</Name>
      <Properties>
        <Last-Modified>Fri, 16 Oct 2026 10:00:00 GMT</Last-Modified>
        <Content-Length>2048</Content-Length>
        <Content-Type>application/octet-stream</Content-Type>
        <BlobType>BlockBlob</BlobType>
      </Properties>
    </Blob>
    <Blob>
      <Name>clip_thumb.jpg</Name>
      <Properties>
        <Content-Length>512</Content-Length>
      </Properties>
    </Blob>
  </Blobs>
  <NextMarker>2!8!abc</NextMarker>
</EnumerationResults>"#;

        let page = parse_list_response(xml).unwrap();
        assert_eq!(page.blobs.len(), 2);
        assert_eq!(page.blobs[0].name, "clip_annotations.json");
        assert_eq!(page.blobs[0].content_length, Some(2048));
        assert!(page.blobs[0].is_json());
        assert!(!page.blobs[1].is_json());
        assert_eq!(page.next_marker.as_deref(), Some("2!8!abc"));
    }

    #[test]
    fn test_parse_last_page() {
        let xml = r#"<EnumerationResults ContainerName="asset-out"><Blobs><Blob><Name>a.json</Name></Blob></Blobs><NextMarker /></EnumerationResults>"#;

        let page = parse_list_response(xml).unwrap();
        assert_eq!(page.blobs.len(), 1);
        assert_eq!(page.blobs[0].content_length, None);
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_parse_truncated_body_is_error() {
        assert!(matches!(
            parse_list_response("<EnumerationResults><Blobs><Blob>"),
            Err(BlobError::InvalidListing(_))
        ));
    }

    #[test]
    fn test_block_list_xml() {
        let ids = vec!["YmxvY2stMDAwMDAw".to_string(), "YmxvY2stMDAwMDAx".to_string()];
        assert_eq!(
            block_list_xml(&ids).unwrap(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><BlockList><Latest>YmxvY2stMDAwMDAw</Latest><Latest>YmxvY2stMDAwMDAx</Latest></BlockList>"
        );
    }
}
