//! Channel map decoding for `view_channel_map.cgi`.
//!
//! The device serves the map in two shapes:
//!
//! - An HTML summary (`?page=1`) that carries the total channel count as
//!   `1 to 50 of N`.
//! - XML pages (`?page=P&xml=1`). Page 0 holds up to [`XML_PAGE_CAPACITY`]
//!   entries; anything beyond that lives on [`CONTINUATION_PAGE`].
//!
//! Channel names are base64-encoded ASCII.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ChannelMapError;

/// Number of entries the first XML page can hold.
pub const XML_PAGE_CAPACITY: usize = 1024;

/// Page that carries the entries past [`XML_PAGE_CAPACITY`].
pub const CONTINUATION_PAGE: u32 = 21;

/// A decoded channel map entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    pub callsign: String,
    pub number: String,
    pub eia: String,
    pub source_id: String,
}

/// Result of decoding one XML page.
#[derive(Debug, Default)]
pub struct ChannelPage {
    /// Entries decoded successfully, in document order.
    pub entries: Vec<ChannelEntry>,
    /// Entries that were skipped.
    pub rejected: Vec<ChannelMapError>,
}

#[derive(Debug, Deserialize)]
struct RawChannelMap {
    #[serde(rename = "channel", default)]
    channels: Vec<RawChannel>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(default)]
    name: String,
    #[serde(default)]
    number: String,
    #[serde(default)]
    eia: String,
    #[serde(default)]
    sourceid: String,
}

/// Read the total channel count from the HTML summary page.
pub fn parse_channel_count(summary: &str) -> Option<usize> {
    static COUNT_RE: OnceLock<Regex> = OnceLock::new();
    let re = COUNT_RE.get_or_init(|| Regex::new(r"1 to 50 of (\d+)").expect("static regex"));
    re.captures(summary)?.get(1)?.as_str().parse().ok()
}

/// XML pages to request for a map of `total` channels.
///
/// The continuation page is requested at most once.
pub fn channel_map_pages(total: usize) -> Vec<u32> {
    let mut pages = vec![0];
    if total > XML_PAGE_CAPACITY {
        pages.push(CONTINUATION_PAGE);
    }
    pages
}

/// Decode a base64 channel name into ASCII text.
pub fn decode_channel_name(encoded: &str) -> Result<String, String> {
    let bytes = STANDARD
        .decode(encoded.trim().as_bytes())
        .map_err(|e| e.to_string())?;
    if !bytes.is_ascii() {
        return Err("name is not ASCII".to_string());
    }
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Decode one XML page of the channel map.
pub fn decode_channel_page(xml: &str) -> Result<ChannelPage, ChannelMapError> {
    let raw: RawChannelMap =
        quick_xml::de::from_str(xml).map_err(|e| ChannelMapError::Xml(e.to_string()))?;

    let mut page = ChannelPage::default();
    for channel in raw.channels {
        match decode_channel_name(&channel.name) {
            Ok(name) => page.entries.push(ChannelEntry {
                callsign: name.clone(),
                name,
                number: channel.number,
                eia: channel.eia,
                source_id: channel.sourceid,
            }),
            Err(reason) => page.rejected.push(ChannelMapError::Name {
                number: channel.number,
                reason,
            }),
        }
    }

    Ok(page)
}
