//! Channel lineup collection from the device channel map.

use std::sync::Arc;

use log::{debug, error, info, warn};

use ceton_protocol::channel_map::{channel_map_pages, decode_channel_page, parse_channel_count};
use ceton_protocol::{ChannelEntry, ChannelMapError};

use crate::hardware::CetonBackend;

/// HTML page carrying the `1 to 50 of N` summary.
const SUMMARY_PAGE: u32 = 1;

/// Reads the channel lineup of one device.
#[derive(Clone)]
pub struct ChannelCollector {
    backend: Arc<dyn CetonBackend>,
    address: String,
}

impl ChannelCollector {
    pub fn new(backend: Arc<dyn CetonBackend>, address: impl Into<String>) -> Self {
        Self {
            backend,
            address: address.into(),
        }
    }

    /// Collect every channel. Any failure yields an empty lineup.
    pub async fn collect(&self) -> Vec<ChannelEntry> {
        match self.try_collect().await {
            Ok(channels) => {
                info!("Found {} channels on {}", channels.len(), self.address);
                channels
            }
            Err(e) => {
                error!("Error while getting channels from {}: {}", self.address, e);
                Vec::new()
            }
        }
    }

    pub async fn try_collect(&self) -> Result<Vec<ChannelEntry>, ChannelMapError> {
        let summary = self
            .backend
            .channel_map_page(&self.address, SUMMARY_PAGE, false)
            .await?;
        let total = parse_channel_count(&summary).ok_or(ChannelMapError::MissingCount)?;
        debug!("Channel map of {} reports {} channels", self.address, total);

        let mut channels = Vec::new();
        for page in channel_map_pages(total) {
            let xml = self
                .backend
                .channel_map_page(&self.address, page, true)
                .await?;
            let decoded = decode_channel_page(&xml)?;
            for rejected in &decoded.rejected {
                warn!("Skipped channel: {}", rejected);
            }
            channels.extend(decoded.entries);
        }

        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::fake::FakeBackend;

    fn channel_xml(number: usize, encoded_name: &str) -> String {
        format!(
            "<channel><name>{}</name><number>{}</number><eia>{}</eia><sourceid>{}</sourceid></channel>",
            encoded_name, number, number, 20_000 + number
        )
    }

    fn page_xml(range: std::ops::Range<usize>) -> String {
        // "S0NFVA==" is "KCET"
        let body: String = range.map(|n| channel_xml(n, "S0NFVA==")).collect();
        format!("<channels>{}</channels>", body)
    }

    fn summary(total: usize) -> String {
        format!("<html><body>Channels 1 to 50 of {}</body></html>", total)
    }

    fn collector(backend: FakeBackend) -> ChannelCollector {
        ChannelCollector::new(Arc::new(backend), "10.0.0.2")
    }

    #[tokio::test]
    async fn test_collects_continuation_page_once() {
        let backend = FakeBackend::new();
        backend.set_channel_page(1, false, summary(1075));
        backend.set_channel_page(0, true, page_xml(0..1024));
        backend.set_channel_page(21, true, page_xml(1024..1075));

        let channels = collector(backend).collect().await;
        assert_eq!(channels.len(), 1075);
        assert_eq!(channels[0].callsign, "KCET");
        assert_eq!(channels[1074].number, "1074");
        assert_eq!(channels[1074].source_id, "21074");
    }

    #[tokio::test]
    async fn test_small_map_reads_first_page_only() {
        let backend = FakeBackend::new();
        backend.set_channel_page(1, false, summary(3));
        backend.set_channel_page(0, true, page_xml(500..503));

        let channels = collector(backend).collect().await;
        let numbers: Vec<&str> = channels.iter().map(|c| c.number.as_str()).collect();
        assert_eq!(numbers, vec!["500", "501", "502"]);
    }

    #[tokio::test]
    async fn test_undecodable_names_are_skipped() {
        let backend = FakeBackend::new();
        backend.set_channel_page(1, false, summary(2));
        backend.set_channel_page(
            0,
            true,
            format!(
                "<channels>{}{}</channels>",
                channel_xml(7, "%%%"),
                channel_xml(8, "S0NFVA==")
            ),
        );

        let channels = collector(backend).collect().await;
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].number, "8");
    }

    #[tokio::test]
    async fn test_oversized_count_does_not_preallocate() {
        let backend = FakeBackend::new();
        backend.set_channel_page(1, false, summary(99_999_999_999_999_999));
        backend.set_channel_page(0, true, page_xml(0..2));
        let collector = collector(backend);

        // Page 21 is missing, so the whole lineup is dropped.
        assert!(collector.collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_yield_empty_lineup() {
        let backend = FakeBackend::new();
        let collector = collector(backend);
        assert_eq!(
            collector.try_collect().await,
            Err(ChannelMapError::Transport {
                page: 1,
                reason: "HTTP 404".to_string()
            })
        );
        assert!(collector.collect().await.is_empty());

        let backend = FakeBackend::new();
        backend.set_channel_page(1, false, "<html>maintenance</html>");
        let collector = ChannelCollector::new(Arc::new(backend), "10.0.0.2");
        assert_eq!(collector.try_collect().await, Err(ChannelMapError::MissingCount));
    }
}
