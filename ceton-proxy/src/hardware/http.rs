//! HTTP implementation of the Ceton device interface.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::ACCEPT;
use reqwest::Client;

use ceton_protocol::{extract_var_value, ChannelMapError, DispatchError, ProbeError, TunerVar};

use crate::hardware::{CetonBackend, ChannelControl, StreamControl};

const CHANNEL_MAP_ACCEPT: &str = "application/xml;q=0.9, */*;q=0.8";

/// Talks to Ceton devices over their CGI web interface.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    /// Create a backend whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: String,
        form: &T,
    ) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                endpoint: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                endpoint: url,
                status: status.as_u16(),
            });
        }

        debug!("POST {} -> {}", url, status);
        Ok(())
    }
}

#[async_trait]
impl CetonBackend for HttpBackend {
    async fn get_var(&self, address: &str, instance: u32, var: TunerVar) -> Result<String, ProbeError> {
        let url = format!("http://{}/get_var?i={}{}", address, instance, var.query());

        let response = self.client.get(&url).send().await.map_err(|e| {
            let err = ProbeError::Transport {
                var: var.name().to_string(),
                reason: e.to_string(),
            };
            error!("{}", err);
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let err = ProbeError::Status {
                var: var.name().to_string(),
                status: status.as_u16(),
            };
            error!("{}", err);
            return Err(err);
        }

        let body = response.text().await.map_err(|e| ProbeError::Transport {
            var: var.name().to_string(),
            reason: e.to_string(),
        })?;

        match extract_var_value(&body) {
            Some(value) => Ok(value.to_string()),
            None => {
                let err = ProbeError::Unparseable {
                    var: var.name().to_string(),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    async fn stream_request(&self, address: &str, control: &StreamControl) -> Result<(), DispatchError> {
        let url = format!("http://{}/stream_request.cgi", address);
        self.post_form(url, control).await
    }

    async fn channel_request(&self, address: &str, control: &ChannelControl) -> Result<(), DispatchError> {
        let url = format!("http://{}/channel_request.cgi", address);
        self.post_form(url, control).await
    }

    async fn channel_map_page(&self, address: &str, page: u32, xml: bool) -> Result<String, ChannelMapError> {
        let url = if xml {
            format!("http://{}/view_channel_map.cgi?page={}&xml=1", address, page)
        } else {
            format!("http://{}/view_channel_map.cgi?page={}", address, page)
        };

        let transport = |reason: String| ChannelMapError::Transport { page, reason };

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, CHANNEL_MAP_ACCEPT)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport(format!("HTTP {}", status.as_u16())));
        }

        response.text().await.map_err(|e| transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend() -> HttpBackend {
        HttpBackend::new(Duration::from_secs(2)).unwrap()
    }

    fn address(server: &MockServer) -> String {
        server.uri().trim_start_matches("http://").to_string()
    }

    #[tokio::test]
    async fn test_get_var_parses_fragment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_var"))
            .and(query_param("i", "2"))
            .and(query_param("s", "av"))
            .and(query_param("v", "TransportState"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body class=\"get\">STOPPED</body></html>"),
            )
            .mount(&server)
            .await;

        let value = backend()
            .get_var(&address(&server), 2, TunerVar::TransportState)
            .await
            .unwrap();
        assert_eq!(value, "STOPPED");
    }

    #[tokio::test]
    async fn test_get_var_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_var"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend()
            .get_var(&address(&server), 0, TunerVar::Temperature)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unparseable { .. }));
    }

    #[tokio::test]
    async fn test_get_var_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = backend()
            .get_var(&address(&server), 0, TunerVar::SignalLevel)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProbeError::Status {
                var: "Signal_Level".to_string(),
                status: 500
            }
        );
    }

    #[tokio::test]
    async fn test_get_var_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<body class=\"get\">STOPPED</body>")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let backend = HttpBackend::new(Duration::from_millis(50)).unwrap();
        let err = backend
            .get_var(&address(&server), 0, TunerVar::TransportState)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_stream_request_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream_request.cgi"))
            .and(body_string_contains("instance_id=1"))
            .and(body_string_contains("dest_ip=10.0.0.5"))
            .and(body_string_contains("dest_port=41002"))
            .and(body_string_contains("protocol=0"))
            .and(body_string_contains("start=1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let control = StreamControl {
            instance_id: 1,
            dest_ip: "10.0.0.5".to_string(),
            dest_port: 41002,
            protocol: 0,
            start: 1,
        };
        backend()
            .stream_request(&address(&server), &control)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_channel_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channel_request.cgi"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let control = ChannelControl {
            instance_id: 0,
            channel: 505,
        };
        let err = backend()
            .channel_request(&address(&server), &control)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_channel_map_page_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/view_channel_map.cgi"))
            .and(query_param("page", "21"))
            .and(query_param("xml", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<channels></channels>"))
            .mount(&server)
            .await;

        let body = backend()
            .channel_map_page(&address(&server), 21, true)
            .await
            .unwrap();
        assert_eq!(body, "<channels></channels>");
    }
}
