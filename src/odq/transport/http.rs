use super::{Connector, Endpoint, Service};
use crate::config::ConnectionConfig;
use crate::error::{OdqError, Result};
use crate::value::Value;
use crate::xmlrpc;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Opens XML-RPC endpoints under the configured base URL.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: ConnectionConfig,
}

impl HttpConnector {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Connector for HttpConnector {
    type Endpoint = HttpEndpoint;

    fn open(&self, service: Service) -> Result<HttpEndpoint> {
        let url = self.config.service_url(service.path());
        let client = Client::builder().timeout(self.config.timeout).build()?;
        debug!(%url, "opened endpoint");
        Ok(HttpEndpoint { url, client })
    }
}

#[derive(Debug)]
pub struct HttpEndpoint {
    url: String,
    client: Client,
}

impl HttpEndpoint {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Endpoint for HttpEndpoint {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let body = xmlrpc::encode_call(method, params);
        debug!(url = %self.url, method, bytes = body.len(), "xml-rpc call");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(OdqError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let text = response.text()?;
        debug!(url = %self.url, method, bytes = text.len(), "xml-rpc response");
        xmlrpc::decode_response(&text)
    }
}
