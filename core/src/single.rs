//! One-shot request/response exchange.
//!
//! # Design
//! The whole body is buffered, then decoded as JSON if it parses and shown
//! as text otherwise. A transport failure (including the optional overall
//! timeout) is reported to the observer and returned; it is never retried.

use std::time::Duration;

use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::decoder::TextEncoding;
use crate::error::{ProbeError, TransportError};
use crate::http::{Endpoint, HttpRequest, ResponseEnvelope};
use crate::observer::{emit_envelope, Observer, SEPARATOR};
use crate::transport::Transport;
use crate::types::{ChatPayload, DecodedBody};

/// Result of a completed single exchange.
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub exchange_id: Uuid,
    pub envelope: ResponseEnvelope,
    pub body: DecodedBody,
}

/// Sends one request and reports the full response.
#[derive(Debug, Clone)]
pub struct SingleExchangeClient<T> {
    transport: T,
    encoding: TextEncoding,
    timeout: Option<Duration>,
}

impl<T: Transport> SingleExchangeClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            encoding: TextEncoding::default(),
            timeout: None,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Bound the whole exchange, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn execute<O: Observer + ?Sized>(
        &self,
        endpoint: &Endpoint,
        payload: &ChatPayload,
        observer: &mut O,
    ) -> Result<ExchangeReport, ProbeError> {
        let request = HttpRequest::json(endpoint, payload)?;
        observer.emit(&format!("request url: {}", request.url));
        observer.emit(&format!("request payload: {}", request.body));
        observer.emit(SEPARATOR);

        let exchange_id = Uuid::new_v4();
        let span = tracing::info_span!("single_exchange", %exchange_id, url = %endpoint);
        let result = self.round_trip(request).instrument(span).await;

        let (envelope, bytes) = match result {
            Ok(parts) => parts,
            Err(err) => {
                warn!(%exchange_id, error = %err, "single exchange failed");
                observer.emit(&format!("request failed: {err}"));
                return Err(err.into());
            }
        };

        let body = DecodedBody::decode(&bytes, self.encoding);
        debug!(%exchange_id, status = envelope.status, json = body.as_json().is_some(), bytes = bytes.len(), "response decoded");
        emit_envelope(observer, &envelope);
        observer.emit(SEPARATOR);
        observer.emit("response body:");
        observer.emit(&body.render());

        Ok(ExchangeReport {
            exchange_id,
            envelope,
            body,
        })
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<(ResponseEnvelope, Vec<u8>), TransportError> {
        let exchange = async {
            let mut exchange = self.transport.send(request).await?;
            let body = exchange.read_to_end().await?;
            Ok::<_, TransportError>((exchange.envelope().clone(), body))
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .unwrap_or(Err(TransportError::TimedOut(limit))),
            None => exchange.await,
        }
    }
}
