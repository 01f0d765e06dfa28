use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::error::ShieldError;
use crate::event::{ObjectLambdaEvent, TransformationRequest};
use crate::fetch::ObjectFetcher;
use crate::transform;
use crate::writer::ResponseWriter;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: String,
}

impl Response {
    fn delivered() -> Self {
        Response {
            status_code: 200,
            body: json!({ "message": { "status": true } }).to_string(),
        }
    }
}

/// Fetch, redact and write back one intercepted `GetObject`.
pub struct DataShield<F, W> {
    fetcher: F,
    writer: W,
}

impl<F, W> DataShield<F, W>
where
    F: ObjectFetcher,
    W: ResponseWriter,
{
    pub fn new(fetcher: F, writer: W) -> Self {
        Self { fetcher, writer }
    }

    pub async fn handle(
        &self,
        invocation_id: &str,
        payload: Value,
    ) -> Result<Response, ShieldError> {
        let start = Instant::now();

        let request = TransformationRequest::try_from(ObjectLambdaEvent::from_value(payload)?)?;
        let TransformationRequest {
            request_id,
            access_point_arn,
            supporting_access_point_arn,
            protocol_version,
            route,
            token,
            input_url,
        } = request;

        info!(
            invocation_id,
            x_amz_request_id = request_id.as_deref().unwrap_or("-"),
            access_point_arn = access_point_arn.as_deref().unwrap_or("-"),
            supporting_access_point_arn = supporting_access_point_arn.as_deref().unwrap_or("-"),
            protocol_version = protocol_version.as_deref().unwrap_or("-"),
            output_route = route.as_str(),
            object_path = input_url.path(),
            "Received GetObject transformation request"
        );

        let raw = self.fetcher.fetch(&input_url).await?;
        let redacted = transform::redact(&raw)?;
        debug!(payload = %redacted.body, "Redacted payload");

        self.writer
            .write_response(&route, token, redacted.body)
            .await?;

        let elapsed = start.elapsed();
        info!(
            invocation_id,
            bytes_in = redacted.stats.bytes_in,
            bytes_out = redacted.stats.bytes_out,
            keys_in = redacted.stats.keys_in,
            keys_removed = redacted.stats.keys_removed,
            process_time = %format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0),
            "Delivered transformed object"
        );

        Ok(Response::delivered())
    }
}

pub async fn function_handler<F, W>(
    shield: Arc<DataShield<F, W>>,
    event: LambdaEvent<Value>,
) -> Result<Response, Error>
where
    F: ObjectFetcher,
    W: ResponseWriter,
{
    let invocation_id = event.context.request_id;
    shield.handle(&invocation_id, event.payload).await.map_err(|e| {
        error!(
            invocation_id = %invocation_id,
            error_kind = e.kind(),
            error = ?e,
            "Transformation failed: {}", e
        );
        Error::from(e)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lambda_runtime::Context;
    use url::Url;

    use super::*;
    use crate::event::{RequestRoute, RequestToken};
    use crate::test_helpers::CapturedLogs;

    struct StubFetcher {
        response: fn() -> Result<Vec<u8>, ShieldError>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(response: fn() -> Result<Vec<u8>, ShieldError>) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ObjectFetcher for StubFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Vec<u8>, ShieldError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.response)()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Delivery {
        route: String,
        token: String,
        body: String,
    }

    struct RecordingWriter {
        deliveries: Mutex<Vec<Delivery>>,
        fail: bool,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                deliveries: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn deliveries(&self) -> Vec<Delivery> {
            std::mem::take(&mut *self.deliveries.lock().expect("poisoned mutex"))
        }
    }

    #[async_trait]
    impl ResponseWriter for RecordingWriter {
        async fn write_response(
            &self,
            route: &RequestRoute,
            token: RequestToken,
            body: String,
        ) -> Result<(), ShieldError> {
            if self.fail {
                return Err(ShieldError::CallbackDelivery("ValidationError".to_string()));
            }
            self.deliveries
                .lock()
                .expect("poisoned mutex")
                .push(Delivery {
                    route: route.as_str().to_string(),
                    token: token.into_inner(),
                    body,
                });
            Ok(())
        }
    }

    fn event() -> Value {
        json!({
            "xAmzRequestId": "req-1",
            "getObjectContext": {
                "inputS3Url": "https://lambda-consumer-111122223333.s3-accesspoint.us-east-1.amazonaws.com/store_events/sale.json",
                "outputRoute": "io-use1-001",
                "outputToken": "token-1"
            },
            "configuration": {
                "accessPointArn": "arn:aws:s3-object-lambda:us-east-1:111122223333:accesspoint/miztiik-data-shield",
                "supportingAccessPointArn": "arn:aws:s3:us-east-1:111122223333:accesspoint/lambda-consumer"
            },
            "protocolVersion": "1.00"
        })
    }

    fn sale() -> Result<Vec<u8>, ShieldError> {
        Ok(br#"{"sku":"A1","price":9.99,"discount":0.1,"qty":3}"#.to_vec())
    }

    #[tokio::test]
    async fn delivers_redacted_object_once() {
        let shield = DataShield::new(StubFetcher::new(sale), RecordingWriter::new());

        let response = shield.handle("inv-1", event()).await.expect("success path");
        assert_eq!(response.status_code, 200);

        let deliveries = shield.writer.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].route, "io-use1-001");
        assert_eq!(deliveries[0].token, "token-1");
        let delivered: Value = serde_json::from_str(&deliveries[0].body).unwrap();
        assert_eq!(delivered, json!({ "sku": "A1", "qty": 3 }));
        assert_eq!(shield.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn success_envelope_reports_status_true() {
        let shield = DataShield::new(StubFetcher::new(sale), RecordingWriter::new());

        let response = shield.handle("inv-1", event()).await.unwrap();
        let envelope = serde_json::to_value(&response).unwrap();
        assert_eq!(envelope["statusCode"], 200);

        let body: Value = serde_json::from_str(envelope["body"].as_str().unwrap()).unwrap();
        assert_eq!(body, json!({ "message": { "status": true } }));
    }

    #[tokio::test]
    async fn upstream_failure_skips_callback() {
        fn forbidden() -> Result<Vec<u8>, ShieldError> {
            Err(ShieldError::UpstreamFetch {
                status: Some(403),
                message: "presigned URL returned 403 Forbidden".to_string(),
            })
        }
        let shield = DataShield::new(StubFetcher::new(forbidden), RecordingWriter::new());

        let err = shield.handle("inv-1", event()).await.unwrap_err();
        assert!(matches!(err, ShieldError::UpstreamFetch { status: Some(403), .. }));
        assert!(shield.writer.deliveries().is_empty());
    }

    #[tokio::test]
    async fn non_json_body_skips_callback() {
        fn html() -> Result<Vec<u8>, ShieldError> {
            Ok(b"<html>not json</html>".to_vec())
        }
        let shield = DataShield::new(StubFetcher::new(html), RecordingWriter::new());

        let err = shield.handle("inv-1", event()).await.unwrap_err();
        assert!(matches!(err, ShieldError::PayloadDecode(_)));
        assert!(shield.writer.deliveries().is_empty());
    }

    #[tokio::test]
    async fn missing_input_url_fails_before_fetch() {
        let shield = DataShield::new(StubFetcher::new(sale), RecordingWriter::new());
        let mut payload = event();
        payload["getObjectContext"]
            .as_object_mut()
            .unwrap()
            .remove("inputS3Url");

        let err = shield.handle("inv-1", payload).await.unwrap_err();
        assert!(matches!(err, ShieldError::MalformedEvent(_)));
        assert_eq!(shield.fetcher.calls(), 0);
        assert!(shield.writer.deliveries().is_empty());
    }

    #[tokio::test]
    async fn head_object_event_fails_before_fetch() {
        let shield = DataShield::new(StubFetcher::new(sale), RecordingWriter::new());

        let err = shield
            .handle("inv-1", json!({ "headObjectContext": { "inputS3Url": "https://bucket/key" } }))
            .await
            .unwrap_err();
        assert!(matches!(err, ShieldError::MalformedEvent(_)));
        assert_eq!(shield.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn callback_failure_is_reported() {
        let shield = DataShield::new(StubFetcher::new(sale), RecordingWriter::failing());

        let err = shield.handle("inv-1", event()).await.unwrap_err();
        assert!(matches!(err, ShieldError::CallbackDelivery(_)));
        assert_eq!(err.kind(), "CallbackDeliveryError");
    }

    #[tokio::test]
    async fn function_handler_surfaces_errors_to_runtime() {
        let shield = Arc::new(DataShield::new(StubFetcher::new(sale), RecordingWriter::new()));

        let ok = function_handler(Arc::clone(&shield), LambdaEvent::new(event(), Context::default()))
            .await
            .expect("success path");
        assert_eq!(ok.status_code, 200);

        let err = function_handler(shield, LambdaEvent::new(json!({}), Context::default()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Malformed event"));
    }

    #[tokio::test]
    async fn successful_invocation_is_logged_with_its_id() {
        let (logs, _guard) = CapturedLogs::install();
        let shield = Arc::new(DataShield::new(StubFetcher::new(sale), RecordingWriter::new()));
        let mut context = Context::default();
        context.request_id = "7e3b2c1a-invocation".to_string();

        function_handler(shield, LambdaEvent::new(event(), context))
            .await
            .expect("success path");

        let received = logs
            .contents()
            .lines()
            .find(|line| line.contains("Received GetObject transformation request"))
            .map(str::to_string)
            .expect("received line is logged");
        assert!(received.contains("7e3b2c1a-invocation"));
        assert!(received.contains("accesspoint/lambda-consumer"));
        assert!(!received.contains("token-1"));
    }
}
