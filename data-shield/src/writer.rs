use std::error::Error as StdError;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::error::ShieldError;
use crate::event::{RequestRoute, RequestToken};

/// Delivers the transformed body back into the caller's response stream.
#[async_trait]
pub trait ResponseWriter: Send + Sync {
    async fn write_response(
        &self,
        route: &RequestRoute,
        token: RequestToken,
        body: String,
    ) -> Result<(), ShieldError>;
}

/// `WriteGetObjectResponse` through the S3 Object Lambda endpoint.
pub struct S3ResponseWriter {
    client: aws_sdk_s3::Client,
}

impl S3ResponseWriter {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseWriter for S3ResponseWriter {
    async fn write_response(
        &self,
        route: &RequestRoute,
        token: RequestToken,
        body: String,
    ) -> Result<(), ShieldError> {
        let result = self
            .client
            .write_get_object_response()
            .request_route(route.as_str())
            .request_token(token.into_inner())
            .status_code(200)
            .content_type("application/json")
            .body(ByteStream::from(body.into_bytes()))
            .send()
            .await;
        delivery_outcome(result)
    }
}

fn delivery_outcome<O, E>(result: Result<O, E>) -> Result<(), ShieldError>
where
    O: Debug,
    E: StdError,
{
    match result {
        Ok(output) => {
            debug!(resp = ?output, "WriteGetObjectResponse accepted");
            Ok(())
        }
        Err(e) => Err(ShieldError::CallbackDelivery(format!(
            "WriteGetObjectResponse failed: {}",
            DisplayErrorContext(&e)
        ))),
    }
}
