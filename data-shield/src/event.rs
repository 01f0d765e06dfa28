use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ShieldError;
use crate::wiring::Action;

/// Event delivered by an S3 Object Lambda access point.
///
/// Everything is optional at this layer so that missing fields surface as
/// `ShieldError::MalformedEvent` from [`TransformationRequest::try_from`]
/// instead of a runtime deserialization failure.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectLambdaEvent {
    pub x_amz_request_id: Option<String>,
    pub get_object_context: Option<GetObjectContext>,
    pub head_object_context: Option<Value>,
    pub list_objects_context: Option<Value>,
    #[serde(rename = "listObjectsV2Context")]
    pub list_objects_v2_context: Option<Value>,
    pub configuration: Option<Configuration>,
    pub protocol_version: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectContext {
    pub input_s3_url: Option<String>,
    pub output_route: Option<String>,
    pub output_token: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub access_point_arn: Option<String>,
    pub supporting_access_point_arn: Option<String>,
}

impl ObjectLambdaEvent {
    pub fn from_value(value: Value) -> Result<Self, ShieldError> {
        serde_json::from_value(value)
            .map_err(|e| ShieldError::MalformedEvent(format!("unreadable event: {e}")))
    }

    /// The action whose context is present, `None` when the event carries none.
    pub fn action(&self) -> Option<Action> {
        if self.get_object_context.is_some() {
            Some(Action::GetObject)
        } else if self.head_object_context.is_some() {
            Some(Action::HeadObject)
        } else if self.list_objects_context.is_some() {
            Some(Action::ListObjects)
        } else if self.list_objects_v2_context.is_some() {
            Some(Action::ListObjectsV2)
        } else {
            None
        }
    }
}

/// Opaque identifier routing the written response back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRoute(String);

impl RequestRoute {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One-time credential for the write-response callback.
///
/// Not `Clone`: handing it to the callback consumes it.
pub struct RequestToken(String);

impl RequestToken {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestToken(<redacted>)")
    }
}

/// A validated `GetObject` transformation request.
#[derive(Debug)]
pub struct TransformationRequest {
    pub request_id: Option<String>,
    pub access_point_arn: Option<String>,
    pub supporting_access_point_arn: Option<String>,
    pub protocol_version: Option<String>,
    pub route: RequestRoute,
    pub token: RequestToken,
    pub input_url: Url,
}

impl TryFrom<ObjectLambdaEvent> for TransformationRequest {
    type Error = ShieldError;

    fn try_from(event: ObjectLambdaEvent) -> Result<Self, Self::Error> {
        match event.action() {
            Some(action) if !action.is_supported() => {
                return Err(ShieldError::MalformedEvent(format!(
                    "unsupported action {action}, only GetObject is routed to this function"
                )));
            }
            None => {
                return Err(ShieldError::MalformedEvent(format!(
                    "missing {}",
                    Action::GetObject.context_field()
                )));
            }
            Some(_) => {}
        }

        let context = event.get_object_context.unwrap_or_default();
        let route = required(context.output_route, "outputRoute")?;
        let token = required(context.output_token, "outputToken")?;
        let raw_url = required(context.input_s3_url, "inputS3Url")?;

        let input_url = Url::parse(&raw_url)
            .map_err(|e| ShieldError::MalformedEvent(format!("inputS3Url is not a URL: {e}")))?;
        if !matches!(input_url.scheme(), "https" | "http") {
            return Err(ShieldError::MalformedEvent(format!(
                "inputS3Url has unsupported scheme {}",
                input_url.scheme()
            )));
        }

        let configuration = event.configuration.unwrap_or_default();
        Ok(TransformationRequest {
            request_id: event.x_amz_request_id,
            access_point_arn: configuration.access_point_arn,
            supporting_access_point_arn: configuration.supporting_access_point_arn,
            protocol_version: event.protocol_version,
            route: RequestRoute(route),
            token: RequestToken(token),
            input_url,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ShieldError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ShieldError::MalformedEvent(format!(
            "getObjectContext.{field} is missing"
        ))),
    }
}
