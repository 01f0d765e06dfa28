//! Names used when an Object Lambda access point is wired to this function.
//!
//! Region, account and access point names are opaque strings owned by the
//! infrastructure layer; nothing here validates them.

use std::fmt;

/// S3 actions an Object Lambda access point can route to a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetObject,
    HeadObject,
    ListObjects,
    ListObjectsV2,
}

impl Action {
    /// The event field carrying the request context for this action.
    pub fn context_field(self) -> &'static str {
        match self {
            Action::GetObject => "getObjectContext",
            Action::HeadObject => "headObjectContext",
            Action::ListObjects => "listObjectsContext",
            Action::ListObjectsV2 => "listObjectsV2Context",
        }
    }

    /// Only `GetObject` is bound to this function.
    pub fn is_supported(self) -> bool {
        matches!(self, Action::GetObject)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::GetObject => "GetObject",
            Action::HeadObject => "HeadObject",
            Action::ListObjects => "ListObjects",
            Action::ListObjectsV2 => "ListObjectsV2",
        };
        f.write_str(name)
    }
}

pub fn access_point_arn(region: &str, account: &str, name: &str) -> String {
    format!("arn:aws:s3:{region}:{account}:accesspoint/{name}")
}

pub fn object_lambda_access_point_arn(region: &str, account: &str, name: &str) -> String {
    format!("arn:aws:s3-object-lambda:{region}:{account}:accesspoint/{name}")
}
