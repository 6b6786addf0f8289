use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;
use crate::validation::ValidationErrors;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        let errors = match &self.error {
            BackendError::InvalidFields(errors) => Some(errors.clone()),
            _ => None,
        };

        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
            errors,
        }
    }
}

// `From<Rejection> for reject::Rejection` comes from warp's blanket impl,
// which calls `reject::custom`.
impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,

    /// Present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) errors: Option<ValidationErrors>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Create,
    Delete { id: String },
    List,
    Retrieve { id: String },
}

impl Context {
    pub fn create() -> Context {
        Context::Create
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn list() -> Context {
        Context::List
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }
}
