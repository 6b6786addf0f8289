use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, info, o, Logger};
use serde_json::Value;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::routes::rejection::{Context, Rejection};
use crate::validation;
use crate::vocabulary::VocabularyKind;

const SERVER_TIMING_HEADER: &str = "server-timing";
const NOT_FOUND_MESSAGE: &str = "Entity not found";
const DELETED_MESSAGE: &str = "Success";

pub(crate) type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn list(environment: Environment, query: HashMap<String, String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::list(), e);

        let filter = validation::recipe_filter(&query, &environment.vocabularies)
            .map_err(BackendError::from)
            .map_err(error_handler)?;

        log_request(&environment.logger, "GET", "/recipes");
        debug!(environment.logger, "Listing recipes..."; "filter" => ?filter);

        let recipes = environment.db.list(&filter).await.map_err(error_handler)?;

        json(&recipes)
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = validation::recipe_id(&id)
            .map_err(BackendError::from)
            .map_err(error_handler)?;

        log_request(&environment.logger, "GET", &format!("/recipe/{}", id));

        let option = environment.db.retrieve(&id).await.map_err(error_handler)?;

        let reply: Box<dyn Reply> = match option {
            Some(recipe) => Box::new(with_status(json(&recipe), StatusCode::OK)),
            None => Box::new(with_status(NOT_FOUND_MESSAGE, StatusCode::NOT_FOUND)),
        };

        reply
    }
}

pub async fn create(environment: Environment, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(), e);

        let payload: Value = serde_json::from_slice(&body)
            .map_err(BackendError::MalformedPayload)
            .map_err(error_handler)?;
        let data = validation::recipe_data(&payload, &environment.vocabularies)
            .map_err(BackendError::from)
            .map_err(error_handler)?;

        log_request(&environment.logger, "POST", "/recipe");

        let recipe = environment.db.insert(data).await.map_err(error_handler)?;
        let logger = environment.logger.new(o!("id" => recipe.id().to_string()));
        debug!(logger, "Stored recipe"; "ingredients" => recipe.data().ingredients().len());

        let location = environment
            .urls
            .recipe(recipe.id())
            .map_err(|source| BackendError::FailedToGenerateUrl { source })
            .map_err(error_handler)?;

        with_header(
            with_status(json(&recipe), StatusCode::CREATED),
            "location",
            location.as_str(),
        )
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = validation::trimmed_recipe_id(&id)
            .map_err(BackendError::from)
            .map_err(error_handler)?;

        log_request(&environment.logger, "DELETE", &format!("/recipe/{}", id));

        // no existence check: deleting a missing recipe still succeeds
        environment.db.delete(&id).await.map_err(error_handler)?;

        with_status(DELETED_MESSAGE, StatusCode::OK)
    }
}

pub async fn vocabulary(environment: Environment, kind: VocabularyKind) -> RouteResult {
    timed! {
        json(&environment.vocabularies.get(kind).entries())
    }
}

fn log_request(logger: &Logger, method: &str, path: &str) {
    info!(logger, "Handling request"; "method" => method, "path" => path);
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
