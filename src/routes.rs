use std::sync::Arc;

use log::{error, warn, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod rejection;

pub use internal::*;

/// The maximum request body to accept. Recipes are small, so anything
/// beyond this is almost certainly not one.
const MAX_CONTENT_LENGTH: u64 = 1024 * 1024;

/// Combines every recipe route and renders rejections raised by them.
pub fn make_api(
    environment: Environment,
) -> impl warp::Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    make_list_route(environment.clone())
        .or(make_retrieve_route(environment.clone()))
        .unify()
        .or(make_create_route(environment.clone()))
        .unify()
        .or(make_delete_route(environment.clone()))
        .unify()
        .or(make_vocabulary_route(environment))
        .unify()
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let status = status_code_for(&r.error);

        if status.is_server_error() {
            error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);
        } else {
            warn!(logger, "Rejected request"; "context" => ?r.context, "status" => %status, "message" => %r.error);
        }

        return Ok(with_status(json(&r.flatten()), status));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        InvalidFields(..) | MalformedPayload(..) => StatusCode::BAD_REQUEST,
        ConstraintViolation { .. } => StatusCode::CONFLICT,
        StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FailedToGenerateUrl { .. } | Sqlx { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use std::collections::HashMap;

    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{body, delete as d, get as g, path as p, path::param as par, post, query};

    use super::{handlers, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::vocabulary::VocabularyKind;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; p("recipes"), end(), g(), query::<HashMap<String, String>>());
    route!(make_retrieve_route => retrieve, rt; p("recipe"), par::<String>(), end(), g());
    route!(make_create_route => create, rt; p("recipe"), end(), post(), body::content_length_limit(MAX_CONTENT_LENGTH), body::bytes());
    route!(make_delete_route => delete, rt; p("recipe"), par::<String>(), end(), d());
    route!(make_vocabulary_route => vocabulary, rt; p("vocabularies"), par::<VocabularyKind>(), end(), g());
}

#[cfg(test)]
pub(crate) fn test_environment() -> Environment {
    test_environment_with(Arc::new(crate::db::mock::MockDb::new()))
}

#[cfg(test)]
pub(crate) fn test_environment_with(db: Arc<crate::db::mock::MockDb>) -> Environment {
    use crate::urls::Urls;
    use crate::vocabulary::sample;

    Environment::new(
        Arc::new(log::discard()),
        db,
        Arc::new(Urls::parse("https://www.example.com/").unwrap()),
        Arc::new(sample()),
    )
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use bytes::Bytes;
    use serde_json::{json, Value};
    use warp::http::StatusCode;
    use warp::{Filter, Reply};

    use super::{make_api, test_environment_with};
    use crate::db::mock::MockDb;
    use crate::recipe::{Ingredient, Recipe, RecipeData, RecipeId};

    const ID: &str = "abcdefghijklmnopqrstuvwxy";

    fn soup() -> Value {
        json!({
            "name": "Soup",
            "description": "Warm and filling",
            "servings": 4,
            "time": 30,
            "reference": "https://example.com/soup",
            "difficulty": "easy",
            "media": "stove",
            "taste": "salty",
            "vegetarian": true,
            "ingredients": [{ "name": "Salt", "amount": 1, "unit": "g" }]
        })
    }

    fn stored(id: &str, name: &str, difficulty: &str, vegetarian: bool) -> Recipe {
        Recipe::new(
            RecipeId::parse(id).unwrap(),
            RecipeData {
                name: name.to_owned(),
                description: String::new(),
                servings: 2,
                time: 15,
                reference: String::new(),
                difficulty: difficulty.to_owned(),
                media: "oven".to_owned(),
                taste: "sweet".to_owned(),
                vegetarian,
                ingredients: vec![Ingredient::new("Flour".to_owned(), 200.0, "g".to_owned())],
            },
        )
    }

    fn api(
        db: &Arc<MockDb>,
    ) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
        make_api(test_environment_with(db.clone()))
    }

    fn field_errors(body: &Bytes) -> Vec<String> {
        let value: Value = serde_json::from_slice(body).expect("parse rejection as JSON");

        value["errors"]
            .as_array()
            .expect("get errors array")
            .iter()
            .map(|e| e["field"].as_str().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn listing_applies_filters() {
        let db = Arc::new(MockDb::with_recipes(vec![
            stored(ID, "Apple pie", "medium", true),
            stored("bbbbbbbbbbbbbbbbbbbbbbbbb", "Pork pie", "hard", false),
        ]));

        let response = warp::test::request()
            .path("/recipes?name=PIE&vegetarian=false&difficulty=Hard")
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("server-timing"));

        let recipes: Vec<Recipe> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].data().name(), "Pork pie");
        assert_eq!(db.calls().list, 1);
    }

    #[tokio::test]
    async fn invalid_filters_never_reach_the_store() {
        let db = Arc::new(MockDb::new());

        for query in &[
            "servings=many",
            "time=1.5",
            "difficulty=impossible",
            "vegetarian=perhaps",
            "colour=red",
        ] {
            let response = warp::test::request()
                .path(&format!("/recipes?{}", query))
                .method("GET")
                .reply(&api(&db))
                .await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", query);
        }

        assert_eq!(db.calls().total(), 0);
    }

    #[tokio::test]
    async fn listing_reports_every_invalid_field() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path("/recipes?servings=x&taste=bland&media=Oven")
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut fields = field_errors(response.body());
        fields.sort();
        assert_eq!(fields, vec!["servings", "taste"]);
    }

    #[tokio::test]
    async fn retrieving_works() {
        let db = Arc::new(MockDb::with_recipes(vec![stored(ID, "Apple pie", "easy", true)]));

        let response = warp::test::request()
            .path(&format!("/recipe/{}", ID))
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let recipe: Recipe = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(recipe, stored(ID, "Apple pie", "easy", true));
    }

    #[tokio::test]
    async fn retrieving_a_missing_recipe_is_not_found() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path(&format!("/recipe/{}", ID))
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"Entity not found");
        assert_eq!(db.calls().retrieve, 1);
    }

    #[tokio::test]
    async fn retrieving_with_a_malformed_id_fails() {
        let db = Arc::new(MockDb::new());

        for id in &["abcdefghijklmnopqrstuvwx", "abcdefghijklmnopqrstuvwxyz"] {
            let response = warp::test::request()
                .path(&format!("/recipe/{}", id))
                .method("GET")
                .reply(&api(&db))
                .await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(field_errors(response.body()), vec!["id"]);

            let body: Value = serde_json::from_slice(response.body()).unwrap();
            assert_eq!(body["id"], *id);
        }

        assert_eq!(db.calls().total(), 0);
    }

    #[tokio::test]
    async fn creating_works() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path("/recipe")
            .method("POST")
            .json(&soup())
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(db.calls().insert, 1);

        let recipe: Recipe = serde_json::from_slice(response.body()).unwrap();
        let saved = db.recipes.read().unwrap()[0].clone();
        assert_eq!(recipe, saved);
        assert_eq!(recipe.id().as_str().len(), 25);

        let location = response
            .headers()
            .get("location")
            .expect("get location header")
            .to_str()
            .unwrap()
            .to_owned();
        assert_eq!(location, format!("https://www.example.com/recipe/{}", recipe.id()));
    }

    #[tokio::test]
    async fn creating_without_a_name_fails() {
        let db = Arc::new(MockDb::new());
        let mut payload = soup();
        payload.as_object_mut().unwrap().remove("name");

        let response = warp::test::request()
            .path("/recipe")
            .method("POST")
            .json(&payload)
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(field_errors(response.body()), vec!["name"]);
        assert_eq!(db.calls().insert, 0);
    }

    #[tokio::test]
    async fn creating_from_garbage_fails() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path("/recipe")
            .method("POST")
            .body("{ not json")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["message"], "Malformed payload");
        assert_eq!(db.calls().total(), 0);
    }

    #[tokio::test]
    async fn deleting_trims_the_encoded_id() {
        let db = Arc::new(MockDb::with_recipes(vec![stored(ID, "Apple pie", "easy", true)]));

        let response = warp::test::request()
            .path(&format!("/recipe/%20%20{}%20%20", ID))
            .method("DELETE")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"Success");
        assert_eq!(db.calls().delete, 1);
        assert!(db.recipes.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_with_a_short_padded_id_fails() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path("/recipe/%20%20abcdefghijklmnopqrstuvwx%20%20")
            .method("DELETE")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(field_errors(response.body()), vec!["id"]);
        assert_eq!(db.calls().total(), 0);
    }

    #[tokio::test]
    async fn retrieving_counts_decoded_characters() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path(&format!("/recipe/{}", "%C3%A9".repeat(25)))
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(db.calls().retrieve, 1);

        let response = warp::test::request()
            .path("/recipe/%FFbcdefghijklmnopqrstuvwxy")
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(field_errors(response.body()), vec!["id"]);
        assert_eq!(db.calls().retrieve, 1);
    }

    #[tokio::test]
    async fn listing_with_an_empty_reference_fails() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path("/recipes?reference=")
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(field_errors(response.body()), vec!["reference"]);
        assert_eq!(db.calls().total(), 0);
    }

    #[tokio::test]
    async fn deleting_twice_succeeds_twice() {
        let db = Arc::new(MockDb::with_recipes(vec![stored(ID, "Apple pie", "easy", true)]));

        for _ in 0..2 {
            let response = warp::test::request()
                .path(&format!("/recipe/{}", ID))
                .method("DELETE")
                .reply(&api(&db))
                .await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.body().as_ref(), b"Success");
        }

        assert_eq!(db.calls().delete, 2);
        assert_eq!(db.calls().retrieve, 0);
    }

    #[tokio::test]
    async fn vocabularies_are_listed() {
        let db = Arc::new(MockDb::new());

        let response = warp::test::request()
            .path("/vocabularies/difficulty")
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body[2]["token"], "hard");

        let response = warp::test::request()
            .path("/vocabularies/flavour")
            .method("GET")
            .reply(&api(&db))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(db.calls().total(), 0);
    }
}
