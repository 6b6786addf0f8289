//! Parses and coerces request input into domain types. Every check runs
//! even after an earlier one fails, so callers receive the complete list
//! of violations in one response.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::recipe::{Ingredient, RecipeData, RecipeFilter, RecipeId, ID_LENGTH};
use crate::vocabulary::{Vocabularies, Vocabulary, VocabularyKind};

const FILTER_FIELDS: &[&str] = &[
    "name",
    "servings",
    "time",
    "reference",
    "difficulty",
    "media",
    "taste",
    "vegetarian",
];

const RECIPE_FIELDS: &[&str] = &[
    "name",
    "description",
    "servings",
    "time",
    "reference",
    "difficulty",
    "media",
    "taste",
    "vegetarian",
    "ingredients",
];

const INGREDIENT_FIELDS: &[&str] = &["name", "amount", "unit"];

const TRUTHY: &[&str] = &["true", "1", "yes", "on"];
const FALSY: &[&str] = &["false", "0", "no", "off"];

/// A single violated constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the offending field, e.g. `ingredients[2].unit`.
    pub(crate) field: String,
    pub(crate) message: String,
}

impl FieldError {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Every violation found in one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .0
            .iter()
            .map(|e| format!("{} {}", e.field, e.message))
            .collect::<Vec<_>>();

        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validates an ID taken from a request path, decoding any
/// percent-encoded characters first.
pub fn recipe_id(segment: &str) -> Result<RecipeId, ValidationErrors> {
    decode_segment(segment).and_then(|raw| exact_recipe_id(&raw))
}

/// Like [`recipe_id`], but ignores whitespace around the decoded ID.
pub fn trimmed_recipe_id(segment: &str) -> Result<RecipeId, ValidationErrors> {
    decode_segment(segment).and_then(|raw| exact_recipe_id(raw.trim()))
}

fn decode_segment(segment: &str) -> Result<String, ValidationErrors> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("id", "must be valid UTF-8");
            errors
        })
}

fn exact_recipe_id(raw: &str) -> Result<RecipeId, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match RecipeId::parse(raw) {
        Some(id) => Ok(id),
        None => {
            errors.add(
                "id",
                format!("must be exactly {} characters long", ID_LENGTH),
            );
            Err(errors)
        }
    }
}

/// Builds a list filter from query parameters.
pub fn recipe_filter(
    query: &HashMap<String, String>,
    vocabularies: &Vocabularies,
) -> Result<RecipeFilter, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    reject_unknown(query.keys().map(String::as_str), FILTER_FIELDS, "", &mut errors);

    let get = |key: &str| query.get(key).map(String::as_str);
    let token_of = |kind: VocabularyKind| {
        let vocabulary = vocabularies.get(kind);
        move |raw: &str| token_from_str(vocabulary, raw)
    };

    let filter = RecipeFilter {
        name: optional(&mut errors, "name", get("name"), non_empty_str),
        servings: optional(&mut errors, "servings", get("servings"), integer_from_str),
        time: optional(&mut errors, "time", get("time"), integer_from_str),
        reference: optional(&mut errors, "reference", get("reference"), non_empty_str),
        difficulty: optional(
            &mut errors,
            "difficulty",
            get("difficulty"),
            token_of(VocabularyKind::Difficulty),
        ),
        media: optional(&mut errors, "media", get("media"), token_of(VocabularyKind::Media)),
        taste: optional(&mut errors, "taste", get("taste"), token_of(VocabularyKind::Taste)),
        vegetarian: optional(&mut errors, "vegetarian", get("vegetarian"), boolean_from_str),
    };

    errors.finish(filter)
}

/// Builds a new recipe from a JSON payload.
pub fn recipe_data(
    payload: &Value,
    vocabularies: &Vocabularies,
) -> Result<RecipeData, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let object = match payload.as_object() {
        Some(object) => object,
        None => {
            errors.add("payload", "must be an object");
            return Err(errors);
        }
    };

    reject_unknown(object.keys().map(String::as_str), RECIPE_FIELDS, "", &mut errors);

    let token = |kind: VocabularyKind| {
        let vocabulary = vocabularies.get(kind);
        move |value: &Value| token_from_value(vocabulary, value)
    };

    let name = required(&mut errors, object, "", "name", non_empty_text);
    let description = required(&mut errors, object, "", "description", text);
    let servings = required(&mut errors, object, "", "servings", integer);
    let time = required(&mut errors, object, "", "time", integer);
    let reference = required(&mut errors, object, "", "reference", text);
    let difficulty = required(
        &mut errors,
        object,
        "",
        "difficulty",
        token(VocabularyKind::Difficulty),
    );
    let media = required(&mut errors, object, "", "media", token(VocabularyKind::Media));
    let taste = required(&mut errors, object, "", "taste", token(VocabularyKind::Taste));
    let vegetarian = required(&mut errors, object, "", "vegetarian", boolean);
    let ingredients = ingredients(
        &mut errors,
        object.get("ingredients"),
        vocabularies.get(VocabularyKind::Unit),
    );

    match (
        name,
        description,
        servings,
        time,
        reference,
        difficulty,
        media,
        taste,
        vegetarian,
        ingredients,
    ) {
        (
            Some(name),
            Some(description),
            Some(servings),
            Some(time),
            Some(reference),
            Some(difficulty),
            Some(media),
            Some(taste),
            Some(vegetarian),
            Some(ingredients),
        ) => errors.finish(RecipeData {
            name,
            description,
            servings,
            time,
            reference,
            difficulty,
            media,
            taste,
            vegetarian,
            ingredients,
        }),
        _ => Err(errors),
    }
}

fn ingredients(
    errors: &mut ValidationErrors,
    value: Option<&Value>,
    units: &Vocabulary,
) -> Option<Vec<Ingredient>> {
    let items = match value {
        None | Some(Value::Null) => return Some(vec![]),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("ingredients", "must be an array");
            return None;
        }
    };

    let mut ingredients = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let prefix = format!("ingredients[{}].", index);

        let object = match item.as_object() {
            Some(object) => object,
            None => {
                errors.add(format!("ingredients[{}]", index), "must be an object");
                continue;
            }
        };

        reject_unknown(object.keys().map(String::as_str), INGREDIENT_FIELDS, &prefix, errors);

        let name = required(errors, object, &prefix, "name", non_empty_text);
        let amount = required(errors, object, &prefix, "amount", number);
        let unit = required(errors, object, &prefix, "unit", |v: &Value| {
            token_from_value(units, v)
        });

        if let (Some(name), Some(amount), Some(unit)) = (name, amount, unit) {
            ingredients.push(Ingredient::new(name, amount, unit));
        }
    }

    if ingredients.len() == items.len() {
        Some(ingredients)
    } else {
        None
    }
}

fn reject_unknown<'a>(
    keys: impl Iterator<Item = &'a str>,
    allowed: &[&str],
    prefix: &str,
    errors: &mut ValidationErrors,
) {
    let mut unknown = keys.filter(|k| !allowed.contains(k)).collect::<Vec<_>>();
    // map iteration order is not stable
    unknown.sort_unstable();

    for key in unknown {
        errors.add(format!("{}{}", prefix, key), "is not allowed");
    }
}

fn optional<T>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<T> {
    raw.and_then(|raw| record(errors, field, parse(raw)))
}

fn required<T>(
    errors: &mut ValidationErrors,
    object: &Map<String, Value>,
    prefix: &str,
    key: &str,
    parse: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<T> {
    let field = format!("{}{}", prefix, key);

    match object.get(key) {
        None | Some(Value::Null) => {
            errors.add(field, "is required");
            None
        }
        Some(value) => record(errors, &field, parse(value)),
    }
}

fn record<T>(errors: &mut ValidationErrors, field: &str, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

fn text(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| "must be a string".to_owned())
}

fn non_empty_text(value: &Value) -> Result<String, String> {
    text(value).and_then(|s| non_empty_str(&s))
}

fn non_empty_str(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        Err("must not be empty".to_owned())
    } else {
        Ok(raw.to_owned())
    }
}

fn integer(value: &Value) -> Result<i32, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| "must be a number".to_owned())
            .and_then(integer_from_f64),
        Value::String(s) => integer_from_str(s),
        _ => Err("must be a number".to_owned()),
    }
}

fn integer_from_str(raw: &str) -> Result<i32, String> {
    number_from_str(raw).and_then(integer_from_f64)
}

fn integer_from_f64(number: f64) -> Result<i32, String> {
    if number.fract() != 0.0 {
        Err("must be an integer".to_owned())
    } else if number < f64::from(i32::MIN) || number > f64::from(i32::MAX) {
        Err("is out of range".to_owned())
    } else {
        Ok(number as i32)
    }
}

fn number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| "must be a number".to_owned()),
        Value::String(s) => number_from_str(s),
        _ => Err("must be a number".to_owned()),
    }
}

fn number_from_str(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err("must be a number".to_owned()),
    }
}

fn boolean(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => boolean_from_str(s),
        _ => Err("must be a boolean".to_owned()),
    }
}

fn boolean_from_str(raw: &str) -> Result<bool, String> {
    let raw = raw.trim().to_lowercase();

    if TRUTHY.contains(&raw.as_str()) {
        Ok(true)
    } else if FALSY.contains(&raw.as_str()) {
        Ok(false)
    } else {
        Err("must be a boolean".to_owned())
    }
}

fn token_from_value(vocabulary: &Vocabulary, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => token_from_str(vocabulary, s),
        _ => Err("must be a string".to_owned()),
    }
}

fn token_from_str(vocabulary: &Vocabulary, raw: &str) -> Result<String, String> {
    vocabulary
        .normalize(raw)
        .ok_or_else(|| format!("must be one of {}", vocabulary.describe()))
}
