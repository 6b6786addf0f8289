use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The exact number of characters in a recipe ID.
pub const ID_LENGTH: usize = 25;

const ID_PREFIX: char = 'c';
const ID_RADIX: u32 = 36;

/// The store-assigned identifier of a recipe. Always exactly
/// [`ID_LENGTH`] characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct RecipeId(String);

impl RecipeId {
    /// Accepts `raw` as an ID if it has exactly the right length.
    ///
    /// ```
    /// use recipes::recipe::RecipeId;
    /// assert!(RecipeId::parse("abcdefghijklmnopqrstuvwxy").is_some());
    /// assert!(RecipeId::parse("abcdefghijklmnopqrstuvwx").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.chars().count() == ID_LENGTH {
            Some(RecipeId(raw.to_owned()))
        } else {
            None
        }
    }

    /// Creates a new random ID: the letter `c` followed by 24 base-36
    /// digits taken from a v4 UUID.
    pub fn generate() -> Self {
        let mut value = Uuid::new_v4().as_u128();
        let mut digits = ['0'; ID_LENGTH - 1];

        for digit in digits.iter_mut().rev() {
            let remainder = (value % ID_RADIX as u128) as u32;
            *digit = std::char::from_digit(remainder, ID_RADIX).unwrap_or('0');
            value /= ID_RADIX as u128;
        }

        RecipeId(std::iter::once(ID_PREFIX).chain(digits.iter().copied()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecipeId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecipeId::parse(&value)
            .ok_or_else(|| format!("recipe ID must be {} characters long", ID_LENGTH))
    }
}

/// A single recipe in the store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Recipe {
    /// The ID assigned by the store.
    pub(crate) id: RecipeId,

    /// Everything else about the recipe.
    #[serde(flatten)]
    pub(crate) data: RecipeData,
}

impl Recipe {
    pub fn new(id: RecipeId, data: RecipeData) -> Self {
        Recipe { id, data }
    }

    pub fn id(&self) -> &RecipeId {
        &self.id
    }

    pub fn data(&self) -> &RecipeData {
        &self.data
    }
}

/// A validated recipe that has not been assigned an ID yet.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RecipeData {
    /// The name of the dish. Never empty.
    pub(crate) name: String,

    pub(crate) description: String,

    /// How many people it feeds.
    pub(crate) servings: i32,

    /// Preparation time.
    pub(crate) time: i32,

    /// Where the recipe came from, e.g. a link.
    pub(crate) reference: String,

    /// A `difficulty` vocabulary token.
    pub(crate) difficulty: String,

    /// A `media` vocabulary token.
    pub(crate) media: String,

    /// A `taste` vocabulary token.
    pub(crate) taste: String,

    pub(crate) vegetarian: bool,

    /// In the order they were submitted.
    #[serde(default)]
    pub(crate) ingredients: Vec<Ingredient>,
}

impl RecipeData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }
}

/// A line item within a recipe.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Ingredient {
    pub(crate) name: String,
    pub(crate) amount: f64,

    /// A `unit` vocabulary token.
    pub(crate) unit: String,
}

impl Ingredient {
    pub fn new(name: String, amount: f64, unit: String) -> Self {
        Ingredient { name, amount, unit }
    }
}

/// Constraints for listing recipes. `None` means unconstrained.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipeFilter {
    pub(crate) name: Option<String>,
    pub(crate) servings: Option<i32>,
    pub(crate) time: Option<i32>,
    pub(crate) reference: Option<String>,
    pub(crate) difficulty: Option<String>,
    pub(crate) media: Option<String>,
    pub(crate) taste: Option<String>,
    pub(crate) vegetarian: Option<bool>,
}

impl RecipeFilter {
    /// Whether `recipe` satisfies every constraint. Text fields match
    /// case-insensitive substrings; everything else must be equal.
    pub fn matches(&self, recipe: &Recipe) -> bool {
        let data = &recipe.data;

        contains(&self.name, &data.name)
            && contains(&self.reference, &data.reference)
            && equals(&self.servings, &data.servings)
            && equals(&self.time, &data.time)
            && equals(&self.difficulty, &data.difficulty)
            && equals(&self.media, &data.media)
            && equals(&self.taste, &data.taste)
            && equals(&self.vegetarian, &data.vegetarian)
    }
}

fn contains(needle: &Option<String>, haystack: &str) -> bool {
    needle
        .as_ref()
        .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
}

fn equals<T: PartialEq>(expected: &Option<T>, actual: &T) -> bool {
    expected.as_ref().map_or(true, |e| e == actual)
}
