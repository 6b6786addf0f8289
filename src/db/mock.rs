use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};

use crate::db::Db;
use crate::errors::BackendError;
use crate::recipe::{Recipe, RecipeData, RecipeFilter, RecipeId};
use crate::vocabulary::{Label, VocabularyKind};

/// How many times each operation has been invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub(crate) list: usize,
    pub(crate) retrieve: usize,
    pub(crate) insert: usize,
    pub(crate) delete: usize,
    pub(crate) vocabulary: usize,
}

impl Calls {
    pub(crate) fn total(&self) -> usize {
        self.list + self.retrieve + self.insert + self.delete + self.vocabulary
    }
}

/// An in-memory store that records every call made to it.
#[derive(Default)]
pub(crate) struct MockDb {
    pub(crate) recipes: RwLock<Vec<Recipe>>,
    calls: RwLock<Calls>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        MockDb {
            recipes: RwLock::new(recipes),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Calls {
        *self.calls.read().unwrap()
    }

    fn record(&self, count: impl FnOnce(&mut Calls)) {
        count(&mut self.calls.write().unwrap());
    }
}

impl Db for MockDb {
    fn list(&self, filter: &RecipeFilter) -> BoxFuture<Result<Vec<Recipe>, BackendError>> {
        self.record(|c| c.list += 1);

        let recipes = self
            .recipes
            .read()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        async move { Ok(recipes) }.boxed()
    }

    fn retrieve(&self, id: &RecipeId) -> BoxFuture<Result<Option<Recipe>, BackendError>> {
        self.record(|c| c.retrieve += 1);

        let recipe = self
            .recipes
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned();

        async move { Ok(recipe) }.boxed()
    }

    fn insert(&self, data: RecipeData) -> BoxFuture<Result<Recipe, BackendError>> {
        self.record(|c| c.insert += 1);

        let recipe = Recipe::new(RecipeId::generate(), data);
        self.recipes.write().unwrap().push(recipe.clone());

        async move { Ok(recipe) }.boxed()
    }

    fn delete(&self, id: &RecipeId) -> BoxFuture<Result<(), BackendError>> {
        self.record(|c| c.delete += 1);

        self.recipes.write().unwrap().retain(|r| r.id() != id);

        async move { Ok(()) }.boxed()
    }

    fn retrieve_vocabulary(
        &self,
        kind: VocabularyKind,
    ) -> BoxFuture<Result<Vec<Label>, BackendError>> {
        self.record(|c| c.vocabulary += 1);

        let tokens: &[&str] = match kind {
            VocabularyKind::Difficulty => &["easy", "medium", "hard"],
            VocabularyKind::Media => &["oven", "stove", "grill", "none"],
            VocabularyKind::Taste => &["sweet", "salty", "sour", "bitter", "umami", "spicy"],
            VocabularyKind::Unit => &["g", "kg", "ml", "l", "tsp", "tbsp", "piece"],
        };
        let labels = tokens.iter().map(|t| Label::new(*t, *t)).collect();

        async move { Ok(labels) }.boxed()
    }
}
