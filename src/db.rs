use futures::future::BoxFuture;

use crate::errors::BackendError;
use crate::recipe::{Recipe, RecipeData, RecipeFilter, RecipeId};
use crate::vocabulary::{Label, VocabularyKind};

#[cfg(test)]
pub(crate) mod mock;

/// The persistence layer for recipes.
pub trait Db {
    /// Returns every recipe satisfying all the constraints in `filter`.
    fn list(&self, filter: &RecipeFilter) -> BoxFuture<Result<Vec<Recipe>, BackendError>>;

    fn retrieve(&self, id: &RecipeId) -> BoxFuture<Result<Option<Recipe>, BackendError>>;

    /// Stores a new recipe under a freshly generated ID.
    fn insert(&self, data: RecipeData) -> BoxFuture<Result<Recipe, BackendError>>;

    /// Removes the recipe if it exists. Removing a missing recipe is not
    /// an error.
    fn delete(&self, id: &RecipeId) -> BoxFuture<Result<(), BackendError>>;

    fn retrieve_vocabulary(
        &self,
        kind: VocabularyKind,
    ) -> BoxFuture<Result<Vec<Label>, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use std::collections::HashMap;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{self, postgres::PgPool};

    use crate::errors::BackendError;
    use crate::recipe::{Ingredient, Recipe, RecipeData, RecipeFilter, RecipeId};
    use crate::vocabulary::{Label, VocabularyKind};

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    #[derive(sqlx::FromRow)]
    struct RecipeRow {
        id: String,
        name: String,
        description: String,
        servings: i32,
        time: i32,
        reference: String,
        difficulty: String,
        media: String,
        taste: String,
        vegetarian: bool,
    }

    impl RecipeRow {
        fn into_recipe(self, ingredients: Vec<Ingredient>) -> Result<Recipe, BackendError> {
            let id = RecipeId::parse(&self.id).ok_or_else(|| BackendError::Sqlx {
                // only possible if something other than this service
                // wrote to the table
                source: sqlx::Error::Decode(format!("malformed recipe ID {:?}", self.id).into()),
            })?;

            Ok(Recipe::new(
                id,
                RecipeData {
                    name: self.name,
                    description: self.description,
                    servings: self.servings,
                    time: self.time,
                    reference: self.reference,
                    difficulty: self.difficulty,
                    media: self.media,
                    taste: self.taste,
                    vegetarian: self.vegetarian,
                    ingredients,
                },
            ))
        }
    }

    #[derive(sqlx::FromRow)]
    struct IngredientRow {
        recipe_id: String,
        name: String,
        amount: f64,
        unit: String,
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn list(&self, filter: &RecipeFilter) -> BoxFuture<Result<Vec<Recipe>, BackendError>> {
            let filter = filter.clone();

            async move {
                let query = sqlx::query_as::<_, RecipeRow>(include_str!("queries/list.sql"));

                let rows = query
                    .bind(filter.name)
                    .bind(filter.servings)
                    .bind(filter.time)
                    .bind(filter.reference)
                    .bind(filter.difficulty)
                    .bind(filter.media)
                    .bind(filter.taste)
                    .bind(filter.vegetarian)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                attach_ingredients(&self.pool, rows).await
            }
            .boxed()
        }

        fn retrieve(&self, id: &RecipeId) -> BoxFuture<Result<Option<Recipe>, BackendError>> {
            let id = id.clone();

            async move {
                let query = sqlx::query_as::<_, RecipeRow>(include_str!("queries/retrieve.sql"));

                let row = query
                    .bind(id.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                match row {
                    Some(row) => Ok(attach_ingredients(&self.pool, vec![row]).await?.pop()),
                    None => Ok(None),
                }
            }
            .boxed()
        }

        fn insert(&self, data: RecipeData) -> BoxFuture<Result<Recipe, BackendError>> {
            async move {
                let id = RecipeId::generate();

                let mut transaction = self.pool.begin().await.map_err(map_sqlx_error)?;

                sqlx::query(include_str!("queries/create.sql"))
                    .bind(id.as_str())
                    .bind(&data.name)
                    .bind(&data.description)
                    .bind(data.servings)
                    .bind(data.time)
                    .bind(&data.reference)
                    .bind(&data.difficulty)
                    .bind(&data.media)
                    .bind(&data.taste)
                    .bind(data.vegetarian)
                    .execute(&mut transaction)
                    .await
                    .map_err(map_sqlx_error)?;

                for (position, ingredient) in data.ingredients.iter().enumerate() {
                    sqlx::query(include_str!("queries/create_ingredient.sql"))
                        .bind(id.as_str())
                        .bind(position as i32)
                        .bind(&ingredient.name)
                        .bind(ingredient.amount)
                        .bind(&ingredient.unit)
                        .execute(&mut transaction)
                        .await
                        .map_err(map_sqlx_error)?;
                }

                transaction.commit().await.map_err(map_sqlx_error)?;

                Ok(Recipe::new(id, data))
            }
            .boxed()
        }

        fn delete(&self, id: &RecipeId) -> BoxFuture<Result<(), BackendError>> {
            let id = id.clone();

            async move {
                // ingredients go with it through `ON DELETE CASCADE`
                sqlx::query(include_str!("queries/delete.sql"))
                    .bind(id.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }

        fn retrieve_vocabulary(
            &self,
            kind: VocabularyKind,
        ) -> BoxFuture<Result<Vec<Label>, BackendError>> {
            async move {
                // the table name comes from a closed enum, never from input
                let sql = format!(
                    "SELECT token, label FROM {} ORDER BY position, token",
                    kind.table()
                );

                let rows: Vec<(String, String)> = sqlx::query_as(&sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows
                    .into_iter()
                    .map(|(token, label)| Label::new(token, label))
                    .collect())
            }
            .boxed()
        }
    }

    async fn attach_ingredients(
        pool: &PgPool,
        rows: Vec<RecipeRow>,
    ) -> Result<Vec<Recipe>, BackendError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids = rows.iter().map(|r| r.id.clone()).collect::<Vec<_>>();

        let ingredient_rows =
            sqlx::query_as::<_, IngredientRow>(include_str!("queries/retrieve_ingredients.sql"))
                .bind(ids)
                .fetch_all(pool)
                .await
                .map_err(map_sqlx_error)?;

        let mut by_recipe: HashMap<String, Vec<Ingredient>> = HashMap::new();

        // rows arrive ordered by position
        for row in ingredient_rows {
            by_recipe
                .entry(row.recipe_id)
                .or_default()
                .push(Ingredient::new(row.name, row.amount, row.unit));
        }

        rows.into_iter()
            .map(|row| {
                let ingredients = by_recipe.remove(&row.id).unwrap_or_default();
                row.into_recipe(ingredients)
            })
            .collect()
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        let constraint = match &error {
            Error::Database(e) => e.constraint().map(str::to_owned),
            _ => None,
        };

        if let Some(constraint) = constraint {
            return BackendError::ConstraintViolation { constraint };
        }

        match error {
            Error::PoolTimedOut | Error::PoolClosed | Error::Io(_) | Error::Tls(_) => {
                BackendError::StoreUnavailable { source: error }
            }
            _ => BackendError::Sqlx { source: error },
        }
    }
}
