use std::collections::HashSet;

use crate::{
    error::{missing_reference, QueryError, ServiceError},
    schema::{Id, RecipeSummary},
};

use sqlx::{Pool, Postgres};

use super::recipes::get_recipe_required;

/// Per-user recipe lists that share the same add/remove rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeRelation {
    Favorite,
    ShoppingCart,
}

impl RecipeRelation {
    fn table(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "favorites",
            RecipeRelation::ShoppingCart => "shopping_cart",
        }
    }

    fn already_added(&self) -> ServiceError {
        ServiceError::Conflict(
            match self {
                RecipeRelation::Favorite => "Recipe is already in favorites",
                RecipeRelation::ShoppingCart => "Recipe is already in the shopping cart",
            }
            .to_owned(),
        )
    }

    fn not_added(&self) -> ServiceError {
        ServiceError::NotFound(
            match self {
                RecipeRelation::Favorite => "Recipe is not in favorites",
                RecipeRelation::ShoppingCart => "Recipe is not in the shopping cart",
            }
            .to_owned(),
        )
    }
}

/// Turns a zero row count into the given failure.
pub fn check_affected(rows_affected: u64, err: ServiceError) -> Result<(), ServiceError> {
    if rows_affected == 0 {
        return Err(err);
    }
    Ok(())
}

pub async fn add_relation(
    relation: RecipeRelation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, potion::Error> {
    let recipe = get_recipe_required(recipe_id, pool).await?;

    let query = format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        relation.table()
    );
    // The recipe may be deleted between the lookup above and this insert.
    let result = sqlx::query(&query)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| missing_reference(e, "No recipe exists with specified id"))?;

    check_affected(result.rows_affected(), relation.already_added())?;

    log::debug!("User {user_id} added recipe {recipe_id} to {}", relation.table());
    Ok(RecipeSummary::from(&recipe))
}

pub async fn remove_relation(
    relation: RecipeRelation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    get_recipe_required(recipe_id, pool).await?;

    let query = format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        relation.table()
    );
    let result = sqlx::query(&query)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    check_affected(result.rows_affected(), relation.not_added())?;

    log::debug!("User {user_id} removed recipe {recipe_id} from {}", relation.table());
    Ok(())
}

/// Which of `recipe_ids` the viewer has in the given list. Empty for anonymous viewers.
pub async fn list_related_recipes(
    relation: RecipeRelation,
    viewer: Option<Id>,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let viewer = match viewer {
        Some(viewer) if !recipe_ids.is_empty() => viewer,
        _ => return Ok(HashSet::new()),
    };

    let query = format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        relation.table()
    );
    let rows: Vec<(Id,)> = sqlx::query_as(&query)
        .bind(viewer)
        .bind(recipe_ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_add_is_a_conflict() {
        let err = check_affected(0, RecipeRelation::Favorite.already_added()).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Recipe is already in favorites");
        assert!(check_affected(1, RecipeRelation::Favorite.already_added()).is_ok());
    }

    #[test]
    fn removing_a_missing_relation_is_not_found() {
        let err = check_affected(0, RecipeRelation::ShoppingCart.not_added()).unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "Recipe is not in the shopping cart");
    }

    #[test]
    fn relations_use_their_own_tables() {
        assert_eq!(RecipeRelation::Favorite.table(), "favorites");
        assert_eq!(RecipeRelation::ShoppingCart.table(), "shopping_cart");
    }
}
