use crate::{
    error::QueryError,
    schema::{CartPart, Id},
    shopping_list::{aggregate, ShoppingListLine},
};

use sqlx::{Pool, Postgres};

/// Every ingredient quantity of every recipe in the user's cart, unmerged.
pub async fn list_cart_parts(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartPart>, potion::Error> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ir.amount AS amount
        FROM shopping_cart c
        INNER JOIN ingredient_recipe ir ON ir.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ir.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn build_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListLine>, potion::Error> {
    let parts = list_cart_parts(user_id, pool).await?;
    log::trace!("Aggregating {} cart rows for user {user_id}", parts.len());

    Ok(aggregate(parts))
}
