use crate::{
    error::{QueryError, ServiceError},
    schema::{Id, Ingredient, IngredientPayload, RecipePart},
};

use sqlx::{Pool, Postgres};

/// Lists ingredients, optionally only those whose name starts with `prefix`.
pub async fn search_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match prefix.filter(|prefix| !prefix.is_empty()) {
        Some(prefix) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE starts_with(name, $1) ORDER BY name, measurement_unit",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, measurement_unit")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_ingredient_required(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    match get_ingredient(id, pool).await? {
        Some(ingredient) => Ok(ingredient),
        None => Err(
            ServiceError::NotFound("No ingredient exists with specified id".to_owned()).into(),
        ),
    }
}

/// Inserts the ingredient unless the same name and unit already exist.
async fn insert_ingredient(
    payload: &IngredientPayload,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(payload.name.trim())
    .bind(payload.measurement_unit.trim())
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    payload: &IngredientPayload,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    match insert_ingredient(payload, pool).await? {
        Some(ingredient) => Ok(ingredient),
        None => Err(ServiceError::Conflict(
            "This ingredient already exists with the same measurement unit".to_owned(),
        )
        .into()),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub created: usize,
    pub existing: usize,
}

/// Get-or-create for every row. Rows already present are counted, not rejected.
pub async fn load_ingredients(
    rows: &[IngredientPayload],
    pool: &Pool<Postgres>,
) -> Result<LoadReport, potion::Error> {
    let mut report = LoadReport::default();

    for row in rows {
        match insert_ingredient(row, pool).await? {
            Some(ingredient) => {
                log::info!(
                    "Created {} ({})",
                    ingredient.name,
                    ingredient.measurement_unit
                );
                report.created += 1;
            }
            None => {
                log::warn!("{} ({}) already exists", row.name, row.measurement_unit);
                report.existing += 1;
            }
        }
    }

    Ok(report)
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<Vec<RecipePart>, potion::Error> {
    if recipe_ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<RecipePart> = sqlx::query_as("
        SELECT ir.recipe_id AS recipe_id, i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ir.amount AS amount
        FROM ingredient_recipe ir
        INNER JOIN ingredients i ON i.id = ir.ingredient_id
        WHERE ir.recipe_id = ANY($1)
        ORDER BY i.name
    ")
    .bind(recipe_ids)
    .fetch_all(pool).await.map_err(QueryError::from)?;

    Ok(rows)
}
