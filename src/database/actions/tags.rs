use crate::{
    error::{QueryError, ServiceError},
    schema::{Id, RecipeTag, Tag, TagPayload},
};

use sqlx::{Pool, Postgres};

pub async fn create_tag(payload: &TagPayload, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&payload.name)
    .bind(payload.color.to_uppercase())
    .bind(&payload.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match tag {
        Some(tag) => Ok(tag),
        None => Err(
            ServiceError::Conflict("A tag with this slug already exists".to_owned()).into(),
        ),
    }
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn get_tag_required(id: Id, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    match get_tag(id, pool).await? {
        Some(tag) => Ok(tag),
        None => Err(ServiceError::NotFound("No tag exists with specified id".to_owned()).into()),
    }
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<Vec<RecipeTag>, potion::Error> {
    if recipe_ids.is_empty() {
        return Ok(vec![]);
    }

    let list: Vec<RecipeTag> = sqlx::query_as(
        "
        SELECT tr.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM tag_recipe tr
        INNER JOIN tags t ON t.id = tr.tag_id
        WHERE tr.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
