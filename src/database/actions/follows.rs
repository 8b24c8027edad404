use std::collections::HashSet;

use crate::{
    error::{missing_reference, QueryError, ServiceError},
    pagination::{PageContext, PageRequest},
    schema::{Id, Recipe, RecipeSummary, Subscription, User, UserProfile, UserRow},
    validation::validate_follow,
};

use sqlx::{Pool, Postgres};

use super::{
    relations::check_affected,
    users::{count_recipes, get_user_required},
};

/// Authors in `author_ids` that the viewer follows. Empty for anonymous viewers.
pub async fn list_subscribed(
    viewer: Option<Id>,
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let viewer = match viewer {
        Some(viewer) if !author_ids.is_empty() => viewer,
        _ => return Ok(HashSet::new()),
    };

    let rows: Vec<(Id,)> = sqlx::query_as(
        "SELECT following_id FROM follows WHERE user_id = $1 AND following_id = ANY($2)",
    )
    .bind(viewer)
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Author profile plus their newest recipes, at most `recipes_limit` of them.
pub async fn build_subscription(
    author: User,
    is_subscribed: bool,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let recipes: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
    )
    .bind(author.id)
    .bind(recipes_limit.filter(|limit| *limit >= 0))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let recipes_count = count_recipes(author.id, pool).await?;

    Ok(Subscription {
        author: UserProfile::from_user(author, is_subscribed),
        recipes: recipes.iter().map(RecipeSummary::from).collect(),
        recipes_count,
    })
}

pub async fn subscribe(
    user_id: Id,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    validate_follow(user_id, author_id)?;
    let author = get_user_required(pool, author_id).await?;

    let result = sqlx::query(
        "INSERT INTO follows (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| missing_reference(e, "No user exists with specified id"))?;

    check_affected(
        result.rows_affected(),
        ServiceError::validation("following", "You are already subscribed to this user"),
    )?;

    log::info!("User {user_id} subscribed to {author_id}");
    build_subscription(author, true, recipes_limit, pool).await
}

pub async fn unsubscribe(
    user_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    get_user_required(pool, author_id).await?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND following_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    check_affected(
        result.rows_affected(),
        ServiceError::NotFound("You are not subscribed to this user".to_owned()),
    )?;

    log::info!("User {user_id} unsubscribed from {author_id}");
    Ok(())
}

pub async fn fetch_subscriptions(
    user_id: Id,
    page: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.following_id
        WHERE f.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.get(0).map(|row| row.count).unwrap_or(0);

    let mut subscriptions = Vec::with_capacity(rows.len());
    for row in rows {
        subscriptions.push(build_subscription(row.into(), true, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(subscriptions, total_count, page))
}
