use crate::{
    error::{QueryError, ServiceError},
    pagination::{PageContext, PageRequest},
    schema::{Id, User, UserProfile, UserRow},
};

use sqlx::{Pool, Postgres};

use super::follows::list_subscribed;

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Id,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_required(pool: &Pool<Postgres>, user_id: Id) -> Result<User, potion::Error> {
    match get_user_by_id(pool, user_id).await? {
        Some(user) => Ok(user),
        None => Err(ServiceError::NotFound("No user exists with specified id".to_owned()).into()),
    }
}

pub async fn list_users_by_id(
    pool: &Pool<Postgres>,
    ids: &[Id],
) -> Result<Vec<User>, potion::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&*pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_users(
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<User>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2",
    )
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(&*pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.get(0).map(|row| row.count).unwrap_or(0);
    let rows = rows.into_iter().map(User::from).collect();

    Ok(PageContext::from_rows(rows, total_count, page))
}

pub async fn count_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(&*pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Profile of `user` as seen by `viewer`.
pub async fn get_profile(
    user: User,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, potion::Error> {
    let subscribed = list_subscribed(viewer, &[user.id], pool).await?;
    let is_subscribed = subscribed.contains(&user.id);

    Ok(UserProfile::from_user(user, is_subscribed))
}

pub async fn fetch_profiles(
    page: PageRequest,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, potion::Error> {
    let page = fetch_users(page, pool).await?;
    let ids: Vec<Id> = page.results.iter().map(|user| user.id).collect();
    let subscribed = list_subscribed(viewer, &ids, pool).await?;

    Ok(page.map(|user| {
        let is_subscribed = subscribed.contains(&user.id);
        UserProfile::from_user(user, is_subscribed)
    }))
}
