use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    error::{missing_reference, QueryError, ServiceError, TypeError},
    form::Query,
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{Id, Recipe, RecipeDetail, RecipePart, RecipeRow, RecipeTag, User, UserProfile},
    validation::RecipeDraft,
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    follows::list_subscribed,
    ingredients::list_recipe_parts,
    relations::{list_related_recipes, RecipeRelation},
    tags::list_recipe_tags,
    users::list_users_by_id,
};

/// Filters accepted by the recipe list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_query(query: &Query) -> Result<Self, TypeError> {
        Ok(Self {
            author: query.get_number("author")?,
            tags: query.get_all("tags"),
            is_favorited: query.get_flag("is_favorited"),
            is_in_shopping_cart: query.get_flag("is_in_shopping_cart"),
        })
    }

    /// Favorite and cart filters are scoped to the viewer, so an anonymous
    /// viewer asking for them gets nothing back.
    pub fn matches_nothing(&self, viewer: Option<Id>) -> bool {
        viewer.is_none() && (self.is_favorited || self.is_in_shopping_cart)
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Recipe>, potion::Error> {
    if filter.matches_nothing(viewer) {
        return Ok(PageContext::no_rows(0, page));
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM tag_recipe tr INNER JOIN tags t ON t.id = tr.tag_id \
                 WHERE tr.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    query_builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.get(0).map(|row| row.count).unwrap_or(0);
    let rows: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();

    Ok(PageContext::from_rows(rows, total_count, page))
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_required(id: Id, pool: &Pool<Postgres>) -> Result<Recipe, potion::Error> {
    match get_recipe(id, pool).await? {
        Some(recipe) => Ok(recipe),
        None => {
            Err(ServiceError::NotFound("No recipe exists with specified id".to_owned()).into())
        }
    }
}

/// Only the author may change or delete a recipe.
pub fn ensure_author(recipe: &Recipe, session: &SessionData) -> Result<(), ServiceError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if recipe.author_id != session.user_id {
        return Err(ServiceError::PermissionDenied(
            "Only the author can modify this recipe".to_owned(),
        ));
    }
    Ok(())
}

pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe_required(id, pool).await?;
    ensure_author(&recipe, session)?;

    Ok(recipe)
}

/// Returns the first id in `wanted` that is absent from `found`.
pub fn first_missing(wanted: &[Id], found: &[Id]) -> Option<Id> {
    let found: HashSet<&Id> = found.iter().collect();
    wanted.iter().find(|id| !found.contains(id)).copied()
}

async fn ensure_references(draft: &RecipeDraft, conn: &mut PgConnection) -> Result<(), potion::Error> {
    let tags: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&draft.tags)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let tags: Vec<Id> = tags.into_iter().map(|row| row.0).collect();

    if let Some(id) = first_missing(&draft.tags, &tags) {
        return Err(ServiceError::NotFound(format!("Tag {id} does not exist")).into());
    }

    let wanted: Vec<Id> = draft.ingredients.iter().map(|(id, _)| *id).collect();
    let ingredients: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let ingredients: Vec<Id> = ingredients.into_iter().map(|row| row.0).collect();

    if let Some(id) = first_missing(&wanted, &ingredients) {
        return Err(ServiceError::NotFound(format!("Ingredient {id} does not exist")).into());
    }

    Ok(())
}

async fn insert_recipe_links(
    recipe_id: Id,
    draft: &RecipeDraft,
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO tag_recipe (recipe_id, tag_id) ");
    query_builder.push_values(draft.tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| missing_reference(e, "A referenced tag does not exist"))?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredient_recipe (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(draft.ingredients.iter(), |mut b, (ingredient_id, amount)| {
        b.push_bind(recipe_id)
            .push_bind(*ingredient_id)
            .push_bind(*amount);
    });
    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| missing_reference(e, "A referenced ingredient does not exist"))?;

    Ok(())
}

/// Inserts the recipe and all of its tag and ingredient links in one transaction.
pub async fn create_recipe(
    author_id: Id,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let image = match draft.image.as_deref() {
        Some(image) => image,
        None => {
            return Err(ServiceError::validation("image", "An image is required").into());
        }
    };

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_references(draft, &mut *tr).await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(image)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| missing_reference(e, "No user exists with specified id"))?;

    insert_recipe_links(recipe.id, draft, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {} created by user {}", recipe.id, author_id);
    Ok(recipe)
}

/// Replaces every tag and ingredient link of the recipe, then its scalar fields.
/// The stored image is kept when the draft carries none.
pub async fn update_recipe(
    id: Id,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_references(draft, &mut *tr).await?;

    sqlx::query("DELETE FROM tag_recipe WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM ingredient_recipe WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_links(id, draft, &mut *tr).await?;

    let recipe: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(draft.image.as_deref())
    .bind(id)
    .fetch_optional(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    let recipe = match recipe {
        Some(recipe) => recipe,
        None => {
            return Err(
                ServiceError::NotFound("No recipe exists with specified id".to_owned()).into(),
            );
        }
    };

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {} updated", recipe.id);
    Ok(recipe)
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(
            ServiceError::NotFound("No recipe exists with specified id".to_owned()).into(),
        );
    }

    log::info!("Recipe {id} deleted");
    Ok(())
}

/// Everything needed to render a batch of recipes for one viewer.
#[derive(Debug, Default)]
pub struct RecipeContext {
    pub parts: Vec<RecipePart>,
    pub tags: Vec<RecipeTag>,
    pub authors: Vec<User>,
    pub subscribed: HashSet<Id>,
    pub favorited: HashSet<Id>,
    pub in_cart: HashSet<Id>,
}

pub fn assemble_details(recipes: Vec<Recipe>, context: RecipeContext) -> Vec<RecipeDetail> {
    let mut parts: HashMap<Id, Vec<RecipePart>> = HashMap::new();
    context
        .parts
        .into_iter()
        .for_each(|part| parts.entry(part.recipe_id).or_default().push(part));

    let mut tags: HashMap<Id, Vec<RecipeTag>> = HashMap::new();
    context
        .tags
        .into_iter()
        .for_each(|tag| tags.entry(tag.recipe_id).or_default().push(tag));

    let authors: HashMap<Id, User> = context
        .authors
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    recipes
        .into_iter()
        .filter_map(|recipe| {
            let author = match authors.get(&recipe.author_id) {
                Some(author) => author.clone(),
                None => {
                    log::warn!("Recipe {} has no author row, skipping", recipe.id);
                    return None;
                }
            };
            let is_subscribed = context.subscribed.contains(&author.id);

            Some(RecipeDetail {
                id: recipe.id,
                tags: tags
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tag| tag.into())
                    .collect(),
                author: UserProfile::from_user(author, is_subscribed),
                ingredients: parts.remove(&recipe.id).unwrap_or_default(),
                is_favorited: context.favorited.contains(&recipe.id),
                is_in_shopping_cart: context.in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn describe_recipes(
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let context = RecipeContext {
        parts: list_recipe_parts(pool, &ids).await?,
        tags: list_recipe_tags(pool, &ids).await?,
        authors: list_users_by_id(pool, &author_ids).await?,
        subscribed: list_subscribed(viewer, &author_ids, pool).await?,
        favorited: list_related_recipes(RecipeRelation::Favorite, viewer, &ids, pool).await?,
        in_cart: list_related_recipes(RecipeRelation::ShoppingCart, viewer, &ids, pool).await?,
    };

    Ok(assemble_details(recipes, context))
}

pub async fn describe_recipe(
    recipe: Recipe,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    describe_recipes(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| ServiceError::NotFound("Recipe author does not exist".to_owned()).into())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::schema::UserRole;

    fn recipe(id: Id, author_id: Id) -> Recipe {
        Recipe {
            id,
            author_id,
            name: format!("Recipe {id}"),
            text: "Mix".into(),
            cooking_time: 10,
            image: "img.png".into(),
            pub_date: Utc::now(),
        }
    }

    fn user(id: Id) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            username: format!("user{id}"),
            first_name: "First".into(),
            last_name: "Last".into(),
            role: UserRole::User,
        }
    }

    fn session(user_id: Id) -> SessionData {
        SessionData {
            user_id,
            username: "cook".into(),
            role: UserRole::User,
        }
    }

    #[test]
    fn only_the_author_may_modify() {
        let recipe = recipe(1, 7);
        assert!(ensure_author(&recipe, &session(7)).is_ok());
        assert_eq!(ensure_author(&recipe, &session(8)).unwrap_err().status(), 403);
    }

    #[test]
    fn anonymous_viewer_with_scoped_flags_matches_nothing() {
        let query = Query::parse("is_favorited=1").unwrap();
        let filter = RecipeFilter::from_query(&query).unwrap();
        assert!(filter.matches_nothing(None));
        assert!(!filter.matches_nothing(Some(1)));

        let query = Query::parse("tags=lunch&tags=dinner&author=2").unwrap();
        let filter = RecipeFilter::from_query(&query).unwrap();
        assert!(!filter.matches_nothing(None));
        assert_eq!(filter.tags, vec!["lunch", "dinner"]);
        assert_eq!(filter.author, Some(2));
    }

    #[test]
    fn reports_missing_references() {
        assert_eq!(first_missing(&[1, 2, 3], &[3, 1]), Some(2));
        assert_eq!(first_missing(&[1, 2], &[2, 1]), None);
    }

    #[test]
    fn details_group_parts_tags_and_flags_per_recipe() {
        let recipes = vec![recipe(1, 10), recipe(2, 11)];
        let context = RecipeContext {
            parts: vec![
                RecipePart {
                    recipe_id: 1,
                    id: 100,
                    name: "Salt".into(),
                    measurement_unit: "g".into(),
                    amount: 10,
                },
                RecipePart {
                    recipe_id: 2,
                    id: 101,
                    name: "Water".into(),
                    measurement_unit: "ml".into(),
                    amount: 200,
                },
            ],
            tags: vec![RecipeTag {
                recipe_id: 2,
                id: 5,
                name: "Soup".into(),
                color: "#00FF00".into(),
                slug: "soup".into(),
            }],
            authors: vec![user(10), user(11)],
            subscribed: HashSet::from([11]),
            favorited: HashSet::from([1]),
            in_cart: HashSet::from([2]),
        };

        let details = assemble_details(recipes, context);
        assert_eq!(details.len(), 2);

        assert_eq!(details[0].ingredients.len(), 1);
        assert_eq!(details[0].ingredients[0].name, "Salt");
        assert!(details[0].tags.is_empty());
        assert!(details[0].is_favorited);
        assert!(!details[0].is_in_shopping_cart);
        assert!(!details[0].author.is_subscribed);

        assert_eq!(details[1].tags[0].slug, "soup");
        assert!(details[1].is_in_shopping_cart);
        assert!(details[1].author.is_subscribed);
    }

    #[test]
    fn recipes_without_author_rows_are_skipped() {
        let details = assemble_details(vec![recipe(1, 99)], RecipeContext::default());
        assert!(details.is_empty());
    }
}
