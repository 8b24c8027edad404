use std::collections::HashSet;

use crate::{
    config::RecipeLimits,
    constants::{INGREDIENT_NAME_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH, TAG_NAME_MAX_LENGTH},
    error::ServiceError,
    schema::{Id, IngredientPayload, RecipePayload, TagPayload},
};

/// A recipe payload that passed every field check.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<(Id, i32)>,
}

/// Checks a recipe payload field by field. `require_image` is set on creation,
/// updates keep the stored image when none is sent.
pub fn validate_recipe(
    payload: RecipePayload,
    limits: &RecipeLimits,
    require_image: bool,
) -> Result<RecipeDraft, ServiceError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("name", "This field may not be blank"));
    }
    if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(ServiceError::validation(
            "name",
            format!("Ensure this field has no more than {RECIPE_NAME_MAX_LENGTH} characters"),
        ));
    }

    if payload.text.trim().is_empty() {
        return Err(ServiceError::validation("text", "This field may not be blank"));
    }

    let cooking_time = validate_cooking_time(payload.cooking_time, limits)?;
    let tags = validate_tags(&payload.tags)?;

    let ingredients = validate_ingredients(
        payload
            .ingredients
            .iter()
            .map(|ingredient| (ingredient.id, ingredient.amount)),
        limits,
    )?;

    let image = payload.image.filter(|image| !image.trim().is_empty());
    if require_image && image.is_none() {
        return Err(ServiceError::validation("image", "An image is required"));
    }

    Ok(RecipeDraft {
        name,
        text: payload.text,
        cooking_time,
        image,
        tags,
        ingredients,
    })
}

pub fn validate_cooking_time(value: i64, limits: &RecipeLimits) -> Result<i32, ServiceError> {
    if value < limits.min_cooking_time as i64 {
        return Err(ServiceError::validation(
            "cooking_time",
            format!("Cooking time must be at least {}", limits.min_cooking_time),
        ));
    }
    if value > limits.max_cooking_time as i64 {
        return Err(ServiceError::validation(
            "cooking_time",
            format!("Cooking time must be at most {}", limits.max_cooking_time),
        ));
    }

    Ok(value as i32)
}

pub fn validate_tags(tags: &[Id]) -> Result<Vec<Id>, ServiceError> {
    if tags.is_empty() {
        return Err(ServiceError::validation("tags", "At least one tag is required"));
    }

    let mut seen = HashSet::new();
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(ServiceError::validation("tags", "Tags must not repeat"));
    }

    Ok(tags.to_vec())
}

pub fn validate_ingredients<I>(
    ingredients: I,
    limits: &RecipeLimits,
) -> Result<Vec<(Id, i32)>, ServiceError>
where
    I: IntoIterator<Item = (Id, i64)>,
{
    let mut seen = HashSet::new();
    let mut validated = vec![];

    for (id, amount) in ingredients {
        if !seen.insert(id) {
            return Err(ServiceError::validation(
                "ingredients",
                "Ingredients must not repeat",
            ));
        }
        if amount < limits.min_amount as i64 || amount > i32::MAX as i64 {
            return Err(ServiceError::validation(
                "ingredients",
                format!("Ingredient amount must be at least {}", limits.min_amount),
            ));
        }
        validated.push((id, amount as i32));
    }

    if validated.is_empty() {
        return Err(ServiceError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }

    Ok(validated)
}

/// Prevents a user from subscribing to themselves.
pub fn validate_follow(user_id: Id, following_id: Id) -> Result<(), ServiceError> {
    if user_id == following_id {
        return Err(ServiceError::validation(
            "following",
            "You cannot subscribe to yourself",
        ));
    }
    Ok(())
}

pub fn validate_tag(payload: &TagPayload) -> Result<(), ServiceError> {
    if payload.name.trim().is_empty() || payload.name.chars().count() > TAG_NAME_MAX_LENGTH {
        return Err(ServiceError::validation("name", "Invalid tag name"));
    }

    let color = payload.color.as_bytes();
    let is_hex = color.len() == 7
        && color[0] == b'#'
        && color[1..].iter().all(|c| c.is_ascii_hexdigit());
    if !is_hex {
        return Err(ServiceError::validation(
            "color",
            "Color must be written as #RRGGBB",
        ));
    }

    let is_slug = !payload.slug.is_empty()
        && payload
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !is_slug {
        return Err(ServiceError::validation(
            "slug",
            "Slug may only contain letters, numbers, hyphens and underscores",
        ));
    }

    Ok(())
}

pub fn validate_ingredient(payload: &IngredientPayload) -> Result<(), ServiceError> {
    if payload.name.trim().is_empty()
        || payload.name.chars().count() > INGREDIENT_NAME_MAX_LENGTH
    {
        return Err(ServiceError::validation("name", "Invalid ingredient name"));
    }
    if payload.measurement_unit.trim().is_empty() {
        return Err(ServiceError::validation(
            "measurement_unit",
            "This field may not be blank",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientAmount;

    fn payload() -> RecipePayload {
        RecipePayload {
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount { id: 10, amount: 5 },
                IngredientAmount { id: 11, amount: 1 },
            ],
            name: "Borscht".into(),
            text: "Boil everything".into(),
            cooking_time: 90,
            image: Some("data:image/png;base64,AAAA".into()),
        }
    }

    fn field_of(err: ServiceError) -> &'static str {
        match err {
            ServiceError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_well_formed_recipe() {
        let draft = validate_recipe(payload(), &RecipeLimits::default(), true).unwrap();
        assert_eq!(draft.tags, vec![1, 2]);
        assert_eq!(draft.ingredients, vec![(10, 5), (11, 1)]);
        assert_eq!(draft.cooking_time, 90);
    }

    #[test]
    fn rejects_duplicate_ingredients() {
        let mut p = payload();
        p.ingredients.push(IngredientAmount { id: 10, amount: 3 });
        let err = validate_recipe(p, &RecipeLimits::default(), true).unwrap_err();
        assert_eq!(field_of(err), "ingredients");
    }

    #[test]
    fn rejects_duplicate_tags() {
        let mut p = payload();
        p.tags = vec![4, 4];
        let err = validate_recipe(p, &RecipeLimits::default(), true).unwrap_err();
        assert_eq!(field_of(err), "tags");
    }

    #[test]
    fn rejects_cooking_time_out_of_bounds() {
        let limits = RecipeLimits::default();
        for time in [0, -5, 361, 10_000] {
            let mut p = payload();
            p.cooking_time = time;
            let err = validate_recipe(p, &limits, true).unwrap_err();
            assert_eq!(field_of(err), "cooking_time");
        }

        let mut p = payload();
        p.cooking_time = 360;
        assert!(validate_recipe(p, &limits, true).is_ok());
    }

    #[test]
    fn rejects_empty_tags_and_ingredients() {
        let mut p = payload();
        p.tags.clear();
        assert_eq!(
            field_of(validate_recipe(p, &RecipeLimits::default(), true).unwrap_err()),
            "tags"
        );

        let mut p = payload();
        p.ingredients.clear();
        assert_eq!(
            field_of(validate_recipe(p, &RecipeLimits::default(), true).unwrap_err()),
            "ingredients"
        );
    }

    #[test]
    fn rejects_amount_below_minimum() {
        let limits = RecipeLimits {
            min_amount: 2,
            ..RecipeLimits::default()
        };
        let err = validate_ingredients([(1, 1)], &limits).unwrap_err();
        assert_eq!(field_of(err), "ingredients");
        assert!(validate_ingredients([(1, 2)], &limits).is_ok());
    }

    #[test]
    fn image_is_only_required_on_create() {
        let mut p = payload();
        p.image = None;
        assert_eq!(
            field_of(validate_recipe(p.clone(), &RecipeLimits::default(), true).unwrap_err()),
            "image"
        );
        let draft = validate_recipe(p, &RecipeLimits::default(), false).unwrap();
        assert!(draft.image.is_none());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut p = payload();
        p.name = "   ".into();
        assert_eq!(
            field_of(validate_recipe(p, &RecipeLimits::default(), true).unwrap_err()),
            "name"
        );
    }

    #[test]
    fn self_follow_is_rejected() {
        let err = validate_follow(7, 7).unwrap_err();
        assert_eq!(err.to_string(), "following: You cannot subscribe to yourself");
        assert!(validate_follow(7, 8).is_ok());
    }

    #[test]
    fn tag_color_must_be_hex() {
        let mut tag = TagPayload {
            name: "Breakfast".into(),
            color: "#E26C2D".into(),
            slug: "breakfast".into(),
        };
        assert!(validate_tag(&tag).is_ok());

        tag.color = "orange".into();
        assert_eq!(field_of(validate_tag(&tag).unwrap_err()), "color");
    }
}
