//! Query-string parsing shared by list endpoints.

use foodgram_common::{AppError, AppResult};
use foodgram_core::RecipeQuery;

use crate::pagination::PageParams;

/// A `0`/`1` flag. Absent means `false`.
pub fn parse_flag(name: &str, raw: Option<&str>) -> AppResult<bool> {
    match raw {
        None | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(_) => Err(AppError::field(name, "must be 0 or 1")),
    }
}

/// `recipes_limit`: a non-negative integer, unlimited when absent.
pub fn parse_recipes_limit(raw: Option<&str>) -> AppResult<Option<u64>> {
    raw.map(|value| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::field("recipes_limit", "must be a non-negative integer"))
    })
    .transpose()
}

/// The last value of `key`, if present.
pub fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Recipe list filters plus paging from raw query pairs.
///
/// `tags` may be repeated and each value may hold comma-separated slugs.
pub fn recipe_query(pairs: &[(String, String)]) -> AppResult<(RecipeQuery, PageParams)> {
    let tags = pairs
        .iter()
        .filter(|(k, _)| k == "tags")
        .flat_map(|(_, v)| v.split(','))
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
        .collect();

    let query = RecipeQuery {
        author: last_value(pairs, "author")
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        tags,
        is_favorited: parse_flag("is_favorited", last_value(pairs, "is_favorited"))?,
        is_in_shopping_cart: parse_flag(
            "is_in_shopping_cart",
            last_value(pairs, "is_in_shopping_cart"),
        )?,
    };
    let page = PageParams {
        page: last_value(pairs, "page").map(str::to_string),
        limit: last_value(pairs, "limit").map(str::to_string),
    };

    Ok((query, page))
}
