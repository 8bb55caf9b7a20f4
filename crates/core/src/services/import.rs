//! Bulk loading of reference data from CSV files.
//!
//! Files have no header row. Ingredient rows are `name,measurement_unit`,
//! tag rows are `name,color,slug` with an optional `#RRGGBB` color. Rows
//! that already exist are skipped, so loading the same file twice is safe.

use std::collections::HashSet;
use std::io::Read;

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    entities::{ingredient, tag},
    repositories::{IngredientRepository, TagRepository},
};
use sea_orm::Set;
use tracing::info;

/// Outcome of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows written.
    pub inserted: usize,
    /// Rows already present (in the database or earlier in the file).
    pub skipped: usize,
}

/// Reference data import service.
#[derive(Clone)]
pub struct ImportService {
    tag_repo: TagRepository,
    ingredient_repo: IngredientRepository,
    id_gen: IdGenerator,
}

impl ImportService {
    /// Create a new import service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository, ingredient_repo: IngredientRepository) -> Self {
        Self {
            tag_repo,
            ingredient_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Load `name,measurement_unit` rows.
    pub async fn load_ingredients<R: Read>(&self, source: R) -> AppResult<ImportReport> {
        let rows: Vec<(String, String)> = read_rows(source)?;
        for (name, unit) in &rows {
            if name.is_empty() || unit.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "ingredient row `{name},{unit}` has an empty field"
                )));
            }
        }

        let mut report = ImportReport::default();
        let mut seen = HashSet::new();
        for (name, measurement_unit) in rows {
            if !seen.insert((name.clone(), measurement_unit.clone()))
                || self
                    .ingredient_repo
                    .find_by_name_and_unit(&name, &measurement_unit)
                    .await?
                    .is_some()
            {
                report.skipped += 1;
                continue;
            }

            self.ingredient_repo
                .create(ingredient::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    name: Set(name),
                    measurement_unit: Set(measurement_unit),
                })
                .await?;
            report.inserted += 1;
        }

        info!(inserted = report.inserted, skipped = report.skipped, "Ingredients loaded");
        Ok(report)
    }

    /// Load `name,color,slug` rows.
    pub async fn load_tags<R: Read>(&self, source: R) -> AppResult<ImportReport> {
        let rows: Vec<(String, String, String)> = read_rows(source)?;
        for (name, color, slug) in &rows {
            if name.is_empty() {
                return Err(AppError::BadRequest(format!("tag `{slug}` has no name")));
            }
            if !is_valid_slug(slug) {
                return Err(AppError::BadRequest(format!("invalid tag slug `{slug}`")));
            }
            if !color.is_empty() && !is_hex_color(color) {
                return Err(AppError::BadRequest(format!(
                    "tag `{slug}` has invalid color `{color}`, expected #RRGGBB"
                )));
            }
        }

        let mut report = ImportReport::default();
        let mut seen = HashSet::new();
        for (name, color, slug) in rows {
            if !seen.insert(slug.clone()) || self.tag_repo.find_by_slug(&slug).await?.is_some() {
                report.skipped += 1;
                continue;
            }

            self.tag_repo
                .create(tag::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    name: Set(name),
                    color: Set(Some(color).filter(|c| !c.is_empty())),
                    slug: Set(slug),
                })
                .await?;
            report.inserted += 1;
        }

        info!(inserted = report.inserted, skipped = report.skipped, "Tags loaded");
        Ok(report)
    }
}

fn read_rows<R, T>(source: R) -> AppResult<Vec<T>>
where
    R: Read,
    T: serde::de::DeserializeOwned,
{
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(source)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| AppError::BadRequest(format!("invalid CSV: {e}")))
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_service(db: MockDatabase) -> ImportService {
        let db: Arc<DatabaseConnection> = Arc::new(db.into_connection());
        ImportService::new(TagRepository::new(Arc::clone(&db)), IngredientRepository::new(db))
    }

    fn ingredient(id: &str, name: &str, unit: &str) -> ingredient::Model {
        ingredient::Model {
            id: id.to_string(),
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#E26C2D"));
        assert!(is_hex_color("#49b64e"));
        assert!(!is_hex_color("E26C2D"));
        assert!(!is_hex_color("#E26C2"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_read_rows_trims_fields() {
        let rows: Vec<(String, String)> = read_rows(" flour , g\nmilk,ml\n".as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                ("flour".to_string(), "g".to_string()),
                ("milk".to_string(), "ml".to_string()),
            ]
        );
    }

    #[test]
    fn test_read_rows_rejects_wrong_arity() {
        let err = read_rows::<_, (String, String)>("flour\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_load_ingredients_skips_existing_and_repeated() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                // "flour,g" already stored
                .append_query_results([[ingredient("i0", "flour", "g")]])
                // "milk,ml" is new
                .append_query_results([Vec::<ingredient::Model>::new()])
                .append_query_results([[ingredient("i1", "milk", "ml")]]),
        );

        let report = service
            .load_ingredients("flour,g\nmilk,ml\nmilk,ml\n".as_bytes())
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                inserted: 1,
                skipped: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_load_tags_validates_before_writing() {
        // No query results: a write attempt would fail the test.
        let service = create_test_service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = service
            .load_tags("Breakfast,#E26C2D,breakfast\nLunch,green,lunch\n".as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("green")));
    }

    #[tokio::test]
    async fn test_load_tags_without_color() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()])
                .append_query_results([[tag::Model {
                    id: "t1".to_string(),
                    name: "Dinner".to_string(),
                    color: None,
                    slug: "dinner".to_string(),
                }]]),
        );

        let report = service.load_tags("Dinner,,dinner\n".as_bytes()).await.unwrap();

        assert_eq!(report.inserted, 1);
    }
}
