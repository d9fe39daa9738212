//! Category repository and hint matching.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use savora_core::matching::{match_category, MatchCandidate};

use crate::entities::{categories, sea_orm_active_enums::PostingKind};

/// Error types for category operations.
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    /// Category not found for this owner.
    #[error("Category not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    /// Owning user.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether the category is for income or expense postings.
    pub kind: PostingKind,
    /// Income in this category counts as passive in projections.
    pub is_passive: bool,
}

/// Category repository.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<categories::Model, CategoryError> {
        let now = chrono::Utc::now().into();
        let category = categories::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(input.user_id),
            name: Set(input.name),
            kind: Set(input.kind),
            is_passive: Set(input.is_passive),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let category = category.insert(&self.db).await?;
        Ok(category)
    }

    /// Lists a user's categories, optionally filtered by posting kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_categories(
        &self,
        user_id: Uuid,
        kind: Option<PostingKind>,
    ) -> Result<Vec<categories::Model>, CategoryError> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Name);

        if let Some(kind) = kind {
            query = query.filter(categories::Column::Kind.eq(kind));
        }

        let categories = query.all(&self.db).await?;
        Ok(categories)
    }

    /// Finds one of the user's categories by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_category(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<categories::Model>, CategoryError> {
        let category = categories::Entity::find_by_id(id)
            .filter(categories::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(category)
    }

    /// Resolves a free-text category hint against the user's active
    /// categories of the given kind.
    ///
    /// Tries exact name, then substring, then the fixed keyword table;
    /// returns `None` when nothing matches so the caller can fall back to a
    /// default category.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn match_hint(
        &self,
        user_id: Uuid,
        hint: &str,
        kind: PostingKind,
    ) -> Result<Option<categories::Model>, CategoryError> {
        let categories = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::Kind.eq(kind))
            .filter(categories::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        let candidates: Vec<MatchCandidate> = categories
            .iter()
            .map(|c| MatchCandidate {
                id: c.id,
                name: c.name.clone(),
            })
            .collect();

        let matched = match_category(hint, &candidates).map(|c| c.id);
        Ok(matched.and_then(|id| categories.into_iter().find(|c| c.id == id)))
    }
}
