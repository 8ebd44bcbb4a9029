use thiserror::Error;

use crate::models::LAST_SLOT;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No recipes available")]
    EmptyPool,

    #[error("Slot {slot} is out of range (expected 0..={max})", max = LAST_SLOT)]
    InvalidSlot { slot: usize },

    #[error("Shopping list item '{0}' not found")]
    ItemNotFound(String),

    #[error("No current meal plan")]
    PlanNotFound,

    #[error("Recipe '{0}' not found")]
    RecipeNotFound(String),

    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("Meal plan changed concurrently (expected version {expected}, found {found})")]
    VersionConflict { expected: u64, found: u64 },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type PlanResult<T> = Result<T, PlanError>;
