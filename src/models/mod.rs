mod commons;
mod dish;
mod ingredient;
mod menu_cycle;
mod menu_schedule;
mod validation;

pub use commons::{DailyMenu, MealType, NutritionalInfo, Portion, Recipe, RecordStatus, UnknownMealType};
pub use dish::Dish;
pub use ingredient::Ingredient;
pub use menu_cycle::MenuCycle;
pub use menu_schedule::MenuSchedule;
pub use validation::{ValidationError, ValidationErrors};

use mongodb::{
    bson,
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// A record type stored in its own collection.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    const NAME: &'static str;
    const COLLECTION: &'static str;

    fn indexes() -> Vec<IndexModel> {
        Vec::new()
    }

    fn validate(&self) -> Result<(), ValidationErrors>;

    fn collection(db: &Database) -> Collection<Self>
    where
        Self: Sized,
    {
        db.collection(Self::COLLECTION)
    }
}

pub(crate) fn index(keys: bson::Document, name: &str, unique: bool) -> IndexModel {
    let options = IndexOptions::builder()
        .name(name.to_string())
        .unique(unique)
        .build();
    IndexModel::builder().keys(keys).options(options).build()
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    name: &'static str,
    collection: &'static str,
    indexes: fn() -> Vec<IndexModel>,
}

/// Document models to set up when a connection is initialized.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<Registration>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingredient, Dish, MenuCycle and MenuSchedule.
    pub fn default_models() -> Self {
        Self::new()
            .register::<Ingredient>()
            .register::<Dish>()
            .register::<MenuCycle>()
            .register::<MenuSchedule>()
    }

    pub fn register<T: Model>(mut self) -> Self {
        if !self.models.iter().any(|m| m.collection == T::COLLECTION) {
            self.models.push(Registration {
                name: T::NAME,
                collection: T::COLLECTION,
                indexes: T::indexes,
            });
        }
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.name).collect()
    }

    /// Ensures the indexes of every registered model exist on `db`.
    pub async fn apply(&self, db: &Database) -> mongodb::error::Result<()> {
        for model in &self.models {
            let indexes = (model.indexes)();
            if indexes.is_empty() {
                continue;
            }
            let count = indexes.len();
            db.collection::<bson::Document>(model.collection)
                .create_indexes(indexes)
                .await?;
            debug!(model = model.name, collection = model.collection, count, "indexes ensured");
        }
        Ok(())
    }
}
