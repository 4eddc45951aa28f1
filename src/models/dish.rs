use std::collections::HashSet;

use mongodb::{
    bson::{doc, oid::ObjectId},
    IndexModel,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    commons::{MealType, NutritionalInfo, Recipe, RecordStatus, timestamp},
    index,
    validation::{Checker, ValidationErrors},
    Model,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub meal_types: Vec<MealType>,
    #[serde(default)]
    pub recipe: Recipe,
    #[serde(default)]
    pub nutritional_info: NutritionalInfo,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub created_at: OffsetDateTime,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub updated_at: OffsetDateTime,
}

impl Dish {
    pub fn new(
        name: impl Into<String>,
        meal_types: Vec<MealType>,
        recipe: Recipe,
    ) -> Result<Self, ValidationErrors> {
        let now = timestamp();
        let dish = Self {
            id: None,
            name: name.into(),
            description: None,
            meal_types,
            recipe,
            nutritional_info: NutritionalInfo::default(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        dish.validate()?;
        Ok(dish)
    }

    pub fn served_at(&self, meal_type: MealType) -> bool {
        self.meal_types.contains(&meal_type)
    }
}

impl Model for Dish {
    const NAME: &'static str = "Dish";
    const COLLECTION: &'static str = "dishes";

    fn indexes() -> Vec<IndexModel> {
        vec![
            index(doc! { "name": 1 }, "dish_name_unique", true),
            index(doc! { "meal_types": 1 }, "dish_meal_types", false),
            index(doc! { "status": 1 }, "dish_status", false),
        ]
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.non_blank(&self.name, "name");
        c.check(!self.meal_types.is_empty(), "meal_types", "must list at least one meal type");
        let distinct: HashSet<_> = self.meal_types.iter().collect();
        c.check(
            distinct.len() == self.meal_types.len(),
            "meal_types",
            "must not repeat a meal type",
        );
        c.check(
            self.updated_at >= self.created_at,
            "updated_at",
            "must not precede created_at",
        );
        c.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Portion;
    use mongodb::bson;

    fn soup() -> Dish {
        let recipe = Recipe::new(vec![Portion::new(ObjectId::new(), 150.0, "g").unwrap()]);
        Dish::new("Sopa de verduras", vec![MealType::Lunch], recipe).unwrap()
    }

    #[test]
    fn builds_valid_dish() {
        let dish = soup();
        assert!(dish.served_at(MealType::Lunch));
        assert!(!dish.served_at(MealType::Snack));
    }

    #[test]
    fn requires_a_meal_type() {
        let err = Dish::new("Pan", vec![], Recipe::default()).unwrap_err();
        assert!(err.has_field("meal_types"));
    }

    #[test]
    fn rejects_repeated_meal_types() {
        let err = Dish::new("Pan", vec![MealType::Snack, MealType::Snack], Recipe::default())
            .unwrap_err();
        assert!(err.has_field("meal_types"));
    }

    #[test]
    fn stored_meal_types_use_tags() {
        let stored = bson::to_document(&soup()).unwrap();
        let tags = stored.get_array("meal_types").unwrap();
        assert_eq!(tags[0].as_str(), Some("almuerzo"));
    }

    #[test]
    fn invalid_portion_in_stored_dish_fails_to_load() {
        let mut stored = bson::to_document(&soup()).unwrap();
        stored.insert(
            "recipe",
            doc! { "ingredients": [ { "ingredient_id": ObjectId::new(), "quantity": 0.0, "unit": "g" } ] },
        );
        assert!(bson::from_document::<Dish>(stored).is_err());
    }
}
