use mongodb::{
    bson::{doc, oid::ObjectId},
    IndexModel,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    commons::{timestamp, RecordStatus},
    index,
    validation::{Checker, ValidationErrors},
    Model,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Unit portions of this ingredient are usually measured in, e.g. "g".
    pub base_unit: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub created_at: OffsetDateTime,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub updated_at: OffsetDateTime,
}

impl Ingredient {
    pub fn new(
        name: impl Into<String>,
        base_unit: impl Into<String>,
        category: Option<String>,
    ) -> Result<Self, ValidationErrors> {
        let now = timestamp();
        let ingredient = Self {
            id: None,
            name: name.into(),
            base_unit: base_unit.into(),
            category,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        ingredient.validate()?;
        Ok(ingredient)
    }
}

impl Model for Ingredient {
    const NAME: &'static str = "Ingredient";
    const COLLECTION: &'static str = "ingredients";

    fn indexes() -> Vec<IndexModel> {
        vec![
            index(doc! { "name": 1 }, "ingredient_name_unique", true),
            index(doc! { "status": 1 }, "ingredient_status", false),
        ]
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.non_blank(&self.name, "name");
        c.non_blank(&self.base_unit, "base_unit");
        if let Some(category) = &self.category {
            c.non_blank(category, "category");
        }
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
    use mongodb::bson;

    #[test]
    fn new_ingredient_is_active() {
        let rice = Ingredient::new("Arroz", "g", Some("cereales".into())).unwrap();
        assert_eq!(rice.status, RecordStatus::Active);
        assert!(rice.id.is_none());
    }

    #[test]
    fn rejects_blank_name_and_unit() {
        let err = Ingredient::new("", " ", None).unwrap_err();
        assert!(err.has_field("name"));
        assert!(err.has_field("base_unit"));
    }

    #[test]
    fn bson_document_omits_missing_id() {
        let rice = Ingredient::new("Arroz", "g", None).unwrap();
        let stored = bson::to_document(&rice).unwrap();
        assert!(!stored.contains_key("_id"));
        assert_eq!(stored.get_str("status").unwrap(), "active");

        let back: Ingredient = bson::from_document(stored).unwrap();
        assert_eq!(back, rice);
    }

    #[test]
    fn timestamps_are_stored_as_bson_dates() {
        let rice = Ingredient::new("Arroz", "g", None).unwrap();
        let stored = bson::to_document(&rice).unwrap();
        assert!(stored.get_datetime("created_at").is_ok());
        assert!(stored.get_datetime("updated_at").is_ok());
    }

    #[test]
    fn loads_documents_written_by_other_clients() {
        let written = bson::DateTime::now();
        let stored = doc! {
            "_id": ObjectId::new(),
            "name": "Lenteja",
            "base_unit": "g",
            "created_at": written,
            "updated_at": written,
        };
        let lentil: Ingredient = bson::from_document(stored).unwrap();
        assert_eq!(lentil.created_at, written.to_time_0_3());
        assert_eq!(lentil.status, RecordStatus::Active);
    }
}
