use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use super::validation::{Checker, ValidationError, ValidationErrors};

/// Meal slot a dish is served in. Persisted by its tag, never by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealType {
    #[serde(rename = "desayuno")]
    Breakfast,
    #[serde(rename = "almuerzo")]
    Lunch,
    #[serde(rename = "refrigerio")]
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Snack];

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "desayuno",
            MealType::Lunch => "almuerzo",
            MealType::Snack => "refrigerio",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown meal type '{0}'; expected desayuno, almuerzo or refrigerio")]
pub struct UnknownMealType(pub String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMealType(s.to_string()))
    }
}

/// Current UTC time truncated to the millisecond precision of BSON dates.
pub(crate) fn timestamp() -> OffsetDateTime {
    bson::DateTime::now().to_time_0_3()
}

/// Lifecycle flag shared by every stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

/// Net amount of one ingredient in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PortionFields")]
pub struct Portion {
    ingredient_id: ObjectId,
    quantity: f64,
    unit: String,
}

#[derive(Deserialize)]
struct PortionFields {
    ingredient_id: ObjectId,
    quantity: f64,
    unit: String,
}

impl Portion {
    pub fn new(
        ingredient_id: ObjectId,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Result<Self, ValidationErrors> {
        let unit = unit.into();
        let mut c = Checker::default();
        c.check(
            quantity.is_finite() && quantity > 0.0,
            "quantity",
            "must be greater than 0",
        );
        c.check(!unit.is_empty(), "unit", "must not be empty");
        c.finish()?;
        Ok(Self {
            ingredient_id,
            quantity,
            unit,
        })
    }

    pub fn ingredient_id(&self) -> ObjectId {
        self.ingredient_id
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl TryFrom<PortionFields> for Portion {
    type Error = ValidationErrors;

    fn try_from(raw: PortionFields) -> Result<Self, Self::Error> {
        Portion::new(raw.ingredient_id, raw.quantity, raw.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub ingredients: Vec<Portion>,
}

impl Recipe {
    pub fn new(ingredients: Vec<Portion>) -> Self {
        Self { ingredients }
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }
}

/// Dishes served on one day of a menu cycle. Dish ids are not checked
/// against the dishes collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DailyMenuFields")]
pub struct DailyMenu {
    day: u32,
    breakfast_dish_ids: Vec<ObjectId>,
    lunch_dish_ids: Vec<ObjectId>,
    snack_dish_ids: Vec<ObjectId>,
}

// drivers and shells sometimes write whole numbers as doubles
#[derive(Deserialize)]
#[serde(untagged)]
enum DayNumber {
    Int(i64),
    Float(f64),
}

#[derive(Deserialize)]
struct DailyMenuFields {
    day: DayNumber,
    #[serde(default)]
    breakfast_dish_ids: Vec<ObjectId>,
    #[serde(default)]
    lunch_dish_ids: Vec<ObjectId>,
    #[serde(default)]
    snack_dish_ids: Vec<ObjectId>,
}

impl DailyMenu {
    pub fn new(day: i64) -> Result<Self, ValidationErrors> {
        let mut c = Checker::default();
        c.check(day >= 1, "day", "must be at least 1");
        c.check(day <= i64::from(u32::MAX), "day", "is out of range");
        c.finish()?;
        Ok(Self {
            day: day as u32,
            breakfast_dish_ids: Vec::new(),
            lunch_dish_ids: Vec::new(),
            snack_dish_ids: Vec::new(),
        })
    }

    pub fn with_dishes(mut self, meal_type: MealType, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.slot_mut(meal_type).extend(ids);
        self
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn dish_ids(&self, meal_type: MealType) -> &[ObjectId] {
        match meal_type {
            MealType::Breakfast => &self.breakfast_dish_ids,
            MealType::Lunch => &self.lunch_dish_ids,
            MealType::Snack => &self.snack_dish_ids,
        }
    }

    pub fn add_dish(&mut self, meal_type: MealType, id: ObjectId) {
        self.slot_mut(meal_type).push(id);
    }

    fn slot_mut(&mut self, meal_type: MealType) -> &mut Vec<ObjectId> {
        match meal_type {
            MealType::Breakfast => &mut self.breakfast_dish_ids,
            MealType::Lunch => &mut self.lunch_dish_ids,
            MealType::Snack => &mut self.snack_dish_ids,
        }
    }
}

impl TryFrom<DailyMenuFields> for DailyMenu {
    type Error = ValidationErrors;

    fn try_from(raw: DailyMenuFields) -> Result<Self, Self::Error> {
        let day = match raw.day {
            DayNumber::Int(day) => day,
            DayNumber::Float(day) if day.is_finite() && day.fract() == 0.0 => day as i64,
            DayNumber::Float(_) => {
                return Err(ValidationErrors(vec![ValidationError {
                    field: "day".into(),
                    message: "must be a whole number".into(),
                }]));
            }
        };
        let mut menu = DailyMenu::new(day)?;
        menu.breakfast_dish_ids = raw.breakfast_dish_ids;
        menu.lunch_dish_ids = raw.lunch_dish_ids;
        menu.snack_dish_ids = raw.snack_dish_ids;
        Ok(menu)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionalInfo {
    /// Calories per serving.
    #[serde(default)]
    pub calories: Option<f64>,
    /// Protein per serving, free text such as "45g".
    #[serde(default)]
    pub protein: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}
