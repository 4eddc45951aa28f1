use std::collections::HashSet;

use mongodb::{
    bson::{doc, oid::ObjectId},
    IndexModel,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    commons::{DailyMenu, RecordStatus, timestamp},
    index,
    validation::{Checker, ValidationErrors},
    Model,
};

/// A repeating plan of daily menus, `duration_days` long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCycle {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_days: u32,
    #[serde(default)]
    pub daily_menus: Vec<DailyMenu>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub created_at: OffsetDateTime,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub updated_at: OffsetDateTime,
}

impl MenuCycle {
    pub fn new(
        name: impl Into<String>,
        duration_days: u32,
        daily_menus: Vec<DailyMenu>,
    ) -> Result<Self, ValidationErrors> {
        let now = timestamp();
        let cycle = Self {
            id: None,
            name: name.into(),
            description: None,
            duration_days,
            daily_menus,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        cycle.validate()?;
        Ok(cycle)
    }

    pub fn menu_for_day(&self, day: u32) -> Option<&DailyMenu> {
        self.daily_menus.iter().find(|m| m.day() == day)
    }
}

impl Model for MenuCycle {
    const NAME: &'static str = "MenuCycle";
    const COLLECTION: &'static str = "menu_cycles";

    fn indexes() -> Vec<IndexModel> {
        vec![
            index(doc! { "name": 1 }, "menu_cycle_name_unique", true),
            index(doc! { "status": 1 }, "menu_cycle_status", false),
        ]
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.non_blank(&self.name, "name");
        c.check(self.duration_days >= 1, "duration_days", "must be at least 1");

        let mut seen = HashSet::new();
        for (i, menu) in self.daily_menus.iter().enumerate() {
            let field = format!("daily_menus[{}].day", i);
            c.check(
                menu.day() <= self.duration_days,
                &field,
                format!("day {} is beyond a {}-day cycle", menu.day(), self.duration_days),
            );
            c.check(
                seen.insert(menu.day()),
                &field,
                format!("day {} appears more than once", menu.day()),
            );
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
    use crate::models::MealType;

    #[test]
    fn looks_up_menu_by_day() {
        let dish = ObjectId::new();
        let cycle = MenuCycle::new(
            "Ciclo 1",
            5,
            vec![
                DailyMenu::new(1).unwrap(),
                DailyMenu::new(2).unwrap().with_dishes(MealType::Lunch, [dish]),
            ],
        )
        .unwrap();
        let day_two = cycle.menu_for_day(2).unwrap();
        assert_eq!(day_two.dish_ids(MealType::Lunch), &[dish]);
        assert!(cycle.menu_for_day(4).is_none());
    }

    #[test]
    fn rejects_zero_length_cycle() {
        let err = MenuCycle::new("Vacío", 0, vec![]).unwrap_err();
        assert!(err.has_field("duration_days"));
    }

    #[test]
    fn rejects_days_outside_the_cycle() {
        let err = MenuCycle::new("Corto", 2, vec![DailyMenu::new(3).unwrap()]).unwrap_err();
        assert!(err.has_field("daily_menus[0].day"));
    }

    #[test]
    fn rejects_duplicate_days() {
        let err = MenuCycle::new(
            "Doble",
            3,
            vec![DailyMenu::new(1).unwrap(), DailyMenu::new(1).unwrap()],
        )
        .unwrap_err();
        assert!(err.has_field("daily_menus[1].day"));
    }
}
