use mongodb::{
    bson::{doc, oid::ObjectId},
    IndexModel,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::{
    commons::{timestamp, RecordStatus},
    index,
    validation::{Checker, ValidationErrors},
    Model,
};

// ISO dates sort lexicographically, so range filters work on the stored strings.
time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Assignment of a menu cycle to a set of locations over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSchedule {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub menu_cycle_id: ObjectId,
    pub location_ids: Vec<String>,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub created_at: OffsetDateTime,
    #[serde(with = "bson::serde_helpers::time_0_3_offsetdatetime_as_bson_datetime")]
    pub updated_at: OffsetDateTime,
}

impl MenuSchedule {
    pub fn new(
        menu_cycle_id: ObjectId,
        location_ids: Vec<String>,
        start_date: Date,
        end_date: Date,
    ) -> Result<Self, ValidationErrors> {
        let now = timestamp();
        let schedule = Self {
            id: None,
            menu_cycle_id,
            location_ids,
            start_date,
            end_date,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Whether `date` falls inside the schedule, both ends included.
    pub fn covers(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl Model for MenuSchedule {
    const NAME: &'static str = "MenuSchedule";
    const COLLECTION: &'static str = "menu_schedules";

    fn indexes() -> Vec<IndexModel> {
        vec![
            index(doc! { "menu_cycle_id": 1 }, "menu_schedule_cycle", false),
            index(
                doc! { "start_date": 1, "end_date": 1 },
                "menu_schedule_date_range",
                false,
            ),
        ]
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.check(
            !self.location_ids.is_empty(),
            "location_ids",
            "must list at least one location",
        );
        for (i, location) in self.location_ids.iter().enumerate() {
            c.non_blank(location, &format!("location_ids[{}]", i));
        }
        c.check(
            self.end_date >= self.start_date,
            "end_date",
            "must not precede start_date",
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
    use mongodb::bson;
    use time::macros::date;

    fn term() -> MenuSchedule {
        MenuSchedule::new(
            ObjectId::new(),
            vec!["sede-norte".into()],
            date!(2024 - 02 - 05),
            date!(2024 - 06 - 28),
        )
        .unwrap()
    }

    #[test]
    fn covers_is_inclusive() {
        let schedule = term();
        assert!(schedule.covers(date!(2024 - 02 - 05)));
        assert!(schedule.covers(date!(2024 - 06 - 28)));
        assert!(!schedule.covers(date!(2024 - 06 - 29)));
    }

    #[test]
    fn rejects_inverted_range_and_missing_locations() {
        let err = MenuSchedule::new(
            ObjectId::new(),
            vec![],
            date!(2024 - 03 - 01),
            date!(2024 - 02 - 01),
        )
        .unwrap_err();
        assert!(err.has_field("end_date"));
        assert!(err.has_field("location_ids"));
    }

    #[test]
    fn rejects_blank_location() {
        let err = MenuSchedule::new(
            ObjectId::new(),
            vec!["sede-sur".into(), "".into()],
            date!(2024 - 03 - 01),
            date!(2024 - 03 - 01),
        )
        .unwrap_err();
        assert!(err.has_field("location_ids[1]"));
    }

    #[test]
    fn dates_are_stored_as_iso_strings() {
        let stored = bson::to_document(&term()).unwrap();
        assert_eq!(stored.get_str("start_date").unwrap(), "2024-02-05");
        assert_eq!(stored.get_str("end_date").unwrap(), "2024-06-28");
    }
}
