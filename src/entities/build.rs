use crate::reference::extract_int;
use crate::status::BuildStatus;
use chrono::{Local, NaiveDate};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A build order: an instruction to assemble `quantity` units of `part`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "builds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub reference: String,
    pub reference_int: i32,
    pub title: String,
    pub part_id: i32,
    pub quantity: i32,
    /// Number of units already completed
    pub completed: i32,
    pub batch: Option<String>,
    pub status: BuildStatus,
    pub creation_date: NaiveDate,
    pub target_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub issued_by: Option<i32>,
    pub completed_by: Option<i32>,
    pub responsible: Option<i32>,
    pub priority: i32,
    pub parent_id: Option<i32>,
    pub sales_order: Option<String>,
    pub link: Option<String>,
    pub notes: Option<String>,
}

impl Model {
    pub fn is_complete(&self) -> bool {
        self.status == BuildStatus::Complete
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Active, with a target date strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.target_date {
            Some(target) => self.is_active() && target < today,
            None => false,
        }
    }

    pub fn is_overdue_now(&self) -> bool {
        self.is_overdue(Local::now().date_naive())
    }

    pub fn remaining(&self) -> i32 {
        (self.quantity - self.completed).max(0)
    }

    pub fn get_absolute_url(&self) -> String {
        format!("/build/{}/", self.id)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::Id"
    )]
    Part,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::stock_item::Entity")]
    Outputs,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl Related<super::stock_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outputs.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(reference) = &self.reference {
            self.reference_int = ActiveValue::Set(extract_int(reference));
        }

        if insert {
            if let ActiveValue::NotSet = self.creation_date {
                self.creation_date = ActiveValue::Set(Local::now().date_naive());
            }
            if let ActiveValue::NotSet = self.status {
                self.status = ActiveValue::Set(BuildStatus::Pending);
            }
            if let ActiveValue::NotSet = self.completed {
                self.completed = ActiveValue::Set(0);
            }
            if let ActiveValue::NotSet = self.priority {
                self.priority = ActiveValue::Set(0);
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn build(status: BuildStatus, target_date: Option<NaiveDate>) -> Model {
        Model {
            id: 1,
            reference: "BO-0001".into(),
            reference_int: 1,
            title: "Building 7 parts".into(),
            part_id: 25,
            quantity: 7,
            completed: 0,
            batch: Some("B1".into()),
            status,
            creation_date: NaiveDate::from_ymd_opt(2019, 3, 16).unwrap(),
            target_date,
            completion_date: None,
            issued_by: None,
            completed_by: None,
            responsible: None,
            priority: 0,
            parent_id: None,
            sales_order: None,
            link: None,
            notes: None,
        }
    }

    #[test]
    fn overdue_needs_a_past_target_date() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert!(!build(BuildStatus::Pending, None).is_overdue(today));
        assert!(build(BuildStatus::Pending, Some(today - Duration::days(1))).is_overdue(today));
        assert!(!build(BuildStatus::Pending, Some(today)).is_overdue(today));
        assert!(!build(BuildStatus::Pending, Some(today + Duration::days(80))).is_overdue(today));
    }

    #[test]
    fn inactive_builds_are_never_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let yesterday = Some(today - Duration::days(1));

        assert!(!build(BuildStatus::Complete, yesterday).is_overdue(today));
        assert!(!build(BuildStatus::Cancelled, yesterday).is_overdue(today));
        assert!(build(BuildStatus::OnHold, yesterday).is_overdue(today));
    }

    #[test]
    fn remaining_never_negative() {
        let mut b = build(BuildStatus::Production, None);
        b.completed = 3;
        assert_eq!(b.remaining(), 4);
        b.completed = 9;
        assert_eq!(b.remaining(), 0);
    }

    #[test]
    fn displays_reference() {
        let b = build(BuildStatus::Pending, None);
        assert_eq!(b.to_string(), "BO-0001");
        assert_eq!(b.get_absolute_url(), "/build/1/");
        assert!(b.is_active());
        assert!(!b.is_complete());
    }
}
