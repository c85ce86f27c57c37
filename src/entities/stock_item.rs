use crate::status::StockStatus;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub part_id: i32,
    pub location_id: Option<i32>,
    /// Build that produced this item
    pub build_id: Option<i32>,
    pub quantity: Decimal,
    pub batch: Option<String>,
    pub serial: Option<String>,
    pub status: StockStatus,
    /// Still in production; not yet available stock
    pub is_building: bool,
    pub creation_date: NaiveDate,
    pub notes: Option<String>,
}

impl Model {
    pub fn get_absolute_url(&self) -> String {
        format!("/stock/item/{}/", self.id)
    }

    /// Counts towards available stock: finished and in a usable state
    pub fn is_available(&self) -> bool {
        !self.is_building && self.status.is_available()
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
        belongs_to = "super::stock_location::Entity",
        from = "Column::LocationId",
        to = "super::stock_location::Column::Id"
    )]
    Location,
    #[sea_orm(
        belongs_to = "super::build::Entity",
        from = "Column::BuildId",
        to = "super::build::Column::Id"
    )]
    Build,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl Related<super::stock_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::build::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Build.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            if let ActiveValue::NotSet = self.creation_date {
                self.creation_date = ActiveValue::Set(Local::now().date_naive());
            }
            if let ActiveValue::NotSet = self.status {
                self.status = ActiveValue::Set(StockStatus::Ok);
            }
            if let ActiveValue::NotSet = self.is_building {
                self.is_building = ActiveValue::Set(false);
            }
        }
        Ok(self)
    }
}
