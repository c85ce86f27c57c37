use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    /// Internal part number; not unique
    pub ipn: Option<String>,
    pub revision: Option<String>,
    pub category_id: Option<i32>,
    pub default_location_id: Option<i32>,
    pub units: String,
    pub keywords: Option<String>,
    pub active: bool,
    pub assembly: bool,
    pub component: bool,
    pub purchaseable: bool,
    pub salable: bool,
    pub trackable: bool,
    pub is_template: bool,
    pub virtual_part: bool,
    pub minimum_stock: Decimal,
    pub creation_date: NaiveDate,
}

impl Model {
    /// `IPN | name | revision`, leaving out whichever parts are unset
    pub fn full_name(&self) -> String {
        let mut name = String::new();
        if let Some(ipn) = self.ipn.as_deref().filter(|s| !s.is_empty()) {
            name.push_str(ipn);
            name.push_str(" | ");
        }
        name.push_str(&self.name);
        if let Some(revision) = self.revision.as_deref().filter(|s| !s.is_empty()) {
            name.push_str(" | ");
            name.push_str(revision);
        }
        name
    }

    pub fn get_absolute_url(&self) -> String {
        format!("/part/{}/", self.id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part_category::Entity",
        from = "Column::CategoryId",
        to = "super::part_category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::stock_location::Entity",
        from = "Column::DefaultLocationId",
        to = "super::stock_location::Column::Id"
    )]
    DefaultLocation,
    #[sea_orm(has_many = "super::build::Entity")]
    Builds,
    #[sea_orm(has_many = "super::supplier_part::Entity")]
    SupplierParts,
}

impl Related<super::part_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::build::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Builds.def()
    }
}

impl Related<super::supplier_part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierParts.def()
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
                self.creation_date = ActiveValue::Set(Utc::now().date_naive());
            }
        }

        // blank IPNs are stored as NULL so they never match a lookup
        if let ActiveValue::Set(Some(ipn)) = &self.ipn {
            let trimmed = ipn.trim();
            self.ipn = if trimmed.is_empty() {
                ActiveValue::Set(None)
            } else {
                ActiveValue::Set(Some(trimmed.to_string()))
            };
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn part(ipn: Option<&str>, revision: Option<&str>) -> Model {
        Model {
            id: 100,
            name: "Bob".into(),
            description: "Can we build it?".into(),
            ipn: ipn.map(str::to_string),
            revision: revision.map(str::to_string),
            category_id: None,
            default_location_id: None,
            units: String::new(),
            keywords: None,
            active: true,
            assembly: true,
            component: false,
            purchaseable: false,
            salable: false,
            trackable: false,
            is_template: false,
            virtual_part: false,
            minimum_stock: dec!(0),
            creation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn full_name_includes_ipn_and_revision() {
        assert_eq!(part(None, None).full_name(), "Bob");
        assert_eq!(part(Some("BOB"), None).full_name(), "BOB | Bob");
        assert_eq!(part(Some("BOB"), Some("A2")).full_name(), "BOB | Bob | A2");
        assert_eq!(part(Some(""), Some("A2")).full_name(), "Bob | A2");
    }

    #[test]
    fn absolute_url() {
        assert_eq!(part(None, None).get_absolute_url(), "/part/100/");
    }
}
