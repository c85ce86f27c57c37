use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplier_parts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub part_id: i32,
    pub supplier_id: i32,
    pub sku: String,
    pub manufacturer_id: Option<i32>,
    pub mpn: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub pack_quantity: Decimal,
}

impl Model {
    pub fn get_absolute_url(&self) -> String {
        format!("/supplier-part/{}/", self.id)
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
        belongs_to = "super::company::Entity",
        from = "Column::SupplierId",
        to = "super::company::Column::Id"
    )]
    Supplier,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Part.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
