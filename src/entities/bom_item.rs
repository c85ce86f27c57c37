use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One line of an assembly's bill of materials
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bom_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The assembly
    pub part_id: i32,
    pub sub_part_id: i32,
    pub quantity: Decimal,
    /// Reference designators
    pub reference: String,
    pub overage: String,
    pub note: String,
    pub optional: bool,
    pub consumable: bool,
    pub allow_variants: bool,
    pub inherited: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::PartId",
        to = "super::part::Column::Id"
    )]
    Assembly,
    #[sea_orm(
        belongs_to = "super::part::Entity",
        from = "Column::SubPartId",
        to = "super::part::Column::Id"
    )]
    SubPart,
}

impl Related<super::part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubPart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
