use metrics::counter;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    entities::{
        bom_item::{self, Entity as BomItemEntity},
        part::{self, Entity as PartEntity},
    },
    errors::ServiceError,
    export::{Dataset, ExportFormat},
};

/// Column headers of a BOM export, in order
pub const BOM_EXPORT_HEADERS: [&str; 10] = [
    "Part",
    "Part_IPN",
    "Sub_part",
    "Sub_part_IPN",
    "Quantity",
    "Reference",
    "Overage",
    "Optional",
    "Consumable",
    "Note",
];

/// A BOM item together with the part it consumes
#[derive(Debug, Clone, Serialize)]
pub struct BomLine {
    #[serde(flatten)]
    pub item: bom_item::Model,
    pub sub_part: part::Model,
}

#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
}

impl BomService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// BOM lines of assembly `part_id`, ordered by sub part name
    #[instrument(skip(self), err)]
    pub async fn items_for(&self, part_id: i32) -> Result<Vec<BomLine>, ServiceError> {
        let rows = BomItemEntity::find()
            .filter(bom_item::Column::PartId.eq(part_id))
            .find_also_related(PartEntity)
            .order_by_asc(part::Column::Name)
            .order_by_asc(bom_item::Column::Id)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (item, sub_part) in rows {
            match sub_part {
                Some(sub_part) => lines.push(BomLine { item, sub_part }),
                None => warn!(bom_item = item.id, "BOM item references a missing part"),
            }
        }
        Ok(lines)
    }

    /// Tabular BOM of `part_id`; an assembly with no BOM exports only the header row
    #[instrument(skip(self), err)]
    pub async fn export(
        &self,
        part_id: i32,
        format: ExportFormat,
    ) -> Result<Dataset, ServiceError> {
        let assembly = PartEntity::find_by_id(part_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Part", part_id))?;

        let lines = self.items_for(part_id).await?;

        let mut dataset = Dataset::new(BOM_EXPORT_HEADERS);
        for line in &lines {
            dataset.push(vec![
                assembly.name.clone(),
                assembly.ipn.clone().unwrap_or_default(),
                line.sub_part.name.clone(),
                line.sub_part.ipn.clone().unwrap_or_default(),
                line.item.quantity.normalize().to_string(),
                line.item.reference.clone(),
                line.item.overage.clone(),
                line.item.optional.to_string(),
                line.item.consumable.to_string(),
                line.item.note.clone(),
            ]);
        }

        counter!("mrp_bom.exports", 1);
        info!(
            part_id,
            rows = dataset.len(),
            format = %format,
            "BOM export prepared"
        );
        Ok(dataset)
    }
}
