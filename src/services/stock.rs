use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

use crate::{
    entities::{
        part::{self, Entity as PartEntity},
        stock_item::{self, Entity as StockItemEntity},
        stock_location::{self, Entity as StockLocationEntity},
    },
    errors::ServiceError,
    status::StockStatus,
};

/// Query filters for stock listings
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockFilter {
    pub part: Option<i32>,
    pub location: Option<i32>,
    /// Build that produced the item
    pub build: Option<i32>,
    /// Numeric status code
    pub status: Option<i32>,
    /// Finished items in a usable state
    pub available: Option<bool>,
    /// Matches batch or serial number
    pub search: Option<String>,
}

/// Stock item with its part and location
#[derive(Debug, Clone, Serialize)]
pub struct StockItemView {
    #[serde(flatten)]
    pub item: stock_item::Model,
    pub part: part::Model,
    pub location: Option<stock_location::Model>,
    pub status_label: &'static str,
    pub is_available: bool,
    pub url: String,
}

impl StockItemView {
    fn new(
        item: stock_item::Model,
        part: part::Model,
        location: Option<stock_location::Model>,
    ) -> Self {
        Self {
            status_label: item.status.label(),
            is_available: item.is_available(),
            url: item.get_absolute_url(),
            item,
            part,
            location,
        }
    }
}

/// Stock items and locations
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, pk: i32) -> Result<stock_item::Model, ServiceError> {
        StockItemEntity::find_by_id(pk)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("StockItem", pk))
    }

    #[instrument(skip(self), err)]
    pub async fn item(&self, pk: i32) -> Result<StockItemView, ServiceError> {
        let item = self.get(pk).await?;
        let part = PartEntity::find_by_id(item.part_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Part", item.part_id))?;
        let location = match item.location_id {
            Some(id) => Some(self.location(id).await?),
            None => None,
        };
        Ok(StockItemView::new(item, part, location))
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: StockFilter) -> Result<Vec<StockItemView>, ServiceError> {
        let mut query = StockItemEntity::find();

        if let Some(part) = filter.part {
            query = query.filter(stock_item::Column::PartId.eq(part));
        }
        if let Some(location) = filter.location {
            query = query.filter(stock_item::Column::LocationId.eq(location));
        }
        if let Some(build) = filter.build {
            query = query.filter(stock_item::Column::BuildId.eq(build));
        }
        if let Some(code) = filter.status {
            let status = StockStatus::from_code(code).ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown stock status {}", code))
            })?;
            query = query.filter(stock_item::Column::Status.eq(status));
        }
        if let Some(available) = filter.available {
            let usable = Condition::all()
                .add(stock_item::Column::IsBuilding.eq(false))
                .add(stock_item::Column::Status.is_in(StockStatus::available_codes()));
            query = query.filter(if available { usable } else { usable.not() });
        }
        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query = query.filter(
                Condition::any()
                    .add(stock_item::Column::Batch.contains(search))
                    .add(stock_item::Column::Serial.contains(search)),
            );
        }

        let items = query
            .order_by_asc(stock_item::Column::PartId)
            .order_by_asc(stock_item::Column::Id)
            .all(&*self.db)
            .await?;
        self.attach(items).await
    }

    /// Quantity of `part_id` that is finished and usable
    #[instrument(skip(self), err)]
    pub async fn available_quantity(&self, part_id: i32) -> Result<Decimal, ServiceError> {
        let items = StockItemEntity::find()
            .filter(stock_item::Column::PartId.eq(part_id))
            .all(&*self.db)
            .await?;
        Ok(items
            .iter()
            .filter(|i| i.is_available())
            .map(|i| i.quantity)
            .sum())
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(StockItemEntity::find().count(&*self.db).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn location(&self, pk: i32) -> Result<stock_location::Model, ServiceError> {
        StockLocationEntity::find_by_id(pk)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("StockLocation", pk))
    }

    /// Every location, or only the children of `parent` when given
    pub async fn locations(
        &self,
        parent: Option<i32>,
    ) -> Result<Vec<stock_location::Model>, ServiceError> {
        let mut query = StockLocationEntity::find();
        if let Some(parent) = parent {
            query = query.filter(stock_location::Column::ParentId.eq(parent));
        }
        Ok(query
            .order_by_asc(stock_location::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Top level locations
    pub async fn root_locations(&self) -> Result<Vec<stock_location::Model>, ServiceError> {
        Ok(StockLocationEntity::find()
            .filter(stock_location::Column::ParentId.is_null())
            .order_by_asc(stock_location::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Ancestors of location `pk` from the root down, ending with the location itself
    #[instrument(skip(self), err)]
    pub async fn location_path(
        &self,
        pk: i32,
    ) -> Result<Vec<stock_location::Model>, ServiceError> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(pk);

        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(ServiceError::InternalError(format!(
                    "Location tree contains a cycle at {}",
                    id
                )));
            }
            let location = self.location(id).await?;
            next = location.parent_id;
            path.push(location);
        }

        path.reverse();
        Ok(path)
    }

    async fn attach(
        &self,
        items: Vec<stock_item::Model>,
    ) -> Result<Vec<StockItemView>, ServiceError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let part_ids: Vec<i32> = items.iter().map(|i| i.part_id).collect();
        let location_ids: Vec<i32> = items.iter().filter_map(|i| i.location_id).collect();

        let parts: HashMap<i32, part::Model> = PartEntity::find()
            .filter(part::Column::Id.is_in(part_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let locations: HashMap<i32, stock_location::Model> = StockLocationEntity::find()
            .filter(stock_location::Column::Id.is_in(location_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        items
            .into_iter()
            .map(|item| {
                let part = parts
                    .get(&item.part_id)
                    .cloned()
                    .ok_or_else(|| ServiceError::not_found("Part", item.part_id))?;
                let location = item.location_id.and_then(|id| locations.get(&id).cloned());
                Ok(StockItemView::new(item, part, location))
            })
            .collect()
    }
}
