//! Status codes for build orders and stock items.
//!
//! Codes are stored as integers and keep the numbering used by existing
//! installations, so a database exported elsewhere reads back unchanged.

use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BuildStatus {
    #[sea_orm(num_value = 10)]
    Pending,
    #[sea_orm(num_value = 20)]
    Production,
    #[sea_orm(num_value = 25)]
    OnHold,
    #[sea_orm(num_value = 30)]
    Cancelled,
    #[sea_orm(num_value = 40)]
    Complete,
}

impl BuildStatus {
    /// Statuses in which a build still accepts work
    pub const ACTIVE: [BuildStatus; 3] = [
        BuildStatus::Pending,
        BuildStatus::Production,
        BuildStatus::OnHold,
    ];

    pub fn code(self) -> i32 {
        self.into_value()
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::try_from_value(&code).ok()
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            BuildStatus::Pending => "Pending",
            BuildStatus::Production => "Production",
            BuildStatus::OnHold => "On Hold",
            BuildStatus::Cancelled => "Cancelled",
            BuildStatus::Complete => "Complete",
        }
    }

    /// Badge colour used by the page templates
    pub fn color(self) -> &'static str {
        match self {
            BuildStatus::Pending => "secondary",
            BuildStatus::Production => "primary",
            BuildStatus::OnHold => "warning",
            BuildStatus::Cancelled => "danger",
            BuildStatus::Complete => "success",
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn active_codes() -> Vec<i32> {
        Self::ACTIVE.iter().map(|s| s.code()).collect()
    }

    /// `{code: {key, label, color}}` map, as exposed to pages and `/api/build/status/`
    pub fn describe() -> serde_json::Value {
        let mut values = serde_json::Map::new();
        for status in Self::iter() {
            values.insert(
                status.code().to_string(),
                serde_json::json!({
                    "key": status.as_ref(),
                    "label": status.label(),
                    "color": status.color(),
                }),
            );
        }
        serde_json::Value::Object(values)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StockStatus {
    #[sea_orm(num_value = 10)]
    Ok,
    #[sea_orm(num_value = 50)]
    Attention,
    #[sea_orm(num_value = 55)]
    Damaged,
    #[sea_orm(num_value = 60)]
    Destroyed,
    #[sea_orm(num_value = 65)]
    Rejected,
    #[sea_orm(num_value = 70)]
    Lost,
    #[sea_orm(num_value = 75)]
    Quarantined,
    #[sea_orm(num_value = 85)]
    Returned,
}

impl StockStatus {
    pub fn code(self) -> i32 {
        self.into_value()
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::try_from_value(&code).ok()
    }

    pub fn label(self) -> &'static str {
        match self {
            StockStatus::Ok => "OK",
            StockStatus::Attention => "Attention needed",
            StockStatus::Damaged => "Damaged",
            StockStatus::Destroyed => "Destroyed",
            StockStatus::Rejected => "Rejected",
            StockStatus::Lost => "Lost",
            StockStatus::Quarantined => "Quarantined",
            StockStatus::Returned => "Returned",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            StockStatus::Ok => "success",
            StockStatus::Attention | StockStatus::Damaged | StockStatus::Returned => "warning",
            StockStatus::Destroyed | StockStatus::Rejected => "danger",
            StockStatus::Lost => "dark",
            StockStatus::Quarantined => "info",
        }
    }

    /// Same shape as [`BuildStatus::describe`]
    pub fn describe() -> serde_json::Value {
        let mut values = serde_json::Map::new();
        for status in Self::iter() {
            values.insert(
                status.code().to_string(),
                serde_json::json!({
                    "key": status.as_ref(),
                    "label": status.label(),
                    "color": status.color(),
                }),
            );
        }
        serde_json::Value::Object(values)
    }

    /// Stock in these states counts towards available quantity
    pub fn is_available(self) -> bool {
        matches!(self, StockStatus::Ok | StockStatus::Attention | StockStatus::Damaged)
    }

    pub fn available_codes() -> Vec<i32> {
        Self::iter()
            .filter(|s| s.is_available())
            .map(|s| s.code())
            .collect()
    }
}
