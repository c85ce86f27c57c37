//! Named fixture sets used to seed development and test databases.
//!
//! Each set inserts rows with fixed primary keys. Requesting a set also loads
//! the sets it depends on, and everything goes in a single transaction.

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, Statement, TransactionTrait,
};
use std::collections::BTreeSet;
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::{
    auth::AuthService,
    entities::{
        bom_item, build, company, part, part_category, stock_item, stock_location,
        supplier_part, user,
    },
    errors::ServiceError,
    status::{BuildStatus, StockStatus},
};

/// Password of every fixture user
pub const FIXTURE_PASSWORD: &str = "password";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FixtureSet {
    Users,
    Location,
    Category,
    Company,
    Part,
    SupplierPart,
    Bom,
    Stock,
    Build,
}

impl FixtureSet {
    /// Every set, in load order
    pub const ALL: [FixtureSet; 9] = [
        FixtureSet::Users,
        FixtureSet::Location,
        FixtureSet::Category,
        FixtureSet::Company,
        FixtureSet::Part,
        FixtureSet::SupplierPart,
        FixtureSet::Bom,
        FixtureSet::Stock,
        FixtureSet::Build,
    ];

    pub fn requires(self) -> &'static [FixtureSet] {
        match self {
            FixtureSet::Users | FixtureSet::Location | FixtureSet::Company => &[],
            FixtureSet::Category => &[FixtureSet::Location],
            FixtureSet::Part => &[FixtureSet::Category, FixtureSet::Location],
            FixtureSet::SupplierPart => &[FixtureSet::Part, FixtureSet::Company],
            FixtureSet::Bom => &[FixtureSet::Part],
            FixtureSet::Stock => &[FixtureSet::Part, FixtureSet::Location],
            FixtureSet::Build => &[FixtureSet::Part, FixtureSet::Users],
        }
    }

    fn table(self) -> &'static str {
        match self {
            FixtureSet::Users => "users",
            FixtureSet::Location => "stock_locations",
            FixtureSet::Category => "part_categories",
            FixtureSet::Company => "companies",
            FixtureSet::Part => "parts",
            FixtureSet::SupplierPart => "supplier_parts",
            FixtureSet::Bom => "bom_items",
            FixtureSet::Stock => "stock_items",
            FixtureSet::Build => "builds",
        }
    }
}

/// `sets` plus everything they depend on, in load order
pub fn resolve(sets: &[FixtureSet]) -> Vec<FixtureSet> {
    let mut resolved = BTreeSet::new();
    let mut pending: Vec<FixtureSet> = sets.to_vec();
    while let Some(set) = pending.pop() {
        if resolved.insert(set) {
            pending.extend_from_slice(set.requires());
        }
    }
    resolved.into_iter().collect()
}

#[derive(Debug, Clone, Default)]
pub struct FixtureReport {
    pub sets: Vec<FixtureSet>,
    pub rows: usize,
}

pub async fn load_all(db: &DatabaseConnection) -> Result<FixtureReport, ServiceError> {
    load(db, &FixtureSet::ALL).await
}

pub async fn load(
    db: &DatabaseConnection,
    sets: &[FixtureSet],
) -> Result<FixtureReport, ServiceError> {
    let sets = resolve(sets);
    let txn = db.begin().await?;
    let mut rows = 0;

    for set in &sets {
        let count = match set {
            FixtureSet::Users => load_users(&txn).await?,
            FixtureSet::Location => load_locations(&txn).await?,
            FixtureSet::Category => load_categories(&txn).await?,
            FixtureSet::Company => load_companies(&txn).await?,
            FixtureSet::Part => load_parts(&txn).await?,
            FixtureSet::SupplierPart => load_supplier_parts(&txn).await?,
            FixtureSet::Bom => load_bom(&txn).await?,
            FixtureSet::Stock => load_stock(&txn).await?,
            FixtureSet::Build => load_builds(&txn).await?,
        };
        debug!(set = %set, rows = count, "Fixture set loaded");
        rows += count;
    }

    if txn.get_database_backend() == DatabaseBackend::Postgres {
        for set in &sets {
            reset_sequence(&txn, set.table()).await?;
        }
    }

    txn.commit().await?;
    info!(sets = ?sets, rows, "Fixtures loaded");
    Ok(FixtureReport { sets, rows })
}

/// Explicit ids bypass Postgres sequences; move them past the loaded rows
async fn reset_sequence(txn: &DatabaseTransaction, table: &str) -> Result<(), ServiceError> {
    txn.execute(Statement::from_string(
        DatabaseBackend::Postgres,
        format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), (SELECT COALESCE(MAX(id), 1) FROM {table}))"
        ),
    ))
    .await?;
    Ok(())
}

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, ServiceError> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| ServiceError::InternalError(format!("invalid fixture date {y}-{m}-{d}")))
}

fn password_hash() -> Result<String, ServiceError> {
    // hashed once per process
    static HASH: OnceCell<String> = OnceCell::new();
    HASH.get_or_try_init(|| AuthService::hash_password(FIXTURE_PASSWORD))
        .cloned()
        .map_err(ServiceError::from)
}

async fn load_users(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let users = [
        (1, "admin", true, ""),
        (2, "testuser", false, "part.view,build.view,build.add,build.change,stock.view"),
        (3, "viewer", false, "viewer"),
        (4, "engineer", false, "engineer"),
    ];
    let hash = password_hash()?;
    for (id, username, is_superuser, roles) in users {
        user::ActiveModel {
            id: Set(id),
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set(hash.clone()),
            is_superuser: Set(is_superuser),
            is_active: Set(true),
            roles: Set(roles.to_string()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(users.len())
}

async fn load_locations(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let locations = [
        (1, "Home", "My house", None),
        (2, "Bathroom", "Where I keep my bath", Some(1)),
        (3, "Dining Room", "A table lives here", Some(1)),
        (4, "Office", "Place of work", None),
        (5, "Drawer_1", "In my desk", Some(4)),
    ];
    for (id, name, description, parent) in locations {
        stock_location::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            parent_id: Set(parent),
        }
        .insert(txn)
        .await?;
    }
    Ok(locations.len())
}

async fn load_categories(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let categories = [
        (1, "Electronics", "Electronic components", None, None),
        (2, "Resistors", "Resistors", Some(1), None),
        (3, "Capacitors", "Capacitors", Some(1), None),
        (4, "Mechanical", "Mechanical components", None, Some(4)),
        (5, "Fasteners", "Screws, bolts, etc", Some(4), Some(5)),
        (6, "Assemblies", "Things that get built", None, Some(1)),
    ];
    for (id, name, description, parent, location) in categories {
        part_category::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            parent_id: Set(parent),
            default_location_id: Set(location),
        }
        .insert(txn)
        .await?;
    }
    Ok(categories.len())
}

async fn load_companies(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let companies = [
        (1, "ACME", "A Cool Military Enterprise", true, false, false),
        (2, "Appel Computers", "Think more differenter", true, false, false),
        (3, "Zerg Corporation", "We build things", true, true, false),
        (4, "A customer", "A company that we sell things to", false, false, true),
    ];
    for (id, name, description, supplier, manufacturer, customer) in companies {
        company::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            website: Set(None),
            is_supplier: Set(supplier),
            is_manufacturer: Set(manufacturer),
            is_customer: Set(customer),
            currency: Set("USD".to_string()),
        }
        .insert(txn)
        .await?;
    }
    Ok(companies.len())
}

struct PartRow {
    id: i32,
    name: &'static str,
    description: &'static str,
    ipn: Option<&'static str>,
    category: i32,
    location: Option<i32>,
    assembly: bool,
    trackable: bool,
}

async fn load_parts(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let parts = [
        PartRow {
            id: 1,
            name: "M2x4 LPHS",
            description: "M2x4 low profile head screw",
            ipn: None,
            category: 5,
            location: None,
            assembly: false,
            trackable: false,
        },
        PartRow {
            id: 2,
            name: "M3x12 SHCS",
            description: "M3x12 socket head cap screw",
            ipn: None,
            category: 5,
            location: None,
            assembly: false,
            trackable: false,
        },
        PartRow {
            id: 3,
            name: "R_2K2_0805",
            description: "2.2kOhm resistor in 0805 package",
            ipn: Some("R_2K2_0805"),
            category: 2,
            location: Some(5),
            assembly: false,
            trackable: false,
        },
        PartRow {
            id: 4,
            name: "R_4K7_0603",
            description: "4.7kOhm resistor in 0603 package",
            ipn: Some("R_4K7_0603"),
            category: 2,
            location: Some(5),
            assembly: false,
            trackable: false,
        },
        PartRow {
            id: 5,
            name: "C_22N_0805",
            description: "22nF capacitor in 0805 package",
            ipn: Some("C_22N_0805"),
            category: 3,
            location: Some(5),
            assembly: false,
            trackable: false,
        },
        PartRow {
            id: 25,
            name: "Widget",
            description: "A watchamacallit",
            ipn: Some("WIDGET"),
            category: 6,
            location: Some(1),
            assembly: true,
            trackable: false,
        },
        PartRow {
            id: 50,
            name: "Gadget",
            description: "A tracked assembly",
            ipn: None,
            category: 6,
            location: Some(1),
            assembly: true,
            trackable: true,
        },
        PartRow {
            id: 100,
            name: "Bob",
            description: "Can we build it?",
            ipn: Some("BOB"),
            category: 6,
            location: Some(1),
            assembly: true,
            trackable: false,
        },
    ];
    let created = date(2019, 3, 1)?;
    for p in &parts {
        part::ActiveModel {
            id: Set(p.id),
            name: Set(p.name.to_string()),
            description: Set(p.description.to_string()),
            ipn: Set(p.ipn.map(str::to_string)),
            revision: Set(None),
            category_id: Set(Some(p.category)),
            default_location_id: Set(p.location),
            units: Set(String::new()),
            keywords: Set(None),
            active: Set(true),
            assembly: Set(p.assembly),
            component: Set(!p.assembly || p.id == 25),
            purchaseable: Set(!p.assembly),
            salable: Set(p.assembly),
            trackable: Set(p.trackable),
            is_template: Set(false),
            virtual_part: Set(false),
            minimum_stock: Set(Decimal::ZERO),
            creation_date: Set(created),
        }
        .insert(txn)
        .await?;
    }
    Ok(parts.len())
}

async fn load_supplier_parts(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let rows = [
        (1, 1, 1, "ACME0001", Some(3), Some("MPN-M2x4"), dec!(1)),
        (2, 1, 2, "ACME0002", None, None, dec!(1)),
        (3, 2, 1, "ZERGM312", Some(3), Some("MPN-M3x12"), dec!(100)),
        (4, 3, 2, "APL-2K2", None, None, dec!(5000)),
    ];
    for (id, part_id, supplier, sku, manufacturer, mpn, pack) in rows {
        supplier_part::ActiveModel {
            id: Set(id),
            part_id: Set(part_id),
            supplier_id: Set(supplier),
            sku: Set(sku.to_string()),
            manufacturer_id: Set(manufacturer),
            mpn: Set(mpn.map(str::to_string)),
            description: Set(None),
            link: Set(None),
            pack_quantity: Set(pack),
        }
        .insert(txn)
        .await?;
    }
    Ok(rows.len())
}

async fn load_bom(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let rows = [
        (1, 100, 1, dec!(10), "ABCDE", "", false),
        (2, 100, 2, dec!(40), "LMNOP", "", false),
        (3, 100, 3, dec!(25), "VWXYZ", "Hand solder", true),
        (4, 25, 1, dec!(3), "", "", false),
        (5, 25, 2, dec!(2.5), "", "Keep a spare", false),
    ];
    for (id, assembly, sub_part, quantity, reference, note, optional) in rows {
        bom_item::ActiveModel {
            id: Set(id),
            part_id: Set(assembly),
            sub_part_id: Set(sub_part),
            quantity: Set(quantity),
            reference: Set(reference.to_string()),
            overage: Set(String::new()),
            note: Set(note.to_string()),
            optional: Set(optional),
            consumable: Set(false),
            allow_variants: Set(false),
            inherited: Set(false),
        }
        .insert(txn)
        .await?;
    }
    Ok(rows.len())
}

async fn load_stock(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let rows = [
        (1, 1, Some(3), dec!(4000), Some("B123"), None, StockStatus::Ok),
        (2, 2, Some(3), dec!(5000), None, None, StockStatus::Ok),
        (3, 3, Some(5), dec!(1000), Some("B456"), None, StockStatus::Ok),
        (4, 4, Some(5), dec!(1234), None, None, StockStatus::Damaged),
        (5, 5, Some(5), dec!(100), None, None, StockStatus::Lost),
        (6, 50, Some(1), dec!(1), None, Some("1000"), StockStatus::Ok),
        (7, 25, None, dec!(3), Some("B5"), None, StockStatus::Quarantined),
    ];
    let created = date(2019, 5, 2)?;
    for (id, part_id, location, quantity, batch, serial, status) in rows {
        stock_item::ActiveModel {
            id: Set(id),
            part_id: Set(part_id),
            location_id: Set(location),
            build_id: Set(None),
            quantity: Set(quantity),
            batch: Set(batch.map(str::to_string)),
            serial: Set(serial.map(str::to_string)),
            status: Set(status),
            is_building: Set(false),
            creation_date: Set(created),
            notes: Set(None),
        }
        .insert(txn)
        .await?;
    }
    Ok(rows.len())
}

async fn load_builds(txn: &DatabaseTransaction) -> Result<usize, ServiceError> {
    let rows = [
        (1, 25, "Building 7 parts", 7, 0, "B1", BuildStatus::Pending, None),
        (2, 50, "Making things", 21, 21, "B2", BuildStatus::Complete, Some(date(2019, 4, 15)?)),
        (3, 50, "Making things", 2, 0, "B3", BuildStatus::Pending, None),
        (4, 50, "Making things", 4, 0, "B4", BuildStatus::Production, None),
        (5, 25, "Building stuff", 10, 10, "B5", BuildStatus::Complete, Some(date(2019, 6, 1)?)),
    ];
    let created = date(2019, 3, 16)?;
    for (id, part_id, title, quantity, completed, batch, status, completion_date) in rows {
        build::ActiveModel {
            id: Set(id),
            reference: Set(crate::reference::format_reference(id.into())),
            title: Set(title.to_string()),
            part_id: Set(part_id),
            quantity: Set(quantity),
            completed: Set(completed),
            batch: Set(Some(batch.to_string())),
            status: Set(status),
            creation_date: Set(created),
            target_date: Set(None),
            completion_date: Set(completion_date),
            issued_by: Set(Some(1)),
            completed_by: Set(completion_date.map(|_| 1)),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(rows.len())
}
