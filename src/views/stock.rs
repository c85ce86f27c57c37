use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};

use super::page::{csrf_token, escape, link, table, Page, PageContext};
use crate::{
    auth::{consts, AuthUser},
    errors::ServiceError,
    services::stock::{StockFilter, StockItemView},
    status::StockStatus,
    AppState,
};

/// Item actions and the permission each needs
const ITEM_ACTIONS: [(&str, &str, &str); 7] = [
    ("stock-count", "Count stock", consts::STOCK_CHANGE),
    ("stock-add", "Add stock", consts::STOCK_CHANGE),
    ("stock-remove", "Remove stock", consts::STOCK_CHANGE),
    ("stock-move", "Transfer stock", consts::STOCK_CHANGE),
    ("stock-duplicate", "Duplicate stock item", consts::STOCK_ADD),
    ("stock-edit", "Edit stock item", consts::STOCK_CHANGE),
    ("stock-delete", "Delete stock item", consts::STOCK_DELETE),
];

/// Ids of the actions `user` may take on a stock item
pub fn item_actions(user: &AuthUser) -> Vec<&'static str> {
    ITEM_ACTIONS
        .iter()
        .filter(|(_, _, permission)| user.has_permission(permission))
        .map(|(id, _, _)| *id)
        .collect()
}

fn item_rows(items: &[StockItemView]) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|i| {
            vec![
                link(&i.url, &i.part.full_name()),
                escape(&i.item.quantity.normalize().to_string()),
                escape(i.item.batch.as_deref().unwrap_or("")),
                i.location
                    .as_ref()
                    .map(|l| link(&l.get_absolute_url(), &l.name))
                    .unwrap_or_default(),
                format!(
                    "<span class=\"status-{}\">{}</span>",
                    i.item.status.color(),
                    escape(i.status_label)
                ),
            ]
        })
        .collect()
}

const ITEM_COLUMNS: [&str; 5] = ["Part", "Quantity", "Batch", "Location", "Status"];

/// `GET /stock/`
pub async fn stock_index(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let items = state.services.stock.list(filter).await?;
    let locations = state.services.stock.root_locations().await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("items", &items)?
        .insert("locations", &locations)?
        .insert("StockStatus", &StockStatus::describe())?
        .insert("user", &user)?;

    let location_links: Vec<String> = locations
        .iter()
        .map(|l| format!("<li>{}</li>", link(&l.get_absolute_url(), &l.name)))
        .collect();
    let body = format!(
        "<h2>Locations</h2>\n<ul>{}</ul>\n<h2>Stock items ({})</h2>\n{}",
        location_links.join(""),
        items.len(),
        table(&ITEM_COLUMNS, &item_rows(&items)),
    );

    Ok(Page::new("Stock", ctx).body(body).render(&headers, Some(&user)))
}

/// `GET /stock/location/:pk/`
pub async fn location_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let stock = &state.services.stock;
    let path = stock.location_path(pk).await?;
    let location = stock.location(pk).await?;
    let children = stock.locations(Some(pk)).await?;
    let items = stock
        .list(StockFilter {
            location: Some(pk),
            ..Default::default()
        })
        .await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("location", &location)?
        .insert("path", &path)?
        .insert("children", &children)?
        .insert("items", &items)?
        .insert("user", &user)?;

    let breadcrumbs: Vec<String> = path
        .iter()
        .map(|l| link(&l.get_absolute_url(), &l.name))
        .collect();
    let child_links: Vec<String> = children
        .iter()
        .map(|l| format!("<li>{}</li>", link(&l.get_absolute_url(), &l.name)))
        .collect();
    let body = format!(
        "<p class=\"breadcrumbs\">{}</p>\n<p>{}</p>\n<h2>Sublocations</h2>\n\
         <ul>{}</ul>\n<h2>Stock items</h2>\n{}",
        breadcrumbs.join(" / "),
        escape(&location.description),
        child_links.join(""),
        table(&ITEM_COLUMNS, &item_rows(&items)),
    );

    Ok(Page::new(location.name.clone(), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}

/// `GET /stock/item/:pk/`
pub async fn stock_item_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let item = state.services.stock.item(pk).await?;
    let actions = item_actions(&user);

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("item", &item)?
        .insert("part", &item.part)?
        .insert("location", &item.location)?
        .insert("actions", &actions)?
        .insert("user", &user)?;

    let quantity = item.item.quantity.normalize();
    let quantity_heading = if item.is_available {
        "Available Quantity"
    } else {
        "Quantity"
    };

    let buttons: String = ITEM_ACTIONS
        .iter()
        .filter(|(id, _, _)| actions.contains(id))
        .map(|(id, title, _)| {
            format!(
                "<button id=\"{}\" title=\"{}\"></button>",
                id,
                escape(title)
            )
        })
        .collect();

    let mut rows = vec![
        vec![
            "Part".to_string(),
            link(&item.part.get_absolute_url(), &item.part.full_name()),
        ],
        vec!["Status".to_string(), escape(item.status_label)],
    ];
    if let Some(location) = &item.location {
        rows.push(vec![
            "Location".to_string(),
            link(&location.get_absolute_url(), &location.name),
        ]);
    }
    if let Some(batch) = &item.item.batch {
        rows.push(vec!["Batch".to_string(), escape(batch)]);
    }
    if let Some(serial) = &item.item.serial {
        rows.push(vec!["Serial".to_string(), escape(serial)]);
    }

    let body = format!(
        "<h5>{}</h5>\n<h5>{}</h5>\n<div class=\"actions\">{}</div>\n{}",
        quantity_heading,
        quantity,
        buttons,
        table(&["", ""], &rows),
    );

    Ok(Page::new(format!("Stock Item: {}", item.part.name), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: 9,
            username: "clerk".into(),
            is_superuser: false,
            roles: Vec::new(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn actions_need_matching_rules() {
        assert!(item_actions(&user(&["stock.view"])).is_empty());
        assert_eq!(
            item_actions(&user(&["stock.add"])),
            vec!["stock-duplicate"]
        );
        assert_eq!(item_actions(&user(&["stock.*"])).len(), ITEM_ACTIONS.len());
    }
}
