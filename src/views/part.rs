use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::page::{csrf_token, escape, link, table, Page, PageContext};
use crate::{
    auth::AuthUser,
    entities::part,
    errors::ServiceError,
    services::{
        company::SupplierPartFilter,
        part::{IpnMatch, PartFilter},
    },
    AppState,
};

pub const PART_INDEX_URL: &str = "/part/";

fn part_rows(parts: &[part::Model]) -> Vec<Vec<String>> {
    parts
        .iter()
        .map(|p| {
            vec![
                link(&p.get_absolute_url(), &p.name),
                escape(p.ipn.as_deref().unwrap_or("")),
                escape(&p.description),
            ]
        })
        .collect()
}

/// `GET /part/`
pub async fn part_index(
    State(state): State<AppState>,
    Query(filter): Query<PartFilter>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let parts = state.services.parts.list(filter).await?;
    let categories = state.services.parts.categories().await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("parts", &parts)?
        .insert("user", &user)?
        .insert("categories", &categories)?;

    let category_links: Vec<String> = categories
        .iter()
        .map(|c| format!("<li>{}</li>", link(&c.get_absolute_url(), &c.name)))
        .collect();

    let body = format!(
        "<h2>Categories</h2>\n<ul>{}</ul>\n<h2>Parts ({})</h2>\n{}",
        category_links.join(""),
        parts.len(),
        table(&["Part", "IPN", "Description"], &part_rows(&parts)),
    );

    Ok(Page::new("Parts", ctx).body(body).render(&headers, Some(&user)))
}

/// `GET /part/:pk/`
pub async fn part_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let part = state.services.parts.get(pk).await?;
    let category = state.services.parts.category_of(&part).await?;
    let bom_items = if part.assembly {
        state.services.bom.items_for(pk).await?
    } else {
        Vec::new()
    };
    let supplier_parts = state
        .services
        .companies
        .supplier_parts(SupplierPartFilter {
            part: Some(pk),
            ..Default::default()
        })
        .await?;
    let available = state.services.stock.available_quantity(pk).await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("part", &part)?
        .insert("category", &category)?
        .insert("bom_items", &bom_items)?
        .insert("supplier_parts", &supplier_parts)?
        .insert("available_stock", &available)?
        .insert("user", &user)?;

    let mut body = format!(
        "<p class=\"description\">{}</p>\n<dl>\n<dt>IPN</dt><dd>{}</dd>\n\
         <dt>Revision</dt><dd>{}</dd>\n<dt>Category</dt><dd>{}</dd>\n\
         <dt>Available stock</dt><dd>{}</dd>\n</dl>\n",
        escape(&part.description),
        escape(part.ipn.as_deref().unwrap_or("")),
        escape(part.revision.as_deref().unwrap_or("")),
        category
            .as_ref()
            .map(|c| link(&c.get_absolute_url(), &c.name))
            .unwrap_or_default(),
        available.normalize(),
    );

    if !supplier_parts.is_empty() {
        let rows: Vec<Vec<String>> = supplier_parts
            .iter()
            .map(|s| {
                vec![
                    link(&s.supplier.get_absolute_url(), &s.supplier.name),
                    link(&s.url, &s.supplier_part.sku),
                    escape(s.supplier_part.mpn.as_deref().unwrap_or("")),
                ]
            })
            .collect();
        body.push_str("<h2>Suppliers</h2>\n");
        body.push_str(&table(&["Supplier", "SKU", "MPN"], &rows));
    }

    if part.assembly {
        let rows: Vec<Vec<String>> = bom_items
            .iter()
            .map(|line| {
                vec![
                    link(&line.sub_part.get_absolute_url(), &line.sub_part.full_name()),
                    escape(&line.item.quantity.normalize().to_string()),
                    escape(&line.item.reference),
                    escape(&line.item.note),
                ]
            })
            .collect();
        body.push_str("<h2>Bill of Materials</h2>\n");
        body.push_str(&table(&["Sub part", "Quantity", "Reference", "Note"], &rows));
        body.push_str(&link(
            &format!("/api/part/{}/bom-download/?format=csv", part.id),
            "Download BOM",
        ));
    }

    Ok(Page::new(part.full_name(), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}

/// `GET /part/ipn/:ipn/`
///
/// A unique match goes to the part's page; no match or an ambiguous one
/// falls back to the part index.
pub async fn part_detail_from_ipn(
    State(state): State<AppState>,
    Path(ipn): Path<String>,
) -> Result<Response, ServiceError> {
    let target = match state.services.parts.resolve_ipn(&ipn).await? {
        IpnMatch::Unique(part) => part.get_absolute_url(),
        IpnMatch::None => PART_INDEX_URL.to_string(),
        IpnMatch::Multiple(count) => {
            debug!(ipn = %ipn, count, "Ambiguous IPN lookup");
            PART_INDEX_URL.to_string()
        }
    };
    Ok(Redirect::to(&target).into_response())
}

/// `GET /part/category/:pk/`
pub async fn category_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let path = state.services.parts.category_path(pk).await?;
    let category = state.services.parts.category(pk).await?;
    let children = state.services.parts.child_categories(pk).await?;
    let parts = state
        .services
        .parts
        .list(PartFilter {
            category: Some(pk),
            ..Default::default()
        })
        .await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("category", &category)?
        .insert("path", &path)?
        .insert("children", &children)?
        .insert("parts", &parts)?
        .insert("user", &user)?;

    let breadcrumbs: Vec<String> = path
        .iter()
        .map(|c| link(&c.get_absolute_url(), &c.name))
        .collect();
    let child_links: Vec<String> = children
        .iter()
        .map(|c| format!("<li>{}</li>", link(&c.get_absolute_url(), &c.name)))
        .collect();

    let body = format!(
        "<p class=\"breadcrumbs\">{}</p>\n<p>{}</p>\n<h2>Subcategories</h2>\n<ul>{}</ul>\n<h2>Parts</h2>\n{}",
        breadcrumbs.join(" / "),
        escape(&category.description),
        child_links.join(""),
        table(&["Part", "IPN", "Description"], &part_rows(&parts)),
    );

    Ok(Page::new(category.name.clone(), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}
