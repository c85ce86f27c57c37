use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};

use super::page::{csrf_token, escape, link, table, Page, PageContext};
use crate::{
    auth::AuthUser,
    entities::company,
    errors::ServiceError,
    services::company::{CompanyFilter, SupplierPartFilter, SupplierPartView},
    AppState,
};

fn supplier_part_rows(rows: &[SupplierPartView]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                link(&r.url, &r.supplier_part.sku),
                link(&r.part.get_absolute_url(), &r.part.full_name()),
                link(&r.supplier.get_absolute_url(), &r.supplier.name),
                escape(r.supplier_part.mpn.as_deref().unwrap_or("")),
            ]
        })
        .collect()
}

async fn company_list(
    state: AppState,
    title: &str,
    filter: CompanyFilter,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let companies = state.services.companies.list(filter).await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("companies", &companies)?
        .insert("title", title)?
        .insert("user", &user)?;

    let rows: Vec<Vec<String>> = companies
        .iter()
        .map(|c: &company::Model| {
            vec![
                link(&c.get_absolute_url(), &c.name),
                escape(&c.description),
                escape(&c.roles()),
            ]
        })
        .collect();

    Ok(Page::new(title, ctx)
        .body(table(&["Company", "Description", "Roles"], &rows))
        .render(&headers, Some(&user)))
}

/// `GET /company/`
pub async fn company_index(
    State(state): State<AppState>,
    Query(filter): Query<CompanyFilter>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    company_list(state, "Companies", filter, headers, user).await
}

/// `GET /company/suppliers/`
pub async fn supplier_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let filter = CompanyFilter {
        is_supplier: Some(true),
        ..Default::default()
    };
    company_list(state, "Suppliers", filter, headers, user).await
}

/// `GET /company/manufacturers/`
pub async fn manufacturer_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let filter = CompanyFilter {
        is_manufacturer: Some(true),
        ..Default::default()
    };
    company_list(state, "Manufacturers", filter, headers, user).await
}

/// `GET /company/customers/`
pub async fn customer_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let filter = CompanyFilter {
        is_customer: Some(true),
        ..Default::default()
    };
    company_list(state, "Customers", filter, headers, user).await
}

/// `GET /company/:pk/`
pub async fn company_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let companies = &state.services.companies;
    let company = companies.get(pk).await?;
    let supplied = companies
        .supplier_parts(SupplierPartFilter {
            supplier: Some(pk),
            ..Default::default()
        })
        .await?;
    let manufactured = companies
        .supplier_parts(SupplierPartFilter {
            manufacturer: Some(pk),
            ..Default::default()
        })
        .await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("company", &company)?
        .insert("supplier_parts", &supplied)?
        .insert("manufactured_parts", &manufactured)?
        .insert("user", &user)?;

    let columns = ["SKU", "Part", "Supplier", "MPN"];
    let mut body = format!(
        "<p class=\"description\">{}</p>\n<dl>\n<dt>Website</dt><dd>{}</dd>\n\
         <dt>Currency</dt><dd>{}</dd>\n<dt>Roles</dt><dd>{}</dd>\n</dl>\n",
        escape(&company.description),
        escape(company.website.as_deref().unwrap_or("")),
        escape(&company.currency),
        escape(&company.roles()),
    );
    if company.is_supplier {
        body.push_str("<h2>Supplier parts</h2>\n");
        body.push_str(&table(&columns, &supplier_part_rows(&supplied)));
    }
    if company.is_manufacturer {
        body.push_str("<h2>Manufactured parts</h2>\n");
        body.push_str(&table(&columns, &supplier_part_rows(&manufactured)));
    }

    Ok(Page::new(company.name.clone(), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}

/// `GET /supplier-part/:pk/`
pub async fn supplier_part_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let row = state.services.companies.supplier_part(pk).await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("supplier_part", &row.supplier_part)?
        .insert("part", &row.part)?
        .insert("supplier", &row.supplier)?
        .insert("manufacturer", &row.manufacturer)?
        .insert("user", &user)?;

    let body = format!(
        "<dl>\n<dt>Part</dt><dd>{part}</dd>\n<dt>Supplier</dt><dd>{supplier}</dd>\n\
         <dt>SKU</dt><dd>{sku}</dd>\n<dt>Manufacturer</dt><dd>{manufacturer}</dd>\n\
         <dt>MPN</dt><dd>{mpn}</dd>\n<dt>Pack quantity</dt><dd>{pack}</dd>\n</dl>\n",
        part = link(&row.part.get_absolute_url(), &row.part.full_name()),
        supplier = link(&row.supplier.get_absolute_url(), &row.supplier.name),
        sku = escape(&row.supplier_part.sku),
        manufacturer = row
            .manufacturer
            .as_ref()
            .map(|m| link(&m.get_absolute_url(), &m.name))
            .unwrap_or_default(),
        mpn = escape(row.supplier_part.mpn.as_deref().unwrap_or("")),
        pack = row.supplier_part.pack_quantity.normalize(),
    );

    Ok(Page::new(format!("Supplier Part {}", row.supplier_part.sku), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}
