use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};

use super::page::{csrf_token, escape, link, table, Page, PageContext};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::build::{BuildFilter, BuildView},
    status::BuildStatus,
    AppState,
};

/// `GET /build/`
pub async fn build_index(
    State(state): State<AppState>,
    Query(filter): Query<BuildFilter>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let builds: Vec<BuildView> = state
        .services
        .builds
        .list(filter)
        .await?
        .into_iter()
        .map(BuildView::from)
        .collect();

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("builds", &builds)?
        .insert("BuildStatus", &BuildStatus::describe())?
        .insert("user", &user)?;

    let rows: Vec<Vec<String>> = builds
        .iter()
        .map(|b| {
            vec![
                link(&b.url, &b.build.reference),
                escape(&b.build.title),
                format!("{} / {}", b.build.completed, b.build.quantity),
                format!(
                    "<span class=\"status-{}\">{}</span>",
                    b.build.status.color(),
                    escape(b.status_label)
                ),
                b.build
                    .target_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                if b.is_overdue { "overdue".into() } else { String::new() },
            ]
        })
        .collect();

    let body = table(
        &["Reference", "Title", "Completed", "Status", "Target date", ""],
        &rows,
    );

    Ok(Page::new("Build Orders", ctx)
        .body(body)
        .render(&headers, Some(&user)))
}

/// `GET /build/:pk/`
pub async fn build_detail(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let build = BuildView::from(state.services.builds.get(pk).await?);
    let part = state.services.parts.get(build.build.part_id).await?;
    let outputs = state.services.builds.outputs(pk, None).await?;

    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &csrf_token())?
        .insert("build", &build)?
        .insert("part", &part)?
        .insert("outputs", &outputs)?
        .insert("BuildStatus", &BuildStatus::describe())?
        .insert("user", &user)?;

    let output_rows: Vec<Vec<String>> = outputs
        .iter()
        .map(|o| {
            vec![
                o.id.to_string(),
                escape(&o.quantity.normalize().to_string()),
                escape(o.batch.as_deref().unwrap_or("")),
                if o.is_building {
                    "In production".into()
                } else {
                    "Complete".into()
                },
            ]
        })
        .collect();

    let body = format!(
        "<p class=\"title\">{title}</p>\n<dl>\n<dt>Part</dt><dd>{part}</dd>\n<dt>Quantity</dt><dd>{qty}</dd>\n\
         <dt>Completed</dt><dd>{done}</dd>\n<dt>Status</dt><dd>{status}</dd>\n<dt>Batch</dt><dd>{batch}</dd>\n\
         <dt>Target date</dt><dd>{target}</dd>\n</dl>\n<h2>Build outputs</h2>\n{outputs}",
        title = escape(&build.build.title),
        part = link(&part.get_absolute_url(), &part.full_name()),
        qty = build.build.quantity,
        done = build.build.completed,
        status = escape(build.status_label),
        batch = escape(build.build.batch.as_deref().unwrap_or("")),
        target = build
            .build
            .target_date
            .map(|d| d.to_string())
            .unwrap_or_default(),
        outputs = table(&["Item", "Quantity", "Batch", "State"], &output_rows),
    );

    Ok(Page::new(format!("Build Order {}", build.build.reference), ctx)
        .body(body)
        .render(&headers, Some(&user)))
}
