//! Page context and HTML rendering shared by every page view.

use axum::{
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{auth::AuthUser, errors::ServiceError};

/// Variables a page was rendered with.
///
/// Stored in the response extensions so callers can inspect what a view
/// produced without parsing its HTML.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PageContext(Map<String, Value>);

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value` under `key`. Objects carrying an `id` also get a `pk` alias.
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<&mut Self, ServiceError> {
        let mut value = serde_json::to_value(value).map_err(|e| {
            ServiceError::SerializationError(format!("context variable '{}': {}", key, e))
        })?;
        alias_pk(&mut value);
        self.0.insert(key.to_string(), value);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

fn alias_pk(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("id").cloned() {
                map.entry("pk").or_insert(id);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(alias_pk),
        _ => {}
    }
}

/// A rendered page: its title, HTML body fragment and context
pub struct Page {
    pub title: String,
    pub body: String,
    pub context: PageContext,
}

impl Page {
    pub fn new(title: impl Into<String>, context: PageContext) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            context,
        }
    }

    pub fn body(mut self, body: String) -> Self {
        self.body = body;
        self
    }

    /// HTML by default; the bare context when the client asks for JSON
    pub fn render(self, headers: &HeaderMap, user: Option<&AuthUser>) -> Response {
        let context = self.context.clone();
        let mut response = if wants_json(headers) {
            Json(self.context.into_json()).into_response()
        } else {
            Html(layout(&self.title, user, &self.body)).into_response()
        };
        response.extensions_mut().insert(context);
        response
    }
}

pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |accept| accept.contains("application/json"))
}

/// Random per-response token for the page's forms
pub fn csrf_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `<a href="url">text</a>` with both parts escaped
pub fn link(url: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(url), escape(text))
}

/// An HTML table; cells are expected to be escaped already
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table class=\"table\">\n<thead><tr>");
    for h in headers {
        html.push_str(&format!("<th>{}</th>", escape(h)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn layout(title: &str, user: Option<&AuthUser>, body: &str) -> String {
    let account = match user {
        Some(user) => format!(
            "<span class=\"user\">{}</span> <a href=\"/accounts/logout/\">Log out</a>",
            escape(&user.username)
        ),
        None => "<a href=\"/accounts/login/\">Log in</a>".to_string(),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title} | MRP</title>\n</head>\n<body>\n\
         <nav><a href=\"/part/\">Parts</a> <a href=\"/build/\">Build Orders</a> {account}</nav>\n\
         <main>\n<h1>{title}</h1>\n{body}</main>\n</body>\n</html>\n",
        title = escape(title),
        account = account,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn objects_gain_pk_alias() {
        let mut ctx = PageContext::new();
        ctx.insert("part", &json!({"id": 3, "name": "Widget"})).unwrap();
        ctx.insert("parts", &json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(ctx.get("part").unwrap()["pk"], 3);
        assert_eq!(ctx.get("parts").unwrap()[1]["pk"], 2);
    }

    #[test]
    fn escaping() {
        assert_eq!(
            escape("<b>\"M3\" & 'M4'</b>"),
            "&lt;b&gt;&quot;M3&quot; &amp; &#x27;M4&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn render_attaches_context() {
        let mut ctx = PageContext::new();
        ctx.insert("csrf_token", "abc").unwrap();

        let html = Page::new("Parts", ctx.clone())
            .body("<p>hello</p>".into())
            .render(&HeaderMap::new(), None);
        assert_eq!(html.extensions().get::<PageContext>(), Some(&ctx));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let json = Page::new("Parts", ctx).render(&headers, None);
        assert_eq!(
            json.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn csrf_tokens_differ() {
        let a = csrf_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, csrf_token());
    }
}
