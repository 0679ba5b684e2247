//! Server-rendered HTML. Every interpolated value goes through `esc` or `attr`.

use axum::http::StatusCode;
use axum::response::Html;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as esc};
use std::fmt::Write;

use super::flash::Flash;
use crate::db::GeoJsonSummary;
use crate::domain::{ADMIN_ROLE, CurrentUser, FieldErrors, Identity};
use crate::services::AdminCounts;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

fn nav(identity: &Identity) -> String {
    let mut out = String::from(r#"<nav><a href="/">Home</a>"#);
    match identity.user() {
        Some(user) => {
            out.push_str(r#" <a href="/sig">SIG</a> <a href="/sig/files">My files</a> <a href="/sig/map">Map</a>"#);
            if user.has_role(ADMIN_ROLE) {
                out.push_str(r#" <a href="/admin/">Admin</a>"#);
            }
            let _ = write!(
                out,
                r#" <span class="who">{}</span> <form class="inline" method="post" action="/auth/logout"><button type="submit">Log out</button></form>"#,
                esc(&user.name)
            );
        }
        None => {
            out.push_str(r#" <a href="/auth/login">Log in</a> <a href="/auth/register">Register</a>"#);
        }
    }
    out.push_str("</nav>");
    out
}

fn flashes(messages: &[Flash]) -> String {
    let mut out = String::new();
    for flash in messages {
        let _ = write!(
            out,
            r#"<div class="flash {}">{}</div>"#,
            flash.level.css_class(),
            esc(&flash.message)
        );
    }
    out
}

fn layout(title: &str, identity: &Identity, messages: &[Flash], head: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · devgis</title>
<link rel="stylesheet" href="/static/style.css">
{head}
</head>
<body>
<header>{nav}</header>
<main>
{flashes}
{body}
</main>
</body>
</html>"#,
        title = esc(title),
        nav = nav(identity),
        flashes = flashes(messages),
    ))
}

fn field_error(errors: &FieldErrors, field: &str) -> String {
    errors
        .get(field)
        .map(|msg| format!(r#"<p class="field-error">{}</p>"#, esc(msg)))
        .unwrap_or_default()
}

pub fn welcome(identity: &Identity, messages: &[Flash]) -> Html<String> {
    let body = match identity.user() {
        Some(user) => format!(
            r#"<h1>Welcome back, {}</h1>
<p>Upload GeoJSON documents and view them on the map.</p>
<p><a class="button" href="/sig/files">Manage my files</a> <a class="button" href="/sig/map">Open the map</a></p>"#,
            esc(&user.name)
        ),
        None => r#"<h1>Welcome to devgis</h1>
<p>A small workspace for storing and viewing GeoJSON layers.</p>
<p><a class="button" href="/auth/login">Log in</a> or <a href="/auth/register">create an account</a>.</p>"#
            .to_string(),
    };
    layout("Welcome", identity, messages, "", &body)
}

pub fn login_form(
    identity: &Identity,
    messages: &[Flash],
    identifier: &str,
    next: Option<&str>,
    error: Option<&str>,
) -> Html<String> {
    let error = error
        .map(|e| format!(r#"<p class="form-error">{}</p>"#, esc(e)))
        .unwrap_or_default();
    let next = next
        .map(|n| format!(r#"<input type="hidden" name="next" value="{}">"#, attr(n)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Log in</h1>
{error}
<form method="post" action="/auth/login">
{next}
<label>Email or name <input name="identifier" value="{identifier}" required autofocus></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/auth/register">Register</a></p>"#,
        identifier = attr(identifier),
    );
    layout("Log in", identity, messages, "", &body)
}

/// Values echoed back into the registration form after a failed submit.
#[derive(Debug, Default)]
pub struct RegisterValues<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

pub fn register_form(
    identity: &Identity,
    messages: &[Flash],
    values: &RegisterValues<'_>,
    errors: &FieldErrors,
) -> Html<String> {
    let body = format!(
        r#"<h1>Create an account</h1>
<form method="post" action="/auth/register">
<label>Name <input name="name" value="{name}" required></label>
{name_err}
<label>Email <input type="email" name="email" value="{email}" required></label>
{email_err}
<label>Password <input type="password" name="password" required></label>
{password_err}
<label>Confirm password <input type="password" name="confirm" required></label>
{confirm_err}
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/auth/login">Log in</a></p>"#,
        name = attr(values.name),
        email = attr(values.email),
        name_err = field_error(errors, "name"),
        email_err = field_error(errors, "email"),
        password_err = field_error(errors, "password"),
        confirm_err = field_error(errors, "confirm"),
    );
    layout("Register", identity, messages, "", &body)
}

pub fn sig_index(identity: &Identity, messages: &[Flash], file_count: usize) -> Html<String> {
    let body = format!(
        r#"<h1>SIG</h1>
<p>You have {file_count} stored document(s).</p>
<ul>
<li><a href="/sig/files">Upload and manage files</a></li>
<li><a href="/sig/map">View everything on the map</a></li>
</ul>
<form method="post" action="/sig/load-examples"><button type="submit">Load example layers</button></form>"#
    );
    layout("SIG", identity, messages, "", &body)
}

pub fn files_page(
    identity: &Identity,
    messages: &[Flash],
    files: &[GeoJsonSummary],
) -> Html<String> {
    let mut rows = String::new();
    for file in files {
        let _ = write!(
            rows,
            r#"<tr><td>{name}</td><td>{size}</td><td>{created}</td><td><a href="/sig/api/files/{id}">raw</a> <form class="inline" method="post" action="/sig/files/{id}/delete"><button type="submit">Delete</button></form></td></tr>"#,
            name = esc(&file.name),
            size = file.size_bytes,
            created = esc(&file.created_at),
            id = file.id,
        );
    }
    if files.is_empty() {
        rows.push_str(r#"<tr><td colspan="4">No files yet.</td></tr>"#);
    }

    let body = format!(
        r#"<h1>My GeoJSON files</h1>
<form method="post" action="/sig/files" enctype="multipart/form-data">
<label>Name (optional) <input name="name"></label>
<label>File <input type="file" name="file" accept=".geojson,.json,application/geo+json,application/json"></label>
<label>Or paste GeoJSON <textarea name="raw_json" rows="6"></textarea></label>
<button type="submit">Upload</button>
</form>
<form method="post" action="/sig/load-examples"><button type="submit">Load example layers</button></form>
<table>
<thead><tr><th>Name</th><th>Bytes</th><th>Uploaded</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
    );
    layout("My files", identity, messages, "", &body)
}

pub fn map_page(identity: &Identity, messages: &[Flash]) -> Html<String> {
    let head = format!(
        r#"<link rel="stylesheet" href="{LEAFLET_CSS}">
<script src="{LEAFLET_JS}" defer></script>
<script src="/static/map.js" defer></script>"#
    );
    let body = r#"<div id="map" data-source="/sig/api/my-geojsons"></div>
<ul id="layers"></ul>"#;
    layout("Map", identity, messages, &head, body)
}

pub fn admin_index(user: &CurrentUser, counts: &AdminCounts) -> Html<String> {
    let identity = Identity::Authenticated(user.clone());
    let body = format!(
        r#"<h1>Administration</h1>
<table>
<tbody>
<tr><td><a href="/admin/users">Users</a></td><td>{users}</td></tr>
<tr><td><a href="/admin/roles">Roles</a></td><td>{roles}</td></tr>
<tr><td><a href="/admin/user-roles">Role grants</a></td><td></td></tr>
<tr><td><a href="/admin/geojson-files">GeoJSON files</a></td><td>{files}</td></tr>
<tr><td><a href="/admin/access-logs">Access logs</a></td><td>{logs}</td></tr>
</tbody>
</table>
<p><a href="/admin/metrics">Metrics</a></p>"#,
        users = counts.users,
        roles = counts.roles,
        files = counts.geojson_files,
        logs = counts.access_logs,
    );
    layout("Administration", &identity, &[], "", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let body = format!(
        r#"<h1>{code} {reason}</h1>
<p>{message}</p>
<p><a href="/">Back to the home page</a></p>"#,
        code = status.as_u16(),
        reason = esc(status.canonical_reason().unwrap_or("Error")),
        message = esc(message),
    );
    layout("Error", &Identity::Anonymous, &[], "", &body)
}
