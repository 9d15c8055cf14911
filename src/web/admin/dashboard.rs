use axum::{
    extract::State,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::error;

use crate::web::{
    AppState,
    data::fetch_resources,
    models::ResourceRow,
    templates::{PageLayout, escape_html, render_footer, render_page},
};

use super::auth::require_admin_session;

const DASHBOARD_SCRIPT: &str = r#"const statusBox = document.getElementById('panel-status');

function showStatus(message, isError) {
    statusBox.className = isError ? 'status-box error' : 'status-box success';
    statusBox.textContent = message;
}

async function readBody(response) {
    return response.json().catch(() => ({}));
}

document.getElementById('upload-form').addEventListener('submit', async (event) => {
    event.preventDefault();
    const response = await fetch('/api/resources', {
        method: 'POST',
        credentials: 'same-origin',
        body: new FormData(event.target),
    });
    const body = await readBody(response);
    if (!response.ok) {
        showStatus(body.error || 'Upload failed.', true);
        return;
    }
    window.location.reload();
});

document.getElementById('logout-button').addEventListener('click', async () => {
    await fetch('/admin/logout', { method: 'POST', credentials: 'same-origin' });
    window.location.href = '/admin/login';
});

document.querySelectorAll('[data-delete]').forEach((button) => {
    button.addEventListener('click', async () => {
        if (!window.confirm('Delete this resource?')) {
            return;
        }
        const response = await fetch(`/api/resources/${button.dataset.delete}`, {
            method: 'DELETE',
            credentials: 'same-origin',
        });
        const body = await readBody(response);
        if (!response.ok) {
            showStatus(body.error || 'Delete failed.', true);
            return;
        }
        window.location.reload();
    });
});

document.querySelectorAll('[data-edit]').forEach((button) => {
    button.addEventListener('click', async () => {
        const description = window.prompt('New description', button.dataset.description || '');
        if (description === null) {
            return;
        }
        const form = new FormData();
        form.append('description', description);
        const response = await fetch(`/api/resources/${button.dataset.edit}`, {
            method: 'PUT',
            credentials: 'same-origin',
            body: form,
        });
        const body = await readBody(response);
        if (!response.ok) {
            showStatus(body.error || 'Update failed.', true);
            return;
        }
        window.location.reload();
    });
});
"#;

pub async fn dashboard(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Html<String>, Redirect> {
    let (_, username) = require_admin_session(&state, &jar).await?;

    let resources = fetch_resources(state.pool_ref()).await.map_err(|err| {
        error!(?err, "failed to load resources for admin panel");
        Redirect::to("/admin/login")
    })?;

    Ok(Html(render_dashboard(&username, &resources)))
}

fn render_resource_rows(resources: &[ResourceRow]) -> String {
    if resources.is_empty() {
        return "<tr><td colspan=\"4\">No resources uploaded yet.</td></tr>".to_string();
    }

    let mut rows = String::new();
    for resource in resources {
        let description = resource.description.as_deref().unwrap_or_default();
        let thumbnail = resource
            .thumbnail
            .as_deref()
            .map(|thumb| {
                format!(
                    "<img src=\"/uploads/{src}\" alt=\"\">",
                    src = escape_html(thumb)
                )
            })
            .unwrap_or_default();

        rows.push_str(&format!(
            r#"<tr>
    <td>{thumbnail}</td>
    <td><a href="/uploads/{href}" target="_blank" rel="noopener">{name}</a></td>
    <td>{description}</td>
    <td>
        <button type="button" class="secondary" data-edit="{id}" data-description="{description}">Edit</button>
        <button type="button" class="danger" data-delete="{id}">Delete</button>
    </td>
</tr>"#,
            thumbnail = thumbnail,
            href = escape_html(&resource.filename),
            name = escape_html(&resource.filename),
            description = escape_html(description),
            id = resource.id,
        ));
    }
    rows
}

fn render_dashboard(username: &str, resources: &[ResourceRow]) -> String {
    let body_html = format!(
        r#"    <header>
        <div class="header-bar">
            <h1>QuickieBot resources</h1>
            <div>Signed in as <strong>{username}</strong> <button type="button" id="logout-button" class="secondary">Log out</button></div>
        </div>
    </header>
    <main>
        <section class="panel">
            <h2>Upload a resource</h2>
            <form id="upload-form">
                <label for="file">File</label>
                <input id="file" type="file" name="file" required>
                <label for="thumbnail">Thumbnail (optional)</label>
                <input id="thumbnail" type="file" name="thumbnail" accept="image/*">
                <label for="description">Description</label>
                <textarea id="description" name="description" rows="3"></textarea>
                <button type="submit">Upload</button>
            </form>
            <div id="panel-status" class="status-box"></div>
        </section>
        <section>
            <h2>Resources</h2>
            <table>
                <thead>
                    <tr><th>Thumbnail</th><th>File</th><th>Description</th><th>Actions</th></tr>
                </thead>
                <tbody>
{rows}
                </tbody>
            </table>
        </section>
        {footer}
    </main>"#,
        username = escape_html(username),
        rows = render_resource_rows(resources),
        footer = render_footer(),
    );

    render_page(PageLayout {
        meta_title: "Admin panel | QuickieBot",
        body_html,
        body_script: Some(DASHBOARD_SCRIPT),
    })
}
