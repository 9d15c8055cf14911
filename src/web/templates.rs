use chrono::{Datelike, Utc};

const PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 2rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        main { padding: 2rem 1.5rem; max-width: 960px; margin: 0 auto; box-sizing: border-box; }
        section { margin-bottom: 2.5rem; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h2 { margin-top: 0; }
        label { display: block; margin: 1rem 0 0.5rem; font-weight: 600; color: #0f172a; }
        input, textarea { width: 100%; padding: 0.75rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; font-size: 1rem; }
        input:focus, textarea:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        button { margin-top: 1rem; padding: 0.75rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; transition: background 0.15s ease; }
        button:hover { background: #1d4ed8; }
        button.danger { background: #dc2626; margin-top: 0; }
        button.danger:hover { background: #b91c1c; }
        button.secondary { background: #e2e8f0; color: #0f172a; margin-top: 0; }
        table { width: 100%; border-collapse: collapse; margin-top: 1.5rem; background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        th, td { padding: 0.75rem 1rem; border-bottom: 1px solid #e2e8f0; text-align: left; vertical-align: middle; }
        th { background: #f1f5f9; color: #0f172a; font-weight: 600; }
        td img { max-width: 72px; max-height: 72px; border-radius: 6px; }
        a { color: #2563eb; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .status-box { margin-top: 1rem; min-height: 1.5rem; font-size: 0.95rem; }
        .status-box.error { color: #b91c1c; }
        .status-box.success { color: #166534; }
        .auth-shell { display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; padding: 1.5rem; box-sizing: border-box; }
        .auth-shell .panel { width: 100%; max-width: 420px; box-sizing: border-box; }
        .auth-shell h1 { margin-top: 0; text-align: center; }
        .auth-shell button { width: 100%; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            header { padding: 1.5rem 1rem; }
            main { padding: 1.5rem 1rem; }
            th, td { padding: 0.5rem; }
        }
"#;

pub struct PageLayout<'a> {
    pub meta_title: &'a str,
    pub body_html: String,
    pub body_script: Option<&'a str>,
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        meta_title,
        body_html,
        body_script,
    } = layout;

    let script = body_script
        .map(|script| format!("<script>\n{script}\n</script>"))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{styles}
    </style>
</head>
<body>
{body_html}
{script}
</body>
</html>"#,
        meta_title = escape_html(meta_title),
        styles = PAGE_BASE_STYLES,
        body_html = body_html,
        script = script,
    )
}

/// Which admin credential form to render.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthForm {
    Login,
    Register,
}

const AUTH_FORM_SCRIPT: &str = r#"const form = document.getElementById('auth-form');
const statusBox = document.getElementById('auth-status');

form.addEventListener('submit', async (event) => {
    event.preventDefault();
    statusBox.className = 'status-box';
    statusBox.textContent = 'Please wait...';

    const payload = Object.fromEntries(new FormData(form).entries());
    try {
        const response = await fetch(form.dataset.endpoint, {
            method: 'POST',
            credentials: 'same-origin',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify(payload),
        });
        const body = await response.json().catch(() => ({}));
        if (!response.ok) {
            statusBox.className = 'status-box error';
            statusBox.textContent = body.error || 'Request failed.';
            return;
        }
        statusBox.className = 'status-box success';
        statusBox.textContent = body.message || 'Done.';
        window.location.href = form.dataset.next;
    } catch (err) {
        console.error(err);
        statusBox.className = 'status-box error';
        statusBox.textContent = 'Network error, please try again.';
    }
});
"#;

pub fn render_auth_page(form: AuthForm) -> String {
    let (heading, endpoint, next, button, email_field, switch_link) = match form {
        AuthForm::Login => (
            "Admin Login",
            "/admin/login",
            "/admin",
            "Log in",
            "",
            r#"<p class="note">No account yet? <a href="/admin/register">Register an admin</a>.</p>"#,
        ),
        AuthForm::Register => (
            "Admin Registration",
            "/admin/register",
            "/admin/login",
            "Register",
            r#"<label for="email">Email</label>
                <input id="email" type="email" name="email" required>"#,
            r#"<p class="note">Already registered? <a href="/admin/login">Log in</a>.</p>"#,
        ),
    };

    let body_html = format!(
        r#"    <main class="auth-shell">
        <section class="panel">
            <h1>{heading}</h1>
            <form id="auth-form" data-endpoint="{endpoint}" data-next="{next}">
                <label for="username">Username</label>
                <input id="username" name="username" autocomplete="username" required>
                {email_field}
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required>
                <button type="submit">{button}</button>
            </form>
            <div id="auth-status" class="status-box"></div>
            {switch_link}
        </section>
        {footer}
    </main>"#,
        footer = render_footer(),
    );

    render_page(PageLayout {
        meta_title: &format!("{heading} | QuickieBot"),
        body_html,
        body_script: Some(AUTH_FORM_SCRIPT),
    })
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} QuickieBot learning resources</footer>"#,
        year = current_year
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
