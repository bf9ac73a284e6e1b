//! Embedded HTML templates.
//!
//! Templates are `&str` constants rendered via minijinja. Names end in
//! `.html` so minijinja auto-escapes every interpolated value.

/// Base layout template. All pages extend this.
pub const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{% block title %}Home{% endblock %} - Flickr login demo</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 40rem;
            margin: 3rem auto;
            padding: 0 1rem;
            line-height: 1.6;
            color: #222;
        }
        a { color: #0063dc; }
        footer { margin-top: 3rem; font-size: 0.85rem; color: #666; }
    </style>
</head>
<body>
    {% block body %}{% endblock %}
    <footer>
        This is a demo app to show OAuth login using Flickr.
    </footer>
</body>
</html>"#;

/// Home page, logged in or out.
pub const HOME: &str = r#"{% extends "layout.html" %}
{% block title %}Home{% endblock %}
{% block body %}
<h1>Flickr login demo</h1>
{% if user %}
<p>
    You are <strong style="color: DarkGreen;">logged in</strong>
    as <strong>{{ user.username }}</strong> (NSID <code>{{ user.user_nsid }}</code>).
</p>
<p>
    Go view the <a href="/secret">secret page</a>, or <a href="/logout">log out</a>.
</p>
{% else %}
<p>
    You are <strong style="color: red;">logged out</strong>.
    {% if next %}You need to log in to see <code>{{ next }}</code>.{% endif %}
</p>
<p>
    Do you want to <a href="/authorize">log in</a> with Flickr?
</p>
{% endif %}
{% endblock %}"#;

/// Page only visible to logged-in users.
pub const SECRET: &str = r#"{% extends "layout.html" %}
{% block title %}Secret{% endblock %}
{% block body %}
<h1>Secret</h1>
<p>This is a secret page, only visible to <strong>{{ user.username }}</strong>.</p>
<p><a href="/">Home</a> &middot; <a href="/logout">log out</a></p>
{% endblock %}"#;
