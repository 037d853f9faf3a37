use crate::calendar::MonthView;
use crate::models::Mood;
use std::fmt::Write;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub struct PageContext<'a> {
    pub view: &'a MonthView,
    pub status: &'a str,
    pub notice: Option<&'a str>,
    pub selected: Option<String>,
    pub selected_comment: &'a str,
    pub token_configured: bool,
    pub remote_configured: bool,
}

pub fn render_index(ctx: &PageContext<'_>) -> String {
    let notice = ctx
        .notice
        .map(|notice| format!(r#"<p class="notice">{}</p>"#, escape_html(notice)))
        .unwrap_or_default();
    let selected = ctx
        .selected
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "no day selected".to_string());

    INDEX_HTML
        .replace("{{TITLE}}", &escape_html(&ctx.view.title))
        .replace("{{YEAR}}", &ctx.view.year.to_string())
        .replace("{{MONTH_OPTIONS}}", &month_options(ctx.view.month))
        .replace("{{GRID}}", &render_grid(ctx.view))
        .replace("{{EMOJIS}}", &render_emoji_picker())
        .replace("{{SELECTED}}", &selected)
        .replace("{{COMMENT}}", &escape_html(ctx.selected_comment))
        .replace("{{CLOUD}}", &render_cloud_controls(ctx))
        .replace("{{NOTICE}}", &notice)
}

fn render_grid(view: &MonthView) -> String {
    let mut html = String::new();
    for name in WEEKDAYS {
        let _ = write!(html, r#"<div class="weekday">{name}</div>"#);
    }
    for _ in 0..view.leading_blanks {
        html.push_str(r#"<div class="blank"></div>"#);
    }
    for cell in &view.cells {
        let mut classes = String::from("day");
        if cell.is_today {
            classes.push_str(" today");
        }
        if cell.is_selected {
            classes.push_str(" selected");
        }
        if let Some(mood) = cell.mood {
            classes.push_str(" mood-");
            classes.push_str(mood.label());
        }
        let style = cell
            .color
            .map(|color| format!(r#" style="background-color: {color}""#))
            .unwrap_or_default();
        let title = cell
            .tooltip
            .as_deref()
            .map(|tip| format!(r#" title="{}""#, escape_html(tip)))
            .unwrap_or_default();
        let _ = write!(
            html,
            r#"<button type="submit" name="date" value="{key}" class="{classes}"{style}{title}><span class="num">{day}</span><span class="label">{label}</span></button>"#,
            key = escape_html(&cell.key),
            day = cell.day,
            label = escape_html(&cell.label),
        );
    }
    html
}

fn render_emoji_picker() -> String {
    let mut html = String::new();
    for mood in Mood::ALL {
        let _ = write!(
            html,
            r#"<button type="submit" name="emoji" value="{emoji}" title="{label}" class="pick mood-{label}">{emoji}</button>"#,
            emoji = mood.emoji(),
            label = mood.label(),
        );
    }
    html.push_str(r#"<button type="submit" name="emoji" value="" title="clear" class="pick clear">✕</button>"#);
    html
}

fn render_cloud_controls(ctx: &PageContext<'_>) -> String {
    if !ctx.remote_configured {
        return format!(r#"<p class="status">Cloud: {}</p>"#, escape_html(ctx.status));
    }
    let token_form = if ctx.token_configured {
        r#"<form method="post" action="/token/clear"><button type="submit">Clear token</button></form>"#
            .to_string()
    } else {
        r#"<form method="post" action="/token"><input type="password" name="token" placeholder="GitHub token" autocomplete="off" /><button type="submit">Set token</button></form>"#
            .to_string()
    };
    format!(
        r#"<p class="status">Cloud: {status}</p>
      <div class="row">
        {token_form}
        <form method="post" action="/cloud/save"><button type="submit">Save to cloud</button></form>
        <form method="post" action="/cloud/load"><button type="submit">Reload from cloud</button></form>
      </div>"#,
        status = escape_html(ctx.status),
    )
}

fn month_options(selected: u32) -> String {
    let mut html = String::new();
    for month in 1..=12u32 {
        let name = chrono::Month::try_from(month as u8)
            .map(|m| m.name())
            .unwrap_or("?");
        let marker = if month == selected { " selected" } else { "" };
        let _ = write!(html, r#"<option value="{month}"{marker}>{name}</option>"#);
    }
    html
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            // Braces too, so inserted text can never form a {{PLACEHOLDER}}.
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Mood Calendar</title>
  <style>
    :root {
      --bg: #f6f1ea;
      --ink: #2b2a28;
      --accent: #2f4858;
      --card: #ffffff;
      --shadow: 0 18px 48px rgba(47, 72, 88, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 28px 16px;
    }

    .app {
      width: min(760px, 100%);
      background: var(--card);
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 28px;
      display: grid;
      gap: 20px;
    }

    header, .row {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      align-items: center;
    }

    h1 {
      flex: 1;
      margin: 0;
      font-size: 1.8rem;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 6px;
    }

    .weekday {
      text-align: center;
      font-size: 0.8rem;
      text-transform: uppercase;
      color: #8b857d;
    }

    .day {
      min-height: 64px;
      border: 1px solid rgba(47, 72, 88, 0.12);
      border-radius: 12px;
      background: #fbfaf7;
      display: grid;
      place-items: center;
      cursor: pointer;
      font: inherit;
    }

    .day .num {
      font-size: 0.7rem;
      color: #8b857d;
    }

    .day .label {
      font-size: 1.3rem;
    }

    .day.today {
      outline: 2px solid var(--accent);
    }

    .day.selected {
      box-shadow: 0 0 0 3px #ff6b4a;
    }

    .pick {
      font-size: 1.6rem;
      border: none;
      background: none;
      cursor: pointer;
    }

    .notice {
      color: #b23c17;
      margin: 0;
    }

    .status {
      margin: 0;
      color: #5f5c57;
    }

    textarea {
      width: 100%;
      min-height: 60px;
      font: inherit;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <form method="post" action="/nav/prev"><button type="submit">&larr;</button></form>
      <h1>{{TITLE}}</h1>
      <form method="post" action="/nav/next"><button type="submit">&rarr;</button></form>
      <form method="post" action="/nav/goto" class="row">
        <select name="month">{{MONTH_OPTIONS}}</select>
        <input type="number" name="year" value="{{YEAR}}" />
        <button type="submit">Go</button>
      </form>
    </header>

    {{NOTICE}}

    <form method="post" action="/select" class="grid">
      {{GRID}}
    </form>

    <section>
      <p>Editing: <strong>{{SELECTED}}</strong></p>
      <form method="post" action="/emoji" class="row">
        {{EMOJIS}}
      </form>
      <form method="post" action="/comment">
        <textarea name="comment" placeholder="Add a note for this day">{{COMMENT}}</textarea>
        <button type="submit">Save comment</button>
      </form>
    </section>

    <section class="row">
      <a href="/moods.json" download="moods.json">Download moods.json</a>
      <form method="post" action="/clear" onsubmit="return confirm('Delete every saved mood? This cannot be undone.');">
        <input type="hidden" name="confirm" value="yes" />
        <button type="submit">Clear all</button>
      </form>
    </section>

    <section>
      {{CLOUD}}
    </section>
  </main>
</body>
</html>
"#;
