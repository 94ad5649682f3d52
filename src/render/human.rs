//! Human-readable output using `colored`.

use colored::{ColoredString, Colorize};

use crate::core::models::{
    ConnectPayload, ProviderEntry, ProvidersPayload, SessionPayload, SetupPayload, StatusPayload,
};

const NAME_WIDTH: usize = 22;
const SLUG_WIDTH: usize = 18;
const DESCRIPTION_WIDTH: usize = 56;

/// Apply `style` unless colors are off.
fn paint(text: &str, no_color: bool, style: impl FnOnce(&str) -> ColoredString) -> String {
    if no_color {
        text.to_string()
    } else {
        style(text).to_string()
    }
}

/// Cut `text` to `width` characters, marking the cut.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

fn setup_hint(no_color: bool) -> String {
    format!(
        "Run {} to register before connecting a device.",
        paint("healthlink setup", no_color, |s| s.cyan())
    )
}

/// Render the `setup` result.
#[must_use]
pub fn render_setup(payload: &SetupPayload, no_color: bool) -> String {
    let check = paint("✓", no_color, |s| s.green().bold());
    let verb = if payload.created {
        "Health account created"
    } else {
        "Health account already set up"
    };
    format!(
        "{check} {verb} for {}\n  Account: {}\n",
        paint(&payload.user_id, no_color, |s| s.bold()),
        paint(&payload.remote_account_id, no_color, |s| s.dimmed()),
    )
}

/// Render the `status` result.
#[must_use]
pub fn render_status(payload: &StatusPayload, no_color: bool) -> String {
    let mut output = String::new();
    output.push_str(&format!("{:<11}{}\n", "User:", payload.user_id));

    match &payload.remote_account_id {
        Some(remote) => output.push_str(&format!(
            "{:<11}{} {}\n",
            "Account:",
            paint("registered", no_color, |s| s.green()),
            paint(&format!("({remote})"), no_color, |s| s.dimmed()),
        )),
        None => output.push_str(&format!(
            "{:<11}{}\n",
            "Account:",
            paint("not registered", no_color, |s| s.yellow()),
        )),
    }

    if payload.connected.is_empty() {
        output.push_str(&format!(
            "{:<11}{}\n",
            "Connected:",
            paint("none", no_color, |s| s.dimmed())
        ));
    } else {
        let names: Vec<&str> = payload.connected.iter().map(|p| p.name.as_str()).collect();
        output.push_str(&format!("{:<11}{}\n", "Connected:", names.join(", ")));
    }

    if payload.registered {
        output.push_str(&format!(
            "{:<11}{} providers\n",
            "Available:", payload.available
        ));
    } else {
        output.push('\n');
        output.push_str(&setup_hint(no_color));
        output.push('\n');
    }

    output
}

fn render_provider_line(entry: &ProviderEntry, no_color: bool) -> String {
    let marker = if entry.connected {
        paint("✓", no_color, |s| s.green().bold())
    } else if entry.featured {
        paint("★", no_color, |s| s.yellow())
    } else {
        " ".to_string()
    };
    let name = format!("{:<NAME_WIDTH$}", truncate(&entry.name, NAME_WIDTH));
    let slug = format!("{:<SLUG_WIDTH$}", truncate(&entry.slug, SLUG_WIDTH));
    let description = truncate(&entry.description, DESCRIPTION_WIDTH);

    let mut line = format!(
        "{marker} {} {} {}",
        paint(&name, no_color, |s| s.bold()),
        paint(&slug, no_color, |s| s.cyan()),
        paint(&description, no_color, |s| s.dimmed()),
    );
    if entry.connected {
        line.push_str(&format!(" {}", paint("[connected]", no_color, |s| s.green())));
    }
    line.trim_end().to_string()
}

/// Render the `providers` result.
#[must_use]
pub fn render_providers(payload: &ProvidersPayload, no_color: bool) -> String {
    let mut output = String::new();

    if payload.providers.is_empty() {
        match &payload.search {
            Some(term) => output.push_str(&format!("No providers match \"{term}\".\n")),
            None => output.push_str("No providers available.\n"),
        }
    } else {
        let heading = match &payload.search {
            Some(term) => format!(
                "Providers matching \"{term}\" ({} of {})",
                payload.providers.len(),
                payload.total
            ),
            None => format!("Providers ({})", payload.total),
        };
        output.push_str(&paint(&heading, no_color, |s| s.bold()));
        output.push('\n');
        for entry in &payload.providers {
            output.push_str(&render_provider_line(entry, no_color));
            output.push('\n');
        }
    }

    if !payload.registered {
        output.push('\n');
        output.push_str(&setup_hint(no_color));
        output.push('\n');
    }

    output
}

/// Render the `connect` result.
#[must_use]
pub fn render_connect(payload: &ConnectPayload, no_color: bool) -> String {
    let url = paint(&payload.authorization_url, no_color, |s| s.underline());
    if payload.opened {
        format!(
            "{} Opened {} authorization in your browser.\n  If nothing opened, visit: {url}\n",
            paint("✓", no_color, |s| s.green().bold()),
            paint(&payload.provider_name, no_color, |s| s.bold()),
        )
    } else {
        format!(
            "Open this URL to authorize {}:\n  {url}\n",
            paint(&payload.provider_name, no_color, |s| s.bold()),
        )
    }
}

/// Render the `login` result.
#[must_use]
pub fn render_login(payload: &SessionPayload, no_color: bool) -> String {
    format!(
        "{} Session stored for {}\n",
        paint("✓", no_color, |s| s.green().bold()),
        paint(payload.user_id.as_deref().unwrap_or("unknown user"), no_color, |s| s.bold()),
    )
}

/// Render the `logout` result.
#[must_use]
pub fn render_logout(payload: &SessionPayload, no_color: bool) -> String {
    if payload.changed {
        format!("{} Stored session removed\n", paint("✓", no_color, |s| s.green().bold()))
    } else {
        "No stored session\n".to_string()
    }
}
