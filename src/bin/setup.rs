//! formbot setup wizard.
//!
//! Asks for the OA access token, the contact store and the form links in the
//! terminal, then writes `config.toml` to the project root (`FORMBOT_ROOT`,
//! or the current directory).

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    access_token: &'a str,
    bind: &'a str,
    backend: &'a str,
    spreadsheet_id: &'a str,
    credentials_path: &'a str,
    db_path: &'a str,
    forms: &'a [(String, String)],
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let access_token = p.access_token;
    let bind = p.bind;
    let backend = p.backend;
    let spreadsheet_id = p.spreadsheet_id;
    let credentials_path = p.credentials_path;
    let db_path = p.db_path;

    let token_line = if access_token.is_empty() {
        "# access_token = \"...\"  (or set ZALO_ACCESS_TOKEN)".to_owned()
    } else {
        format!("access_token = \"{access_token}\"")
    };

    let forms: String = p
        .forms
        .iter()
        .filter(|(_, url)| !url.is_empty())
        .map(|(id, url)| format!("{id} = \"{url}\"\n"))
        .collect();

    format!(
        r#"[server]
bind = "{bind}"

[zalo]
{token_line}

[store]
backend = "{backend}"

[store.sheets]
spreadsheet_id = "{spreadsheet_id}"
worksheet = ""
credentials_path = "{credentials_path}"

[store.sqlite]
database_path = "{db_path}"

[forms]
{forms}"#
    )
}

// ── Wizard ─────────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== formbot setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let access_token = read_line("Zalo OA access token (blank to use ZALO_ACCESS_TOKEN): ")?;
    let bind = or_default(read_line("Listen address [0.0.0.0:5000]: ")?, "0.0.0.0:5000");
    let backend = or_default(read_line("Contact store (sheets/sqlite) [sheets]: ")?, "sheets");
    if backend != "sheets" && backend != "sqlite" {
        anyhow::bail!("Unknown contact store '{backend}', expected 'sheets' or 'sqlite'");
    }

    let (spreadsheet_id, credentials_path) = if backend == "sheets" {
        (
            read_line("Google spreadsheet id (blank to use GOOGLE_SHEET_ID): ")?,
            or_default(read_line("Service-account key [creds.json]: ")?, "creds.json"),
        )
    } else {
        (String::new(), "creds.json".to_owned())
    };
    let db_path = or_default(read_line("SQLite path [contacts.db]: ")?, "contacts.db");

    let mut forms = Vec::new();
    for id in ["form_1", "form_2", "form_3"] {
        let url = read_line(&format!("Default download URL for {id}: "))?;
        forms.push((id.to_owned(), url));
    }

    let config = format_config(&ConfigParams {
        access_token: &access_token,
        bind: &bind,
        backend: &backend,
        spreadsheet_id: &spreadsheet_id,
        credentials_path: &credentials_path,
        db_path: &db_path,
        forms: &forms,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run --bin formbot");
    Ok(())
}

fn main() -> Result<()> {
    let project_root =
        PathBuf::from(std::env::var("FORMBOT_ROOT").unwrap_or_else(|_| ".".to_string()));
    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn forms() -> Vec<(String, String)> {
        vec![
            ("form_1".to_owned(), "https://example.com/1.pdf".to_owned()),
            ("form_2".to_owned(), String::new()),
            ("form_3".to_owned(), "https://example.com/3.pdf".to_owned()),
        ]
    }

    fn cfg(access_token: &str, backend: &str) -> String {
        let forms = forms();
        format_config(&ConfigParams {
            access_token,
            bind: "0.0.0.0:5000",
            backend,
            spreadsheet_id: "sheet-1",
            credentials_path: "creds.json",
            db_path: "contacts.db",
            forms: &forms,
        })
    }

    #[test]
    fn test_output_is_valid_toml() {
        let out = cfg("tok", "sheets");
        let parsed: toml::Value = toml::from_str(&out).unwrap();
        assert_eq!(parsed["zalo"]["access_token"].as_str(), Some("tok"));
        assert_eq!(parsed["store"]["backend"].as_str(), Some("sheets"));
        assert_eq!(parsed["store"]["sheets"]["spreadsheet_id"].as_str(), Some("sheet-1"));
    }

    #[test]
    fn test_token_commented_when_empty() {
        let out = cfg("", "sqlite");
        assert!(out.contains("# access_token ="));
        let parsed: toml::Value = toml::from_str(&out).unwrap();
        assert!(parsed["zalo"].get("access_token").is_none());
    }

    #[test]
    fn test_blank_form_urls_are_skipped() {
        let out = cfg("tok", "sheets");
        assert!(out.contains(r#"form_1 = "https://example.com/1.pdf""#));
        assert!(!out.contains("form_2"));
        assert!(out.contains(r#"form_3 = "https://example.com/3.pdf""#));
    }

    #[test]
    fn test_sqlite_section_present() {
        let out = cfg("tok", "sqlite");
        assert!(out.contains("[store.sqlite]"));
        assert!(out.contains(r#"database_path = "contacts.db""#));
    }
}
