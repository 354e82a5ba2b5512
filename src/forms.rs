use std::collections::BTreeMap;

use crate::store::Contact;

/// Forms that can carry a per-contact override URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormId {
    Form1,
    Form2,
    Form3,
}

impl FormId {
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "form_1" => Some(FormId::Form1),
            "form_2" => Some(FormId::Form2),
            "form_3" => Some(FormId::Form3),
            _ => None,
        }
    }

    /// The contact's override URL for this form, if set.
    pub fn override_url(self, contact: &Contact) -> Option<&str> {
        let url = match self {
            FormId::Form1 => contact.form_1_url.as_deref(),
            FormId::Form2 => contact.form_2_url.as_deref(),
            FormId::Form3 => contact.form_3_url.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormId::Form1 => write!(f, "form_1"),
            FormId::Form2 => write!(f, "form_2"),
            FormId::Form3 => write!(f, "form_3"),
        }
    }
}

/// Fallback download URLs, keyed by form identifier. Read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct FormCatalog {
    urls: BTreeMap<String, String>,
}

impl FormCatalog {
    pub fn new(urls: BTreeMap<String, String>) -> Self {
        Self { urls }
    }

    pub fn get(&self, form_id: &str) -> Option<&str> {
        self.urls
            .get(form_id)
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
