//! Tenant route table
//!
//! Every tenant path serves the same wizard with a different fixed company
//! name. Unknown paths fall back to the default route `/`.

use serde::Serialize;

/// Path every unknown route redirects to
pub const DEFAULT_PATH: &str = "/";

/// One hosted deployment of the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    pub path: String,
    pub company: String,
}

/// Path → company lookup
#[derive(Debug, Clone)]
pub struct TenantTable {
    tenants: Vec<Tenant>,
}

impl TenantTable {
    /// Routes shipped with the service
    pub fn builtin() -> Self {
        Self::from_pairs(
            [
                ("/", "Default Company"),
                ("/af_2", "Empeon Group"),
                ("/af_x7k9v", "Emergency Ambulance"),
                ("/af_m4r2t", "The W Group"),
                ("/audio_form", "HCS"),
                ("/af_royal", "Royal"),
            ]
            .into_iter()
            .map(|(p, c)| (p.to_string(), c.to_string())),
        )
    }

    /// Build a table from `(path, company)` pairs
    ///
    /// Later duplicates of a path are ignored. A default route is added when
    /// the pairs do not define one, so fallback always resolves.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut tenants: Vec<Tenant> = Vec::new();
        for (path, company) in pairs {
            let path = normalize_path(&path);
            if tenants.iter().any(|t| t.path == path) {
                continue;
            }
            tenants.push(Tenant { path, company });
        }
        if !tenants.iter().any(|t| t.path == DEFAULT_PATH) {
            tenants.insert(
                0,
                Tenant {
                    path: DEFAULT_PATH.to_string(),
                    company: "Default Company".to_string(),
                },
            );
        }
        Self { tenants }
    }

    /// Exact lookup by route path (trailing slash insensitive)
    pub fn get(&self, path: &str) -> Option<&Tenant> {
        let path = normalize_path(path);
        self.tenants.iter().find(|t| t.path == path)
    }

    /// The tenant served at `/`
    pub fn default_tenant(&self) -> &Tenant {
        // from_pairs guarantees the default route exists
        &self.tenants[self
            .tenants
            .iter()
            .position(|t| t.path == DEFAULT_PATH)
            .unwrap_or(0)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tenant> {
        self.tenants.iter()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
