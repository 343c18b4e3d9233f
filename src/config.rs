use crate::transform::UnlabeledRows;

pub const USER_AGENT: &str = concat!("rowframe/", env!("CARGO_PKG_VERSION"));

/// Per-instance settings of the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_server: String,
    pub api_key: String,
    /// Routing target passed with every query, if set.
    pub virtual_instance: Option<String>,
    pub unlabeled_rows: UnlabeledRows,
    pub user_agent: String,
}

impl Settings {
    pub fn new(api_server: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_server: api_server.into(),
            api_key: api_key.into(),
            virtual_instance: None,
            unlabeled_rows: UnlabeledRows::default(),
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn with_virtual_instance(mut self, vi: Option<String>) -> Self {
        self.virtual_instance = vi.filter(|v| !v.is_empty());
        self
    }

    pub fn with_unlabeled_rows(mut self, policy: UnlabeledRows) -> Self {
        self.unlabeled_rows = policy;
        self
    }
}
