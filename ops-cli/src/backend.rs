// Table client selection: hosted REST API or a local JSON snapshot
use config_engine::BackendSettings;
use database_layer::{DatabaseResult, InMemoryTables, RestTableClient, TableClient};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub enum Backend {
    /// Offline store loaded from (and saved back to) a snapshot file
    Snapshot {
        store: Arc<InMemoryTables>,
        path: PathBuf,
    },
    Remote(Arc<RestTableClient>),
}

impl Backend {
    /// A snapshot path wins over the configured REST backend; a missing snapshot starts empty
    pub fn open(settings: &BackendSettings, snapshot: Option<&Path>) -> DatabaseResult<Self> {
        match snapshot {
            Some(path) => {
                let store = if path.exists() {
                    InMemoryTables::from_snapshot(path)?
                } else {
                    warn!(path = %path.display(), "Snapshot not found, starting with empty tables");
                    InMemoryTables::new()
                };
                Ok(Self::Snapshot {
                    store: Arc::new(store),
                    path: path.to_path_buf(),
                })
            }
            None => {
                info!(base_url = %settings.base_url, "Using hosted table API");
                Ok(Self::Remote(Arc::new(RestTableClient::new(settings)?)))
            }
        }
    }

    pub fn client(&self) -> Arc<dyn TableClient> {
        match self {
            Self::Snapshot { store, .. } => store.clone() as Arc<dyn TableClient>,
            Self::Remote(client) => client.clone(),
        }
    }

    /// Write offline changes back to the snapshot; remote writes are already durable
    pub fn persist(&self) -> DatabaseResult<()> {
        match self {
            Self::Snapshot { store, path } => store.save_snapshot(path),
            Self::Remote(_) => Ok(()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot { path, .. } => write!(f, "snapshot {}", path.display()),
            Self::Remote(_) => write!(f, "hosted table API"),
        }
    }
}
