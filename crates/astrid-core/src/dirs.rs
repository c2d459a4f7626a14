//! Directory scaffolding for Astrid home and workspace directories.
//!
//! Two key directory structures:
//!
//! - [`AstridHome`]: Global state at `~/.astrid/` (or `$ASTRID_HOME`).
//!   Holds keys, audit logs, capability databases, sessions, workspace state,
//!   and global config. All sensitive/runtime data lives here.
//!
//! - [`WorkspaceDir`]: Per-project directory at `<project>/.astrid/`.
//!   Holds only committable project-level config (like `.claude/CLAUDE.md`).
//!   Contains a `workspace-id` UUID that links the project to its global state.
//!
//! # Layout
//!
//! ```text
//! ~/.astrid/                      (AstridHome)
//! ├── keys/
//! │   └── user.key                  (ed25519 secret key, 0600)
//! ├── logs/                         (daemon/runtime log files)
//! ├── sessions/                     (session JSON files)
//! ├── state.db/                     (SurrealKV — allowances, budget, escape)
//! ├── audit.db/                     (SurrealKV — audit entries)
//! ├── capabilities.db/              (SurrealKV — capability tokens)
//! ├── deferred.db/                  (SurrealKV — deferred queue)
//! ├── hooks/                        (user-level hooks)
//! ├── plugins/                      (installed plugins)
//! ├── cache/plugins/                (plugin compilation cache)
//! ├── state/                        (gateway state)
//! ├── servers.toml                  (MCP server config)
//! ├── gateway.toml                  (gateway daemon config)
//! └── config.toml                   (global runtime config)
//!
//! <project>/.astrid/              (WorkspaceDir)
//! ├── workspace-id                  (UUID linking project to global state)
//! └── ASTRID.md                   (project-level instructions)
//! ```

use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Global Astrid home directory (`~/.astrid/` or `$ASTRID_HOME`).
///
/// Contains keys, audit databases, capability stores, and global config.
#[derive(Debug, Clone)]
pub struct AstridHome {
    root: PathBuf,
}

impl AstridHome {
    /// Resolve the home directory.
    ///
    /// Checks `$ASTRID_HOME` first, then falls back to `$HOME/.astrid/`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `$ASTRID_HOME` nor `$HOME` is set.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var("ASTRID_HOME") {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "ASTRID_HOME must be an absolute path",
                ));
            }
            p
        } else {
            let home = std::env::var("HOME").map_err(|_| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither ASTRID_HOME nor HOME environment variable is set",
                )
            })?;
            PathBuf::from(home).join(".astrid")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists with secure permissions.
    ///
    /// Creates `keys/`, `logs/`, and `sessions/` subdirectories and sets them
    /// all to `0o700` on Unix (owner-only access).
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.keys_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.sessions_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(self.root(), perms.clone())?;
            std::fs::set_permissions(self.keys_dir(), perms.clone())?;
            std::fs::set_permissions(self.logs_dir(), perms.clone())?;
            std::fs::set_permissions(self.sessions_dir(), perms)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys directory (`~/.astrid/keys/`).
    #[must_use]
    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    /// Logs directory (`~/.astrid/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Path to the user's ed25519 secret key file.
    #[must_use]
    pub fn user_key_path(&self) -> PathBuf {
        self.keys_dir().join("user.key")
    }

    /// Path to the audit database directory (`SurrealKV`).
    #[must_use]
    pub fn audit_db_path(&self) -> PathBuf {
        self.root.join("audit.db")
    }

    /// Path to the capabilities database directory (`SurrealKV`).
    #[must_use]
    pub fn capabilities_db_path(&self) -> PathBuf {
        self.root.join("capabilities.db")
    }

    /// Path to the deferred queue database directory (`SurrealKV`).
    #[must_use]
    pub fn deferred_db_path(&self) -> PathBuf {
        self.root.join("deferred.db")
    }

    /// Path to the MCP servers configuration file.
    #[must_use]
    pub fn servers_config_path(&self) -> PathBuf {
        self.root.join("servers.toml")
    }

    /// Path to the global runtime configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Sessions directory (`~/.astrid/sessions/`).
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    /// Path to the workspace state database directory (`SurrealKV`).
    #[must_use]
    pub fn state_db_path(&self) -> PathBuf {
        self.root.join("state.db")
    }

    /// Installed plugins directory (`~/.astrid/plugins/`).
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    /// Plugin compilation cache directory (`~/.astrid/cache/plugins/`).
    #[must_use]
    pub fn plugin_cache_dir(&self) -> PathBuf {
        self.root.join("cache").join("plugins")
    }

    /// Hooks directory (`~/.astrid/hooks/`).
    #[must_use]
    pub fn hooks_dir(&self) -> PathBuf {
        self.root.join("hooks")
    }

    /// Path to the gateway configuration file (`~/.astrid/gateway.toml`).
    #[must_use]
    pub fn gateway_config_path(&self) -> PathBuf {
        self.root.join("gateway.toml")
    }

    /// State directory (`~/.astrid/state/`).
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }
}

/// Per-project workspace directory (`<project>/.astrid/`).
///
/// Contains only committable project-level config. A `workspace-id` UUID
/// links the project to its global state in `~/.astrid/`.
#[derive(Debug, Clone)]
pub struct WorkspaceDir {
    /// The project root (parent of `.astrid/`).
    project_root: PathBuf,
}

impl WorkspaceDir {
    /// Detect the workspace directory by walking up from `start_dir`.
    ///
    /// Detection order:
    /// 1. Directory containing `.astrid/`
    /// 2. Directory containing `.git`
    /// 3. Directory containing `ASTRID.md`
    /// 4. Fallback to `start_dir` itself
    #[must_use]
    pub fn detect(start_dir: &Path) -> Self {
        let start = if start_dir.is_absolute() {
            start_dir.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(start_dir)
        };

        let mut current = start.as_path();

        loop {
            // Check for .astrid/ directory
            if current.join(".astrid").is_dir() {
                return Self {
                    project_root: current.to_path_buf(),
                };
            }

            // Check for .git
            if current.join(".git").exists() {
                return Self {
                    project_root: current.to_path_buf(),
                };
            }

            // Check for ASTRID.md
            if current.join("ASTRID.md").exists() {
                return Self {
                    project_root: current.to_path_buf(),
                };
            }

            // Walk up
            match current.parent() {
                Some(parent) if parent != current => current = parent,
                _ => break,
            }
        }

        // Fallback to start_dir
        Self {
            project_root: start,
        }
    }

    /// Create from an explicit project root (useful for testing).
    #[must_use]
    pub fn from_path(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Ensure the `.astrid/` directory exists and generate a workspace ID
    /// if one does not already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or workspace ID generation fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.dot_astrid())?;
        // Generate workspace ID if missing (idempotent — reads existing).
        let _ = self.workspace_id()?;
        Ok(())
    }

    /// Project root directory (parent of `.astrid/`).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.project_root
    }

    /// The `.astrid/` directory itself.
    #[must_use]
    pub fn dot_astrid(&self) -> PathBuf {
        self.project_root.join(".astrid")
    }

    /// Path to the workspace-id file (`.astrid/workspace-id`).
    #[must_use]
    pub fn workspace_id_path(&self) -> PathBuf {
        self.dot_astrid().join("workspace-id")
    }

    /// Read or generate the workspace ID.
    ///
    /// If the file exists (e.g. cloned from a repo), its UUID is adopted.
    /// Otherwise a new UUID is generated and written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn workspace_id(&self) -> io::Result<Uuid> {
        let path = self.workspace_id_path();
        if let Ok(content) = std::fs::read_to_string(&path) {
            let trimmed = content.trim();
            if let Ok(id) = Uuid::parse_str(trimmed) {
                return Ok(id);
            }
        }
        // Generate and write a new workspace ID.
        std::fs::create_dir_all(self.dot_astrid())?;
        let id = Uuid::new_v4();
        std::fs::write(&path, id.to_string())?;
        Ok(id)
    }

    /// Path to the project-level instructions file (`.astrid/ASTRID.md`).
    #[must_use]
    pub fn instructions_path(&self) -> PathBuf {
        self.dot_astrid().join("ASTRID.md")
    }
}
