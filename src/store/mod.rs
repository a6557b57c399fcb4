//! 运行记录持久化：成功的运行写入 SQLite，供 `--latest` 与 `GET /latest-personas` 查询
//!
//! 核心流水线不感知存储，由 CLI / Web 在成功后调用 [`RunStore::save`]。

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::core::AgentError;
use crate::schema::Persona;

const SCHEMA_VERSION: i32 = 1;

/// 一次成功运行的记录
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: String,
    pub goal: String,
    pub personas: Vec<Persona>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct RunStore {
    conn: Arc<Mutex<Connection>>,
}

impl RunStore {
    /// 打开（不存在则创建）数据库并执行迁移
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgentError::Storage(format!(
                    "Failed to create data directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// 内存数据库
    pub fn in_memory() -> Result<Self, AgentError> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, AgentError> {
        self.conn
            .lock()
            .map_err(|e| AgentError::Storage(format!("Lock error: {}", e)))
    }

    fn run_migrations(&self) -> Result<(), AgentError> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;
        let current: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current < 1 {
            conn.execute(
                r#"
                CREATE TABLE IF NOT EXISTS runs (
                    id TEXT PRIMARY KEY,
                    goal TEXT NOT NULL,
                    personas_json TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL
                )
                "#,
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at)",
                [],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }
        Ok(())
    }

    /// 保存一次成功运行，返回 run id
    pub fn save(&self, goal: &str, personas: &[Persona]) -> Result<String, AgentError> {
        let id = Uuid::new_v4().to_string();
        let personas_json =
            serde_json::to_string(personas).map_err(|e| AgentError::Storage(e.to_string()))?;
        let created_at = Utc::now().to_rfc3339();

        self.lock()?.execute(
            "INSERT INTO runs (id, goal, personas_json, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, goal, personas_json, created_at],
        )?;
        tracing::info!("Saved run {} with {} personas", id, personas.len());
        Ok(id)
    }

    /// 最近一次运行（按写入顺序）
    pub fn latest_run(&self) -> Result<Option<RunRecord>, AgentError> {
        let row = self
            .lock()?
            .query_row(
                "SELECT id, goal, personas_json, created_at FROM runs ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, goal, personas_json, created_at)| {
            let personas = serde_json::from_str(&personas_json)
                .map_err(|e| AgentError::Storage(format!("corrupt personas for run {}: {}", id, e)))?;
            Ok(RunRecord {
                id,
                goal,
                personas,
                created_at,
            })
        })
        .transpose()
    }

    /// 最近一次运行的人设；无记录时为空列表
    pub fn latest(&self) -> Result<Vec<Persona>, AgentError> {
        Ok(self.latest_run()?.map(|r| r.personas).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::persona::fixtures::persona_json;
    use tempfile::TempDir;

    fn persona(name: &str) -> Persona {
        serde_json::from_value(persona_json(name, "Helper")).unwrap()
    }

    #[test]
    fn test_latest_on_empty_store() {
        let store = RunStore::in_memory().unwrap();
        assert!(store.latest().unwrap().is_empty());
        assert!(store.latest_run().unwrap().is_none());
    }

    #[test]
    fn test_latest_returns_most_recent_run() {
        let store = RunStore::in_memory().unwrap();
        store.save("first goal", &[persona("Old")]).unwrap();
        let id = store.save("second goal", &[persona("New A"), persona("New B")]).unwrap();

        let run = store.latest_run().unwrap().unwrap();
        assert_eq!(run.id, id);
        assert_eq!(run.goal, "second goal");
        let names: Vec<_> = run.personas.iter().map(|p| p.persona_name.as_str()).collect();
        assert_eq!(names, ["New A", "New B"]);
    }

    #[test]
    fn test_reopen_keeps_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("runs.db");
        RunStore::open_at(&path).unwrap().save("goal", &[persona("Kept")]).unwrap();

        let reopened = RunStore::open_at(&path).unwrap();
        assert_eq!(reopened.latest().unwrap()[0].persona_name, "Kept");
    }

    #[test]
    fn test_unusable_parent_dir_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = RunStore::open_at(blocker.join("runs.db")).err().unwrap();
        match err {
            AgentError::Storage(msg) => assert!(msg.contains("Failed to create data directory")),
            other => panic!("expected Storage error, got {other:?}"),
        }
    }
}
