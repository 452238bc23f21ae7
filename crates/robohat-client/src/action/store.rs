//! 动作表存储
//!
//! 播放器只需要"按顺序读出全部行"这一个能力。

use super::ActionRow;
use crate::error::ClientError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 动作表读取接口
pub trait ActionTableStore: Send + Sync {
    /// 按存储顺序读出全部行
    ///
    /// # 错误
    /// - `NotFound`: 路径不存在
    /// - `Store`: 内容无法解析
    fn read_rows(&self, path: &Path) -> Result<Vec<ActionRow>, ClientError>;
}

/// 内存中的动作表（测试和程序生成的动作）
#[derive(Default)]
pub struct MemoryActionStore {
    tables: RwLock<HashMap<PathBuf, Vec<ActionRow>>>,
}

impl MemoryActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加或替换一张表
    pub fn insert(&self, path: impl Into<PathBuf>, rows: Vec<ActionRow>) {
        self.tables.write().insert(path.into(), rows);
    }

    pub fn remove(&self, path: &Path) -> Option<Vec<ActionRow>> {
        self.tables.write().remove(path)
    }
}

impl ActionTableStore for MemoryActionStore {
    fn read_rows(&self, path: &Path) -> Result<Vec<ActionRow>, ClientError> {
        self.tables
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(path.to_path_buf()))
    }
}

/// TOML 文件格式
///
/// ```toml
/// [[rows]]
/// duration = 500
/// positions = [500, 500, 300]
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct ActionFile {
    #[serde(default)]
    rows: Vec<ActionRow>,
}

/// TOML 文件动作表
///
/// 相对路径相对于 `root` 解析。
#[derive(Debug, Clone, Default)]
pub struct TomlActionStore {
    root: Option<PathBuf>,
}

impl TomlActionStore {
    /// 只接受绝对路径或相对于当前目录的路径
    pub fn new() -> Self {
        Self::default()
    }

    /// 相对路径相对于 `root` 解析
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// 解析后的完整路径
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// 写出一张动作表（覆盖已有文件）
    pub fn write_rows(&self, path: &Path, rows: &[ActionRow]) -> Result<(), ClientError> {
        let full = self.resolve(path);
        let store_err = |message: String| ClientError::Store {
            path: full.clone(),
            message,
        };
        let file = ActionFile {
            rows: rows.to_vec(),
        };
        let text = toml::to_string(&file).map_err(|e| store_err(e.to_string()))?;
        std::fs::write(&full, text).map_err(|e| store_err(e.to_string()))?;
        Ok(())
    }
}

impl ActionTableStore for TomlActionStore {
    fn read_rows(&self, path: &Path) -> Result<Vec<ActionRow>, ClientError> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(ClientError::NotFound(full));
        }

        let text = std::fs::read_to_string(&full).map_err(|e| ClientError::Store {
            path: full.clone(),
            message: e.to_string(),
        })?;
        let file: ActionFile = toml::from_str(&text).map_err(|e| ClientError::Store {
            path: full.clone(),
            message: e.to_string(),
        })?;
        debug!("Loaded {} rows from {}", file.rows.len(), full.display());
        Ok(file.rows)
    }
}
