//! 试卷与成绩存储 - 基础设施层
//!
//! 按用户保存试卷列表和考试历史。
//! 试卷按生成顺序追加，历史记录最新的在最前面。

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Exam, ExamResult};

type StoreResult<T> = Result<T, StoreError>;

/// 存储接口
///
/// `append_exam` / `record_result` 的读改写在 `update_lock` 下串行执行
pub trait ExamStore: Send + Sync {
    /// 读改写共用的锁
    fn update_lock(&self) -> &AsyncMutex<()>;

    fn load_exams<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Exam>>>;

    fn save_exams<'a>(&'a self, user_id: &'a str, exams: &'a [Exam]) -> BoxFuture<'a, StoreResult<()>>;

    fn load_history<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<ExamResult>>>;

    fn save_history<'a>(
        &'a self,
        user_id: &'a str,
        history: &'a [ExamResult],
    ) -> BoxFuture<'a, StoreResult<()>>;
}

/// 追加一份试卷
pub async fn append_exam(store: &dyn ExamStore, user_id: &str, exam: &Exam) -> StoreResult<()> {
    let _guard = store.update_lock().lock().await;
    let mut exams = store.load_exams(user_id).await?;
    exams.push(exam.clone());
    store.save_exams(user_id, &exams).await
}

/// 记录一次成绩，放在历史最前面
pub async fn record_result(store: &dyn ExamStore, user_id: &str, result: &ExamResult) -> StoreResult<()> {
    let _guard = store.update_lock().lock().await;
    let mut history = store.load_history(user_id).await?;
    history.insert(0, result.clone());
    store.save_history(user_id, &history).await
}

// ========== 内存实现 ==========

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    exams: Mutex<HashMap<String, Vec<Exam>>>,
    history: Mutex<HashMap<String, Vec<ExamResult>>>,
    update: AsyncMutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read_entry<T: Clone>(map: &Mutex<HashMap<String, Vec<T>>>, user_id: &str) -> Vec<T> {
    let guard = match map.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.get(user_id).cloned().unwrap_or_default()
}

fn write_entry<T: Clone>(map: &Mutex<HashMap<String, Vec<T>>>, user_id: &str, items: &[T]) {
    let mut guard = match map.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.insert(user_id.to_string(), items.to_vec());
}

impl ExamStore for MemoryStore {
    fn update_lock(&self) -> &AsyncMutex<()> {
        &self.update
    }

    fn load_exams<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Exam>>> {
        Box::pin(async move { Ok(read_entry(&self.exams, user_id)) })
    }

    fn save_exams<'a>(&'a self, user_id: &'a str, exams: &'a [Exam]) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            write_entry(&self.exams, user_id, exams);
            Ok(())
        })
    }

    fn load_history<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<ExamResult>>> {
        Box::pin(async move { Ok(read_entry(&self.history, user_id)) })
    }

    fn save_history<'a>(
        &'a self,
        user_id: &'a str,
        history: &'a [ExamResult],
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            write_entry(&self.history, user_id, history);
            Ok(())
        })
    }
}

// ========== 文件实现 ==========

/// JSON 文件存储
///
/// 每个用户两份文件：`exams_<user>.json`、`history_<user>.json`。
/// 克隆出来的实例共用同一把更新锁。
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    update: Arc<AsyncMutex<()>>,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            update: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn exams_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("exams_{}.json", user_id))
    }

    pub fn history_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("history_{}.json", user_id))
    }

    /// 文件不存在视为空列表
    async fn read_list<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
        let path_text = path.display().to_string();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("存储文件不存在，视为空: {}", path_text);
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::read_failed(path_text, e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::json(path_text, e))
    }

    async fn write_list<T: serde::Serialize>(&self, path: &Path, items: &[T]) -> StoreResult<()> {
        let path_text = path.display().to_string();
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StoreError::write_failed(self.data_dir.display().to_string(), e))?;
        let content = serde_json::to_string_pretty(items).map_err(|e| StoreError::json(path_text.clone(), e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| StoreError::write_failed(path_text.clone(), e))?;
        debug!("已写入 {} 条记录: {}", items.len(), path_text);
        Ok(())
    }
}

impl ExamStore for JsonFileStore {
    fn update_lock(&self) -> &AsyncMutex<()> {
        &self.update
    }

    fn load_exams<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Exam>>> {
        Box::pin(async move { Self::read_list(&self.exams_path(user_id)).await })
    }

    fn save_exams<'a>(&'a self, user_id: &'a str, exams: &'a [Exam]) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.write_list(&self.exams_path(user_id), exams).await })
    }

    fn load_history<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<ExamResult>>> {
        Box::pin(async move { Self::read_list(&self.history_path(user_id)).await })
    }

    fn save_history<'a>(
        &'a self,
        user_id: &'a str,
        history: &'a [ExamResult],
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.write_list(&self.history_path(user_id), history).await })
    }
}

/// 读取为空、写入总是失败的存储，用于测试保存失败路径
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    update: AsyncMutex<()>,
}

#[cfg(test)]
impl FailingStore {
    fn refuse(&self) -> StoreError {
        StoreError::write_failed(
            "unwritable",
            std::io::Error::new(ErrorKind::Other, "disk full"),
        )
    }
}

#[cfg(test)]
impl ExamStore for FailingStore {
    fn update_lock(&self) -> &AsyncMutex<()> {
        &self.update
    }

    fn load_exams<'a>(&'a self, _user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Exam>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn save_exams<'a>(
        &'a self,
        _user_id: &'a str,
        _exams: &'a [Exam],
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { Err(self.refuse()) })
    }

    fn load_history<'a>(&'a self, _user_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<ExamResult>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn save_history<'a>(
        &'a self,
        _user_id: &'a str,
        _history: &'a [ExamResult],
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { Err(self.refuse()) })
    }
}
