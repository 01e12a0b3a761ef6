//! 持久化翻译缓存
//!
//! 每个原文一行，每种目标语言一列（宽表，NULL 表示尚未翻译）。
//! 新语言出现时在线增加列。所有数据库操作都排队交给同一个工作线程执行，
//! 调用方通过 oneshot 通道异步获取结果，不会阻塞调用线程。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::{mpsc, oneshot};

use crate::translation::error::{StoreError, StoreResult};
use crate::translation::language::Language;

/// 原文主键的最大长度（字符数）
pub const MAX_SOURCE_LENGTH: usize = 2048;

const SOURCE_COLUMN: &str = "source";

// ============================================================================
// 配置与状态
// ============================================================================

/// 缓存文件位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    File(PathBuf),
    /// 仅存在于进程内，主要用于测试
    Memory,
}

/// 缓存配置
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub location: CacheLocation,
    /// 表名，每个逻辑缓存实例一张表
    pub table: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            location: CacheLocation::Memory,
            table: "DEEPL".to_string(),
        }
    }
}

/// 连接生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreState {
    Closed = 0,
    Opening = 1,
    Open = 2,
    Closing = 3,
}

impl StoreState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StoreState::Opening,
            2 => StoreState::Open,
            3 => StoreState::Closing,
            _ => StoreState::Closed,
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub writes: AtomicU64,
    pub write_failures: AtomicU64,
}

/// 缓存统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSnapshot {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// 工作线程命令
// ============================================================================

enum CacheCommand {
    Open {
        respond_to: oneshot::Sender<StoreResult<()>>,
    },
    Get {
        source: String,
        code: String,
        respond_to: oneshot::Sender<Option<String>>,
    },
    Put {
        source: String,
        code: String,
        translated: String,
        respond_to: oneshot::Sender<StoreResult<()>>,
    },
    EnsureColumns {
        codes: Vec<String>,
        respond_to: oneshot::Sender<StoreResult<usize>>,
    },
    Columns {
        respond_to: oneshot::Sender<Vec<String>>,
    },
    Count {
        respond_to: oneshot::Sender<StoreResult<usize>>,
    },
    Close {
        respond_to: oneshot::Sender<()>,
    },
}

// ============================================================================
// 对外句柄
// ============================================================================

/// 持久化翻译缓存句柄，可廉价克隆，所有克隆共享同一个工作线程
#[derive(Clone)]
pub struct PersistentCache {
    commands: mpsc::UnboundedSender<CacheCommand>,
    state: Arc<AtomicU8>,
    stats: Arc<CacheStats>,
    table: Arc<str>,
}

impl PersistentCache {
    /// 创建缓存并启动工作线程，此时连接处于 `Closed` 状态
    pub fn new(config: CacheConfig) -> StoreResult<Self> {
        if !is_valid_table_name(&config.table) {
            return Err(StoreError::OpenFailed(format!(
                "无效的表名: {}",
                config.table
            )));
        }

        let state = Arc::new(AtomicU8::new(StoreState::Closed as u8));
        let (commands, receiver) = mpsc::unbounded_channel();
        let table: Arc<str> = Arc::from(config.table.as_str());

        let worker = CacheWorker {
            location: config.location,
            table: Arc::clone(&table),
            state: Arc::clone(&state),
            connection: None,
            columns: BTreeMap::new(),
        };

        std::thread::Builder::new()
            .name("polywoof-cache".to_string())
            .spawn(move || worker.run(receiver))
            .map_err(|e| StoreError::OpenFailed(format!("无法启动缓存工作线程: {}", e)))?;

        Ok(Self {
            commands,
            state,
            stats: Arc::new(CacheStats::default()),
            table,
        })
    }

    /// 当前连接状态
    pub fn state(&self) -> StoreState {
        StoreState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == StoreState::Open
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// 打开连接并确保基础表存在，可重复调用
    pub async fn open(&self) -> StoreResult<()> {
        if self.is_open() {
            return Ok(());
        }

        let _ = self.state.compare_exchange(
            StoreState::Closed as u8,
            StoreState::Opening as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        let (respond_to, response) = oneshot::channel();
        if self.commands.send(CacheCommand::Open { respond_to }).is_err() {
            self.state.store(StoreState::Closed as u8, Ordering::Release);
            return Err(StoreError::OpenFailed("缓存工作线程已退出".to_string()));
        }

        response
            .await
            .unwrap_or_else(|_| Err(StoreError::OpenFailed("缓存工作线程已退出".to_string())))
    }

    /// 查询译文，任何未命中或异常情况都返回 `None`
    pub async fn get(&self, source: &str, language: &Language) -> Option<String> {
        if language.is_unknown() || !self.is_open() {
            return None;
        }

        let (respond_to, response) = oneshot::channel();
        let command = CacheCommand::Get {
            source: source.to_string(),
            code: language.code.clone(),
            respond_to,
        };

        if self.commands.send(command).is_err() {
            return None;
        }

        let result = response.await.ok().flatten();
        match result {
            Some(_) => self.stats.hits.fetch_add(1, Ordering::Relaxed),
            None => self.stats.misses.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// 写入译文，主键冲突时覆盖旧值
    pub async fn put(&self, source: &str, language: &Language, translated: &str) -> StoreResult<()> {
        if !self.is_open() {
            return Err(StoreError::NotOpen);
        }

        if language.is_unknown() {
            return Err(StoreError::MissingColumn(language.code.clone()));
        }

        if source.chars().count() > MAX_SOURCE_LENGTH {
            return Err(StoreError::WriteFailed(format!(
                "原文超过 {} 个字符",
                MAX_SOURCE_LENGTH
            )));
        }

        let (respond_to, response) = oneshot::channel();
        let command = CacheCommand::Put {
            source: source.to_string(),
            code: language.code.clone(),
            translated: translated.to_string(),
            respond_to,
        };

        if self.commands.send(command).is_err() {
            return Err(StoreError::NotOpen);
        }

        let result = response.await.unwrap_or(Err(StoreError::NotOpen));
        match result {
            Ok(()) => self.stats.writes.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.stats.write_failures.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// 为缺失的语言增加列，返回新增列的数量
    pub async fn ensure_columns(&self, languages: &[Language]) -> StoreResult<usize> {
        if !self.is_open() {
            return Err(StoreError::NotOpen);
        }

        let codes = languages
            .iter()
            .filter(|language| !language.is_unknown())
            .map(|language| language.code.clone())
            .collect();

        let (respond_to, response) = oneshot::channel();
        if self
            .commands
            .send(CacheCommand::EnsureColumns { codes, respond_to })
            .is_err()
        {
            return Err(StoreError::NotOpen);
        }

        response.await.unwrap_or(Err(StoreError::NotOpen))
    }

    /// 已存在的语言列
    pub async fn columns(&self) -> Vec<String> {
        if !self.is_open() {
            return Vec::new();
        }

        let (respond_to, response) = oneshot::channel();
        if self.commands.send(CacheCommand::Columns { respond_to }).is_err() {
            return Vec::new();
        }

        response.await.unwrap_or_default()
    }

    /// 缓存中的原文行数
    pub async fn len(&self) -> StoreResult<usize> {
        if !self.is_open() {
            return Err(StoreError::NotOpen);
        }

        let (respond_to, response) = oneshot::channel();
        if self.commands.send(CacheCommand::Count { respond_to }).is_err() {
            return Err(StoreError::NotOpen);
        }

        response.await.unwrap_or(Err(StoreError::NotOpen))
    }

    /// 处理完已排队的操作后关闭连接
    pub async fn close(&self) {
        if self.state() == StoreState::Closed {
            return;
        }

        self.state.store(StoreState::Closing as u8, Ordering::Release);

        let (respond_to, response) = oneshot::channel();
        if self.commands.send(CacheCommand::Close { respond_to }).is_err() {
            self.state.store(StoreState::Closed as u8, Ordering::Release);
            return;
        }

        let _ = response.await;
    }
}

// ============================================================================
// 工作线程
// ============================================================================

struct CacheWorker {
    location: CacheLocation,
    table: Arc<str>,
    state: Arc<AtomicU8>,
    connection: Option<Connection>,
    /// 小写列名 -> 实际列名
    columns: BTreeMap<String, String>,
}

impl CacheWorker {
    fn run(mut self, mut commands: mpsc::UnboundedReceiver<CacheCommand>) {
        while let Some(command) = commands.blocking_recv() {
            self.handle(command);
        }

        self.teardown();
    }

    fn handle(&mut self, command: CacheCommand) {
        match command {
            CacheCommand::Open { respond_to } => {
                let _ = respond_to.send(self.open());
            }
            CacheCommand::Get {
                source,
                code,
                respond_to,
            } => {
                let _ = respond_to.send(self.select(&source, &code));
            }
            CacheCommand::Put {
                source,
                code,
                translated,
                respond_to,
            } => {
                let result = self.insert(&source, &code, &translated);
                if let Err(StoreError::WriteFailed(ref e)) = result {
                    tracing::warn!("[{}] 写入缓存失败，连接已关闭: {}", code, e);
                    self.teardown();
                }
                let _ = respond_to.send(result);
            }
            CacheCommand::EnsureColumns { codes, respond_to } => {
                let result = self.update(&codes);
                if let Err(StoreError::WriteFailed(ref e)) = result {
                    tracing::warn!("更新语言列失败，连接已关闭: {}", e);
                    self.teardown();
                }
                let _ = respond_to.send(result);
            }
            CacheCommand::Columns { respond_to } => {
                let _ = respond_to.send(self.columns.values().cloned().collect());
            }
            CacheCommand::Count { respond_to } => {
                let _ = respond_to.send(self.count());
            }
            CacheCommand::Close { respond_to } => {
                self.teardown();
                let _ = respond_to.send(());
            }
        }
    }

    fn set_state(&self, state: StoreState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn open(&mut self) -> StoreResult<()> {
        if self.connection.is_some() {
            self.set_state(StoreState::Open);
            return Ok(());
        }

        self.set_state(StoreState::Opening);

        match self.connect() {
            Ok((connection, columns)) => {
                tracing::info!("翻译缓存已打开: 表 {}，{} 个语言列", self.table, columns.len());
                self.connection = Some(connection);
                self.columns = columns;
                self.set_state(StoreState::Open);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("打开翻译缓存失败: {}", e);
                self.teardown();
                Err(StoreError::OpenFailed(e.to_string()))
            }
        }
    }

    fn connect(&self) -> Result<(Connection, BTreeMap<String, String>), Box<dyn std::error::Error>> {
        let connection = match &self.location {
            CacheLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(path)?
            }
            CacheLocation::Memory => Connection::open_in_memory()?,
        };

        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR({}) PRIMARY KEY)",
                quote(&self.table),
                SOURCE_COLUMN,
                MAX_SOURCE_LENGTH
            ),
            [],
        )?;

        let columns = load_columns(&connection, &self.table)?;
        Ok((connection, columns))
    }

    fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err((_, e)) = connection.close() {
                tracing::warn!("关闭翻译缓存连接失败: {}", e);
            }
        }
        self.columns.clear();
        self.set_state(StoreState::Closed);
    }

    fn column_for(&self, code: &str) -> Option<&str> {
        self.columns.get(&code.to_lowercase()).map(String::as_str)
    }

    fn select(&self, source: &str, code: &str) -> Option<String> {
        let connection = self.connection.as_ref()?;
        let column = self.column_for(code)?;

        let sql = format!(
            "SELECT {column} FROM {table} WHERE {key} = ?1 AND {column} IS NOT NULL",
            column = quote(column),
            table = quote(&self.table),
            key = SOURCE_COLUMN,
        );

        match connection
            .query_row(&sql, params![source], |row| row.get::<_, String>(0))
            .optional()
        {
            Ok(found) => {
                if found.is_some() {
                    tracing::debug!("[{}] SELECT", code);
                }
                found
            }
            Err(e) => {
                tracing::warn!("[{}] 查询缓存失败: {}", code, e);
                None
            }
        }
    }

    fn insert(&self, source: &str, code: &str, translated: &str) -> StoreResult<()> {
        let connection = self.connection.as_ref().ok_or(StoreError::NotOpen)?;
        let column = self
            .column_for(code)
            .ok_or_else(|| StoreError::MissingColumn(code.to_string()))?;

        let sql = format!(
            "INSERT INTO {table} ({key}, {column}) VALUES (?1, ?2) \
             ON CONFLICT({key}) DO UPDATE SET {column} = excluded.{column}",
            table = quote(&self.table),
            key = SOURCE_COLUMN,
            column = quote(column),
        );

        connection.execute(&sql, params![source, translated])?;
        tracing::info!("[{}] INSERT", code);
        Ok(())
    }

    fn update(&mut self, codes: &[String]) -> StoreResult<usize> {
        let connection = self.connection.as_ref().ok_or(StoreError::NotOpen)?;
        let mut added = 0;

        for code in codes {
            let key = code.to_lowercase();
            if key == SOURCE_COLUMN || self.columns.contains_key(&key) {
                continue;
            }

            connection.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} VARCHAR({})",
                    quote(&self.table),
                    quote(code),
                    MAX_SOURCE_LENGTH
                ),
                [],
            )?;

            tracing::info!("[{}] UPDATE", code);
            self.columns.insert(key, code.clone());
            added += 1;
        }

        Ok(added)
    }

    fn count(&self) -> StoreResult<usize> {
        let connection = self.connection.as_ref().ok_or(StoreError::NotOpen)?;
        let count: i64 = connection.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(&self.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn load_columns(
    connection: &Connection,
    table: &str,
) -> rusqlite::Result<BTreeMap<String, String>> {
    let mut statement = connection.prepare(&format!("PRAGMA table_info({})", quote(table)))?;
    let names = statement.query_map([], |row| row.get::<_, String>(1))?;

    let mut columns = BTreeMap::new();
    for name in names {
        let name = name?;
        if !name.eq_ignore_ascii_case(SOURCE_COLUMN) {
            columns.insert(name.to_lowercase(), name);
        }
    }
    Ok(columns)
}

/// 引用SQL标识符
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// 表名只允许字母、数字和下划线，且不能以数字开头
pub(crate) fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
