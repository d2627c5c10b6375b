//! 本地 JSON 文档存储：数据源配置、最近一次连接、命名查询。
//!
//! 每个文档整体读写；写入先落临时文件再 rename，避免半写入的文件。

use crate::models::context::{LastConnection, SavedQuery};
use crate::models::schema::DataSource;
use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const DATA_SOURCES: &str = "datasources.json";
const LAST_CONNECTION: &str = "last_connection.json";
const QUERIES: &str = "queries.json";

pub struct Store {
    dir: PathBuf,
    // 串行化所有写操作 (读-改-写)
    write_lock: Mutex<()>,
}

impl Store {
    pub async fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("cannot create store dir {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub async fn list_data_sources(&self) -> anyhow::Result<Vec<DataSource>> {
        let map: BTreeMap<String, DataSource> = self.read(DATA_SOURCES).await?.unwrap_or_default();
        Ok(map.into_values().collect())
    }

    pub async fn get_data_source(&self, id: &str) -> anyhow::Result<Option<DataSource>> {
        let mut map: BTreeMap<String, DataSource> =
            self.read(DATA_SOURCES).await?.unwrap_or_default();
        Ok(map.remove(id))
    }

    pub async fn upsert_data_source(&self, source: DataSource) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map: BTreeMap<String, DataSource> =
            self.read(DATA_SOURCES).await?.unwrap_or_default();
        map.insert(source.id.clone(), source);
        self.write(DATA_SOURCES, &map).await
    }

    pub async fn last_connection(&self) -> anyhow::Result<Option<LastConnection>> {
        self.read(LAST_CONNECTION).await
    }

    pub async fn set_last_connection(&self, record: &LastConnection) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(LAST_CONNECTION, record).await
    }

    pub async fn list_queries(&self) -> anyhow::Result<BTreeMap<String, SavedQuery>> {
        Ok(self.read(QUERIES).await?.unwrap_or_default())
    }

    pub async fn save_query(&self, name: &str, query: SavedQuery) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map: BTreeMap<String, SavedQuery> = self.read(QUERIES).await?.unwrap_or_default();
        map.insert(name.to_string(), query);
        self.write(QUERIES, &map).await
    }

    /// 返回是否确有删除
    pub async fn delete_query(&self, name: &str) -> anyhow::Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut map: BTreeMap<String, SavedQuery> = self.read(QUERIES).await?.unwrap_or_default();
        if map.remove(name).is_none() {
            return Ok(false);
        }
        self.write(QUERIES, &map).await?;
        Ok(true)
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> anyhow::Result<Option<T>> {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("corrupt store document {}", path.display()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    async fn write<T: Serialize>(&self, file: &str, value: &T) -> anyhow::Result<()> {
        let path = self.dir.join(file);
        let tmp = tmp_path(&path);
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("cannot write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("cannot replace {}", path.display()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
