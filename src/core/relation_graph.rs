//! 外键关系图与连接路径搜索。
//!
//! 图是无向的：每条外键在两端表的邻接表里各登记一次，两侧列名各自保留。
//! 邻接表按插入顺序保存，BFS 依此顺序展开，保证最短路径出现并列时结果确定。

use crate::models::schema::ForeignKeyRow;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// 邻接表中的一项：从当前表经 `local_column = neighbor.neighbor_column` 到达 `neighbor`
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Adjacent {
    pub neighbor: String,
    pub local_column: String,
    pub neighbor_column: String,
}

/// 路径中的一步，方向与遍历方向一致
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RelationStep {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct RelationGraph {
    adjacency: HashMap<String, Vec<Adjacent>>,
}

impl RelationGraph {
    /// 由外键行构建新图。不去重：重复外键只会产生无害的重复邻接项。
    pub fn build(foreign_keys: &[ForeignKeyRow]) -> Self {
        let mut adjacency: HashMap<String, Vec<Adjacent>> = HashMap::new();

        for fk in foreign_keys {
            let parent = fk.parent();
            let referenced = fk.referenced();

            adjacency.entry(parent.clone()).or_default().push(Adjacent {
                neighbor: referenced.clone(),
                local_column: fk.parent_column.clone(),
                neighbor_column: fk.ref_column.clone(),
            });
            adjacency.entry(referenced).or_default().push(Adjacent {
                neighbor: parent,
                local_column: fk.ref_column.clone(),
                neighbor_column: fk.parent_column.clone(),
            });
        }

        Self { adjacency }
    }

    pub fn neighbors(&self, table: &str) -> &[Adjacent] {
        self.adjacency.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn table_count(&self) -> usize {
        self.adjacency.len()
    }

    /// 广度优先搜索 `start` → `end` 的最短连接路径。
    ///
    /// 不可达 (包括 `end` 根本没有外键关系) 或 `start == end` 时返回空路径。
    pub fn find_path(&self, start: &str, end: &str) -> Vec<RelationStep> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, Vec<RelationStep>)> = VecDeque::new();
        queue.push_back((start, Vec::new()));

        while let Some((table, path)) = queue.pop_front() {
            if table == end {
                return path;
            }
            // 出队时标记
            if !visited.insert(table) {
                continue;
            }
            for adj in self.neighbors(table) {
                if visited.contains(adj.neighbor.as_str()) {
                    continue;
                }
                let mut next = path.clone();
                next.push(RelationStep {
                    from_table: table.to_string(),
                    from_column: adj.local_column.clone(),
                    to_table: adj.neighbor.clone(),
                    to_column: adj.neighbor_column.clone(),
                });
                queue.push_back((adj.neighbor.as_str(), next));
            }
        }

        Vec::new()
    }
}
