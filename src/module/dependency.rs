//! 模块依赖记录
//!
//! 一次调用中「谁声明了谁」的边列表，只追加、只用于诊断，
//! 不参与排序，也不参与循环检测。
//!
//! # 示例
//!
//! ```rust
//! use std::sync::Arc;
//! use chips_orc::module::{DependencyGraph, Module, ModuleContext, ModuleId, ModuleRef};
//!
//! struct Noop;
//! impl Module for Noop {
//!     fn on_register(&self, _hooks: &mut ModuleContext) {}
//! }
//!
//! let db: ModuleRef = Arc::new(Noop);
//! let flags: ModuleRef = Arc::new(Noop);
//!
//! let mut graph = DependencyGraph::new();
//! graph.record(&db, &flags);
//! graph.record(&db, &flags);
//!
//! assert_eq!(graph.len(), 2);
//! assert_eq!(graph.dependencies_of(ModuleId::of(&db)), vec![ModuleId::of(&flags)]);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::metadata::{describe, ModuleId, ModuleRef};

/// 依赖边：依赖方 → 被依赖方
#[derive(Clone)]
pub struct Edge {
    /// 依赖方
    pub dependent: ModuleRef,
    /// 被依赖方
    pub dependency: ModuleRef,
}

impl Edge {
    /// 依赖方身份
    pub fn dependent_id(&self) -> ModuleId {
        ModuleId::of(&self.dependent)
    }

    /// 被依赖方身份
    pub fn dependency_id(&self) -> ModuleId {
        ModuleId::of(&self.dependency)
    }

    /// 是否连接给定的两个模块
    pub fn connects(&self, dependent: &ModuleRef, dependency: &ModuleRef) -> bool {
        self.dependent_id() == ModuleId::of(dependent)
            && self.dependency_id() == ModuleId::of(dependency)
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", describe(&self.dependent), describe(&self.dependency))
    }
}

/// 可序列化的边记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// 依赖方描述
    pub dependent: String,
    /// 被依赖方描述
    pub dependency: String,
}

/// 依赖图
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: Vec<Edge>,
}

impl DependencyGraph {
    /// 创建空依赖图
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条边，重复的边同样记录
    pub fn record(&mut self, dependent: &ModuleRef, dependency: &ModuleRef) {
        self.edges.push(Edge {
            dependent: Arc::clone(dependent),
            dependency: Arc::clone(dependency),
        });
    }

    /// 按记录顺序返回所有边
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// 边的数量
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// 是否没有任何边
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 某个模块声明过的依赖（去重，保持首次声明顺序）
    pub fn dependencies_of(&self, module: ModuleId) -> Vec<ModuleId> {
        let mut result = Vec::new();
        for edge in self.edges.iter().filter(|e| e.dependent_id() == module) {
            let id = edge.dependency_id();
            if !result.contains(&id) {
                result.push(id);
            }
        }
        result
    }

    /// 声明过依赖某个模块的模块（去重，保持首次声明顺序）
    pub fn dependents_of(&self, module: ModuleId) -> Vec<ModuleId> {
        let mut result = Vec::new();
        for edge in self.edges.iter().filter(|e| e.dependency_id() == module) {
            let id = edge.dependent_id();
            if !result.contains(&id) {
                result.push(id);
            }
        }
        result
    }

    /// 某条边被记录的次数
    pub fn count(&self, dependent: &ModuleRef, dependency: &ModuleRef) -> usize {
        self.edges
            .iter()
            .filter(|e| e.connects(dependent, dependency))
            .count()
    }

    /// 渲染为文本，每行一条边
    pub fn render(&self) -> String {
        self.edges
            .iter()
            .map(|e| format!("{:?}", e))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 导出为可序列化记录
    pub fn to_records(&self) -> Vec<EdgeRecord> {
        self.edges
            .iter()
            .map(|e| EdgeRecord {
                dependent: describe(&e.dependent),
                dependency: describe(&e.dependency),
            })
            .collect()
    }
}
