//! Action 模板提供者
//!
//! 处理器通过 [`ActionProvider`] 按名称和版本查找模板。
//! [`ActionRegistry`] 是内存实现：在启动时注册模板，之后只读。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use super::template::ActionTemplate;

/// Action 模板提供者
pub trait ActionProvider: Send + Sync {
    /// Action 的全部版本（升序），未注册时返回 `None`
    fn versions(&self, action: &str) -> Option<Vec<u32>>;

    /// 按名称和版本获取模板
    fn get(&self, action: &str, version: u32) -> Option<Arc<ActionTemplate>>;

    /// 最新版本
    fn latest_version(&self, action: &str) -> Option<u32> {
        self.versions(action).and_then(|versions| versions.last().copied())
    }
}

/// 内存 Action 注册表
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, BTreeMap<u32, Arc<ActionTemplate>>>,
}

impl ActionRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模板，返回被替换的同名同版本模板
    pub fn register(&mut self, template: ActionTemplate) -> Option<Arc<ActionTemplate>> {
        let name = template.name.clone();
        let version = template.version;
        let replaced = self
            .actions
            .entry(name.clone())
            .or_default()
            .insert(version, Arc::new(template));

        if replaced.is_some() {
            info!(action = %name, version = version, "Action template replaced");
        } else {
            debug!(action = %name, version = version, "Action template registered");
        }
        replaced
    }

    /// 注销指定版本，返回被移除的模板
    pub fn unregister(&mut self, action: &str, version: u32) -> Option<Arc<ActionTemplate>> {
        let versions = self.actions.get_mut(action)?;
        let removed = versions.remove(&version);
        if versions.is_empty() {
            self.actions.remove(action);
        }
        removed
    }

    /// 是否注册了该 Action 的任一版本
    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// 已注册的 Action 名（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    /// 已注册的 Action 数（不计版本）
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ActionProvider for ActionRegistry {
    fn versions(&self, action: &str) -> Option<Vec<u32>> {
        self.actions
            .get(action)
            .map(|versions| versions.keys().copied().collect())
    }

    fn get(&self, action: &str, version: u32) -> Option<Arc<ActionTemplate>> {
        self.actions
            .get(action)
            .and_then(|versions| versions.get(&version))
            .cloned()
    }
}
