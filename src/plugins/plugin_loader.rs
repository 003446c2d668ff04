// 插件加载器
// 根据配置项解析插件来源并创建插件实例

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::HarnessError;
use crate::plugins::assertions::AssertionStore;
use crate::plugins::plugin_interface::{Plugin, PluginConfigEntry};
use crate::plugins::plugin_registry::PluginInstance;

/// 路径解析接口
/// 根据路径模式和基准目录返回零个或多个匹配的路径
pub trait PathResolver: Send + Sync {
    fn resolve(&self, pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>, HarnessError>;
}

/// 插件工厂接口
/// 每个已注册的插件模块恰好提供一个插件实例
pub trait PluginFactory: Send + Sync {
    fn create_plugin(&self, config: &PluginConfigEntry) -> Result<Arc<dyn Plugin>, HarnessError>;
}

impl<F> PluginFactory for F
where
    F: Fn(&PluginConfigEntry) -> Result<Arc<dyn Plugin>, HarnessError> + Send + Sync,
{
    fn create_plugin(&self, config: &PluginConfigEntry) -> Result<Arc<dyn Plugin>, HarnessError> {
        self(config)
    }
}

/// 基于文件系统的路径解析器
///
/// 只支持 glob 语法的子集：单个路径段内的 `*` 和 `?`。不支持 `**` 跨目录匹配和 `[..]` 字符类。
/// 以 `.` 开头的文件只有在模式段本身以 `.` 开头时才会匹配。
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPathResolver;

impl FsPathResolver {
    fn is_pattern(segment: &str) -> bool {
        segment.contains('*') || segment.contains('?')
    }

    /// 将单个路径段的通配符转换为正则表达式
    fn segment_regex(segment: &str) -> Result<Regex, HarnessError> {
        let mut pattern = String::from("^");
        for ch in segment.chars() {
            match ch {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        pattern.push('$');
        Ok(Regex::new(&pattern)?)
    }

    fn expand(dir: &Path, matcher: &Regex, include_hidden: bool) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut matched: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                (include_hidden || !name.starts_with('.')) && matcher.is_match(&name)
            })
            .map(|entry| entry.path())
            .collect();
        matched.sort();
        matched
    }
}

impl PathResolver for FsPathResolver {
    fn resolve(&self, pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
        let pattern_path = Path::new(pattern);
        let root = if pattern_path.is_absolute() {
            PathBuf::new()
        } else {
            base_dir.to_path_buf()
        };

        let mut candidates = vec![root];
        for component in pattern_path.components() {
            match component {
                Component::Normal(segment) => {
                    let segment = segment.to_string_lossy();
                    if Self::is_pattern(&segment) {
                        let matcher = Self::segment_regex(&segment)?;
                        let include_hidden = segment.starts_with('.');
                        candidates = candidates
                            .iter()
                            .flat_map(|dir| Self::expand(dir, &matcher, include_hidden))
                            .collect();
                    } else {
                        for candidate in candidates.iter_mut() {
                            candidate.push(segment.as_ref());
                        }
                    }
                }
                other => {
                    for candidate in candidates.iter_mut() {
                        candidate.push(other.as_os_str());
                    }
                }
            }
        }

        candidates.retain(|candidate| candidate.exists());
        candidates.dedup();
        Ok(candidates)
    }
}

/// 插件加载器
pub struct PluginLoader {
    /// path 插件的解析基准目录
    base_dir: PathBuf,
    /// 路径解析器
    resolver: Arc<dyn PathResolver>,
    /// 已注册的插件模块，键为包名、路径或文件名
    modules: HashMap<String, Arc<dyn PluginFactory>>,
}

impl PluginLoader {
    /// 创建新的插件加载器
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            resolver: Arc::new(FsPathResolver),
            modules: HashMap::new(),
        }
    }

    /// 替换路径解析器
    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// 注册插件模块
    pub fn register_module(mut self, key: impl Into<String>, factory: impl PluginFactory + 'static) -> Self {
        let key = key.into();
        debug!("注册插件模块: {}", key);
        self.modules.insert(key, Arc::new(factory));
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 按配置顺序加载全部插件
    ///
    /// 任一配置项无法解析时返回 `Configuration` 错误，不会部分加载。
    pub fn load(
        &self,
        entries: &[PluginConfigEntry],
        store: Arc<AssertionStore>,
    ) -> Result<Vec<PluginInstance>, HarnessError> {
        info!("加载 {} 个插件", entries.len());

        let mut instances = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let plugin = self.resolve_entry(entry)?;
            let instance = PluginInstance::annotate(plugin, Arc::new(entry.clone()), index, store.clone());
            info!("插件加载成功: {} ({})", instance.name(), entry.describe());
            instances.push(instance);
        }

        Ok(instances)
    }

    /// 解析单个配置项
    pub fn resolve_entry(&self, entry: &PluginConfigEntry) -> Result<Arc<dyn Plugin>, HarnessError> {
        if let Some(plugin) = &entry.inline {
            return Ok(plugin.clone());
        }

        if let Some(path) = entry.path.as_deref().filter(|p| !p.is_empty()) {
            let resolved = self.resolve_path(path)?;
            return self.instantiate(entry, &Self::path_keys(path, &resolved));
        }

        if let Some(package) = entry.package.as_deref().filter(|p| !p.is_empty()) {
            return self.instantiate(entry, &[package.to_string()]);
        }

        Err(HarnessError::configuration(
            "Plugin configuration did not contain a valid path or inline definition.",
        ))
    }

    /// 解析 path 配置，取第一个匹配
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, HarnessError> {
        let matches = self.resolver.resolve(path, &self.base_dir)?;
        if matches.len() > 1 {
            warn!("插件路径 {} 匹配到 {} 个文件，使用第一个", path, matches.len());
        }

        matches
            .into_iter()
            .next()
            .ok_or_else(|| HarnessError::configuration(format!("Invalid path to plugin: {}", path)))
    }

    /// 是否能为配置项找到插件来源，不创建实例
    pub fn can_resolve(&self, entry: &PluginConfigEntry) -> Result<(), HarnessError> {
        if entry.inline.is_some() {
            return Ok(());
        }
        if let Some(path) = entry.path.as_deref().filter(|p| !p.is_empty()) {
            return self.resolve_path(path).map(|_| ());
        }
        if let Some(package) = entry.package.as_deref().filter(|p| !p.is_empty()) {
            return match self.modules.contains_key(package) {
                true => Ok(()),
                false => Err(HarnessError::configuration(format!("Cannot find plugin package: {}", package))),
            };
        }
        Err(HarnessError::configuration(
            "Plugin configuration did not contain a valid path or inline definition.",
        ))
    }

    fn path_keys(path: &str, resolved: &Path) -> Vec<String> {
        let mut keys = vec![resolved.to_string_lossy().into_owned(), path.to_string()];
        if let Some(stem) = resolved.file_stem() {
            keys.push(stem.to_string_lossy().into_owned());
        }
        keys
    }

    fn instantiate(&self, entry: &PluginConfigEntry, keys: &[String]) -> Result<Arc<dyn Plugin>, HarnessError> {
        let (key, factory) = keys
            .iter()
            .find_map(|key| self.modules.get(key).map(|factory| (key, factory)))
            .ok_or_else(|| {
                HarnessError::configuration(format!("Cannot find plugin module: {}", keys.join(", ")))
            })?;

        debug!("实例化插件模块: {}", key);
        factory.create_plugin(entry).map_err(|e| match e {
            HarnessError::Configuration { .. } => e,
            other => HarnessError::configuration(format!("插件模块 {} 实例化失败: {}", key, other)),
        })
    }
}
