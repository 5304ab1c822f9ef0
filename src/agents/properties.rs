//! Agent 参数表：名称 -> 数值
//!
//! 每种 agent 声明一组有序的参数及默认值；顺序决定脚本序列化时的字段顺序。

/// 有序的数值参数表
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    entries: Vec<(&'static str, f32)>,
}

impl Properties {
    /// 以默认值创建参数表
    pub fn from_defaults(defaults: &[(&'static str, f32)]) -> Self {
        Self {
            entries: defaults.to_vec(),
        }
    }

    /// 参数名称，按声明顺序
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// 修改已知参数；未知名称返回 false，参数表不变
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 读取参数，缺失时用 default
    pub fn value_or(&self, name: &str, default: f32) -> f32 {
        self.get(name).unwrap_or(default)
    }

    /// 作为非负整数读取（向下取整）
    pub fn count_or(&self, name: &str, default: usize) -> usize {
        self.get(name)
            .map(|v| if v.is_finite() { v.max(0.0) as usize } else { default })
            .unwrap_or(default)
    }

    /// 作为整数预算读取（生命值、顶点数等）
    pub fn budget_or(&self, name: &str, default: i32) -> i32 {
        self.get(name)
            .map(|v| if v.is_finite() { v as i32 } else { default })
            .unwrap_or(default)
    }

    /// 作为开关读取，非零即为真
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).map(|v| v != 0.0).unwrap_or(false)
    }
}
