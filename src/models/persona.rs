//! 人设模型

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 人设必须包含的字段
pub const REQUIRED_TRAITS: &[&str] = &[
    "年龄",
    "性别",
    "职业",
    "教育背景",
    "兴趣爱好",
    "性格特点",
    "生活状态",
    "观点倾向",
    "写作风格",
];

/// 虚拟答题人设
///
/// 每次尝试生成一次，之后不可修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    traits: BTreeMap<String, String>,
}

impl Persona {
    /// 从字段映射构建，缺少或为空的必填字段作为错误返回
    pub fn from_traits(traits: BTreeMap<String, String>) -> Result<Self, Vec<String>> {
        let traits: BTreeMap<String, String> = traits
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();

        let missing: Vec<String> = REQUIRED_TRAITS
            .iter()
            .filter(|name| traits.get(**name).map_or(true, |v| v.is_empty()))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(Self { traits })
        } else {
            Err(missing)
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.traits.get(name).map(String::as_str)
    }

    pub fn traits(&self) -> &BTreeMap<String, String> {
        &self.traits
    }

    /// 渲染为提示词中的人设描述，必填字段在前
    pub fn describe(&self) -> String {
        let mut lines: Vec<String> = REQUIRED_TRAITS
            .iter()
            .filter_map(|name| self.traits.get(*name).map(|v| format!("{}：{}", name, v)))
            .collect();
        lines.extend(
            self.traits
                .iter()
                .filter(|(k, _)| !REQUIRED_TRAITS.contains(&k.as_str()))
                .map(|(k, v)| format!("{}：{}", k, v)),
        );
        lines.join("\n")
    }
}
