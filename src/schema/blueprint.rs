//! 人设蓝图：RoleMapper 产出的粗粒度规划（角色 + 描述），Crafter 逐个消费

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub role: String,
    pub description: String,
}

impl Blueprint {
    pub fn new(role: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            description: description.into(),
        }
    }
}
