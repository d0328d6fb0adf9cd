use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 延迟动作类型
///
/// 平台上所有需要登录才能执行的动作。存储时序列化为 snake_case 标签，
/// 与持久化槽位的 JSON 格式保持稳定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// 申请实习
    ApplyInternship,
    /// 报名活动
    RegisterEvent,
    /// 报名工作坊
    RegisterWorkshop,
    /// 报名黑客松
    RegisterHackathon,
    /// 申请导师辅导
    ApplyMentorship,
    /// 申请就业支持
    ApplyPlacementSupport,
    /// 申请科研项目
    ApplyResearch,
}

impl IntentKind {
    /// 获取动作标签（与序列化格式一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::ApplyInternship => "apply_internship",
            IntentKind::RegisterEvent => "register_event",
            IntentKind::RegisterWorkshop => "register_workshop",
            IntentKind::RegisterHackathon => "register_hackathon",
            IntentKind::ApplyMentorship => "apply_mentorship",
            IntentKind::ApplyPlacementSupport => "apply_placement_support",
            IntentKind::ApplyResearch => "apply_research",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 待执行的用户意图
///
/// 未登录用户发起受保护动作时暂存的记录：动作类型加调用方提供的
/// 任意负载（对协调器来说是不透明的 JSON）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingIntent {
    /// 动作类型
    pub kind: IntentKind,
    /// 调用方负载（例如目标实习/活动的记录 ID）
    pub payload: serde_json::Value,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl PendingIntent {
    /// 创建新的待执行意图
    pub fn new(kind: IntentKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            created_at: Utc::now(),
        }
    }
}
