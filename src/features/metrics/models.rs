use std::time::Duration;

/// 单次调用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Ok,
    Error,
}

impl Outcome {
    /// 按响应状态码判定：5xx 记为失败，其余记为成功
    pub fn from_status(status: u16) -> Self {
        if (500..600).contains(&status) {
            Outcome::Error
        } else {
            Outcome::Ok
        }
    }

    /// `result` 标签取值
    pub fn as_label(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Error => "error",
        }
    }
}

/// 一次被包装函数调用的观测
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub function: &'static str,
    pub module: &'static str,
    pub outcome: Outcome,
    pub status: u16,
    pub duration: Duration,
}
