/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 启动检查模块
pub mod startup;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 路由组装
pub mod app;

/// OpenAPI 文档
pub mod openapi;

/// 优雅退出管理模块
pub mod shutdown;

/// 请求追踪 ID
pub mod request_id;

/// HTTP Client 复用工具
pub mod http;

#[cfg(test)]
pub(crate) mod test_support;

// 导出常用类型供外部使用
pub use app::build_app;
pub use config::AppConfig;
pub use error::{AppError, OgError};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;
