/// 健康检查
pub mod health;
/// 调用指标采集与推送
pub mod metrics;
/// 社交预览图生成
pub mod og;
/// 预览图地址与 head 标签
pub mod seo;
