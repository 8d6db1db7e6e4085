//! 调用计数与耗时直方图，由本地 Prometheus recorder 聚合并输出文本格式（0.0.4）。
//!
//! recorder 不安装为全局 recorder，只在 `observe` 时通过
//! `metrics::with_local_recorder` 临时生效。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_histogram, histogram, with_local_recorder};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use super::MetricsSink;
use super::models::{Observation, Outcome};

/// 调用计数指标名
pub const CALLS_TOTAL: &str = "function_calls_total";
/// 耗时直方图指标名
pub const CALLS_DURATION: &str = "function_calls_duration_seconds";

/// 耗时直方图桶上界（秒）
pub const DURATION_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// 指标注册表：本地 recorder + 渲染句柄 + “有新数据”标记
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    dirty: AtomicBool,
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(CALLS_DURATION.to_string()), &DURATION_BUCKETS)
            .unwrap_or_else(|e| {
                tracing::warn!("直方图桶配置无效，使用默认 summary: {}", e);
                PrometheusBuilder::new()
            });
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!(CALLS_TOTAL, "Autometrics counter for tracking function calls");
            describe_histogram!(
                CALLS_DURATION,
                "Autometrics histogram for tracking function call duration"
            );
        });

        Self {
            recorder,
            handle,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn observe(&self, obs: &Observation) {
        with_local_recorder(&self.recorder, || {
            counter!(
                CALLS_TOTAL,
                "function" => obs.function,
                "module" => obs.module,
                "result" => obs.outcome.as_label()
            )
            .increment(1);
            histogram!(
                CALLS_DURATION,
                "function" => obs.function,
                "module" => obs.module
            )
            .record(obs.duration.as_secs_f64());
        });

        self.dirty.store(true, Ordering::Release);
    }

    /// 指定函数某一结果的累计调用次数（从当前快照读取）
    pub fn calls(&self, function: &str, module: &str, outcome: Outcome) -> u64 {
        let wanted = [
            format!("function=\"{function}\""),
            format!("module=\"{module}\""),
            format!("result=\"{}\"", outcome.as_label()),
        ];
        counter_lines(&self.render_exposition())
            .filter(|(labels, _)| wanted.iter().all(|w| labels.contains(w.as_str())))
            .map(|(_, v)| v)
            .sum()
    }

    /// 全部函数的调用总数
    pub fn total_calls(&self) -> u64 {
        counter_lines(&self.render_exposition()).map(|(_, v)| v).sum()
    }

    /// 取出并清除“有新数据”标记
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// 推送失败后恢复标记，下次推送时重试
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// 以 Prometheus 文本格式输出当前快照
    pub fn render_exposition(&self) -> String {
        self.handle.render()
    }
}

impl MetricsSink for MetricsRegistry {
    fn record(&self, obs: Observation) {
        self.observe(&obs);
    }
}

/// `function_calls_total{labels} value` 行，拆成 `(labels, value)`
fn counter_lines(text: &str) -> impl Iterator<Item = (&str, u64)> {
    text.lines().filter_map(|line| {
        let rest = line.strip_prefix(CALLS_TOTAL)?.strip_prefix('{')?;
        let (labels, value) = rest.rsplit_once("} ")?;
        Some((labels, value.trim().parse::<f64>().ok()? as u64))
    })
}
