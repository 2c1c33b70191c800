//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{Exam, ExamResult};

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，`verbose` 时为 debug。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `user_id`: 当前用户
/// - `data_dir`: 数据目录
pub fn log_startup(user_id: &str, data_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考试教练");
    info!("👤 用户: {}", user_id);
    info!("💾 数据目录: {}", data_dir);
    info!("{}", "=".repeat(60));
}

/// 记录试卷生成信息
pub fn log_exam_created(exam: &Exam) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 试卷已生成: {}", exam.id);
    info!("📚 {} / {} ({})", exam.subject, exam.topic, exam.difficulty);
    info!(
        "📄 题目数: {} (请求 {}) | ⏱ {} 分钟",
        exam.question_count(),
        exam.requested_question_count,
        exam.time_limit_minutes
    );
    info!("{}", "─".repeat(60));
}

/// 打印考试结果
pub fn log_result(result: &ExamResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 考试结果: {}", result.exam_id);
    info!(
        "完成时间: {}",
        result.completed_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 正确: {}/{}", result.correct_count, result.total_questions);
    info!("🎯 得分: {}%", result.score);
    info!("⏱ 用时: {} 分钟", result.time_taken_minutes);
    info!("💬 {}", result.feedback);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
