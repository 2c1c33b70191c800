//! 命令行应用 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：读取配置、准备存储和通知出口
//! 2. **出题**：从上游内容文件（或空内容）生成一份试卷
//! 3. **输出**：打印试卷 JSON 和一行摘要
//!
//! 交互式答题属于界面部分，不在命令行里实现。

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ExamGenerator, PayloadFileGenerator, StaticGenerator};
use crate::config::Config;
use crate::infrastructure::{Clock, JsonFileStore, SystemClock};
use crate::models::{Exam, ExamRequest};
use crate::services::{FanoutNotifier, FileNotifier, NotificationSink, TracingNotifier};
use crate::utils::logging::log_startup;
use crate::workflow::ExamFlow;

pub const USAGE: &str = "用法: exam-coach <subject> <topic> [payload-file]";

/// 命令行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub subject: String,
    pub topic: String,
    pub payload: Option<PathBuf>,
}

impl CliArgs {
    /// 解析参数（不含程序名）
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let (Some(subject), Some(topic)) = (args.next(), args.next()) else {
            bail!("{}", USAGE);
        };
        let payload = args.next().map(PathBuf::from);
        if args.next().is_some() {
            bail!("参数过多\n{}", USAGE);
        }
        Ok(Self {
            subject,
            topic,
            payload,
        })
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<JsonFileStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config.user_id, &config.data_dir);

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("无法创建数据目录: {}", config.data_dir))?;

        let notifier = FanoutNotifier::new()
            .with(TracingNotifier)
            .with(FileNotifier::with_path(config.notification_log_file.clone()));

        Ok(Self {
            store: Arc::new(JsonFileStore::new(&config.data_dir)),
            notifier: Arc::new(notifier),
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self, args: &CliArgs) -> Result<Arc<Exam>> {
        let generator: Arc<dyn ExamGenerator> = match &args.payload {
            Some(path) => Arc::new(PayloadFileGenerator::new(path)),
            None => {
                info!("未提供上游内容文件，将使用兜底题库");
                Arc::new(StaticGenerator::with_result(Value::Null))
            }
        };

        let flow = ExamFlow::new(
            &self.config,
            generator,
            self.store.clone(),
            Arc::clone(&self.notifier),
            Arc::clone(&self.clock),
        );

        let request = ExamRequest::from_config(&self.config, args.subject.as_str(), args.topic.as_str());
        let generated = flow.generate(&request).await?;

        if let Some(mismatch) = generated.count_mismatch {
            warn!("⚠️ {}", mismatch);
        }
        if let Err(e) = generated.persisted.await {
            warn!("⚠️ 试卷保存任务异常退出: {}", e);
        }

        let exam = generated.exam;
        println!("{}", serde_json::to_string_pretty(exam.as_ref())?);
        println!(
            "{} | {} / {} | {} questions | {} minutes | {}",
            exam.id,
            exam.subject,
            exam.topic,
            exam.question_count(),
            exam.time_limit_minutes,
            generated.strategy
        );

        Ok(exam)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = CliArgs::parse(args(&["Biology", "Cells", "payload.json"])).unwrap();
        assert_eq!(parsed.subject, "Biology");
        assert_eq!(parsed.payload, Some(PathBuf::from("payload.json")));

        let no_payload = CliArgs::parse(args(&["Biology", "Cells"])).unwrap();
        assert!(no_payload.payload.is_none());

        assert!(CliArgs::parse(args(&["Biology"])).is_err());
        assert!(CliArgs::parse(args(&["a", "b", "c", "d"])).is_err());
    }

    #[tokio::test]
    async fn test_run_without_payload_uses_fallback_and_persists() {
        let dir = std::env::temp_dir().join(format!("exam_coach_app_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = Config {
            data_dir: dir.to_string_lossy().to_string(),
            notification_log_file: dir.join("notifications.txt").to_string_lossy().to_string(),
            default_question_count: 4,
            ..Config::default()
        };

        let app = App::initialize(config).await.unwrap();
        let exam = app
            .run(&CliArgs::parse(args(&["Physics", "Motion"])).unwrap())
            .await
            .unwrap();

        assert_eq!(exam.question_count(), 4);
        let stored = std::fs::read_to_string(dir.join("exams_demo-user.json")).unwrap();
        assert!(stored.contains(&exam.id));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
