//! Canned assistant replies.
//!
//! Replies are picked by keyword from an ordered rule list, first match wins,
//! after a fixed simulated latency. No network call is made.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{ChatMessage, ChatRole, Statistics};

pub const SYSTEM_PREFACE: &str =
    "你是城市问题分析专家，提供专业、简洁的处置建议，回复控制在200字以内";
pub const APOLOGY: &str = "抱歉，AI服务暂时不可用，请稍后重试";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub role: TranscriptRole,
    pub content: String,
}

/// Live figures available to reply templates.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub statistics: Statistics,
    pub today: NaiveDate,
}

pub trait ReplySource: Send + Sync {
    fn reply(&self, transcript: &[TranscriptTurn], context: &ReplyContext)
        -> Result<String, StoreError>;
}

struct ResponseRule {
    keyword: &'static str,
    render: fn(&ReplyContext) -> String,
}

pub struct CannedReplies {
    rules: Vec<ResponseRule>,
    fallback: fn(&ReplyContext) -> String,
}

impl Default for CannedReplies {
    fn default() -> Self {
        Self {
            rules: vec![
                ResponseRule {
                    keyword: "分析",
                    render: analysis_reply,
                },
                ResponseRule {
                    keyword: "日报",
                    render: daily_brief_reply,
                },
                ResponseRule {
                    keyword: "建议",
                    render: suggestion_reply,
                },
            ],
            fallback: default_reply,
        }
    }
}

impl CannedReplies {
    pub fn select(&self, content: &str, context: &ReplyContext) -> String {
        let render = self
            .rules
            .iter()
            .find(|rule| content.contains(rule.keyword))
            .map(|rule| rule.render)
            .unwrap_or(self.fallback);
        render(context)
    }
}

impl ReplySource for CannedReplies {
    fn reply(
        &self,
        transcript: &[TranscriptTurn],
        context: &ReplyContext,
    ) -> Result<String, StoreError> {
        let content = transcript
            .last()
            .filter(|turn| turn.role != TranscriptRole::System)
            .map(|turn| turn.content.as_str())
            .unwrap_or("");
        Ok(self.select(content, context))
    }
}

pub fn analysis_reply(_: &ReplyContext) -> String {
    "基于数据分析，核心问题集中在朝阳区（占比35%），主要类型为交通拥堵（40%）和设备故障（30%）。\
     高优先级问题平均响应时长15分钟，建议：1. 优化朝阳区巡检路线；2. 增加交通疏导人员；3. 定期维护传感器设备。"
        .to_string()
}

pub fn daily_brief_reply(context: &ReplyContext) -> String {
    format!(
        "**城市运行处置日报（{}）**\n\
         1. 总体概况：今日共处理问题{}起，完成率78%；\n\
         2. 重点问题：高优先级问题{}起，主要分布在海淀区；\n\
         3. 改进建议：缩短高优先级问题响应时长，优化跨部门协同流程；\n\
         4. 明日计划：重点关注丰台区设备故障问题，完成10台设备检修。",
        context.today.format("%Y-%m-%d"),
        context.statistics.today_problems,
        context.statistics.high_priority
    )
}

pub fn suggestion_reply(_: &ReplyContext) -> String {
    "针对该问题的处置建议：1. 立即派遣巡检人员到现场核实情况；2. 协调相关部门制定临时处置方案；\
     3. 建立问题跟踪机制，避免重复发生；4. 分析根本原因，制定长效解决方案。"
        .to_string()
}

pub fn default_reply(context: &ReplyContext) -> String {
    format!(
        "已收到您的问题，基于当前数据分析：\n\
         - 问题总数：{}起\n\
         - 今日新增：{}起\n\
         - 高优先级：{}起\n\
         建议优先处理高优先级问题，优化资源配置提升处置效率。",
        context.statistics.total_problems,
        context.statistics.today_problems,
        context.statistics.high_priority
    )
}

#[derive(Clone)]
pub struct Assistant {
    source: Arc<dyn ReplySource>,
    latency: Duration,
}

impl Assistant {
    pub fn new(source: Arc<dyn ReplySource>, latency: Duration) -> Self {
        Self { source, latency }
    }

    pub fn canned(latency: Duration) -> Self {
        Self::new(Arc::new(CannedReplies::default()), latency)
    }

    /// System preface, then prior chat turns, then `prompt` when it is non-empty.
    pub fn build_transcript(history: &[ChatMessage], prompt: Option<&str>) -> Vec<TranscriptTurn> {
        let mut transcript = Vec::with_capacity(history.len() + 2);
        transcript.push(TranscriptTurn {
            role: TranscriptRole::System,
            content: SYSTEM_PREFACE.to_string(),
        });
        transcript.extend(history.iter().map(|message| TranscriptTurn {
            role: match message.role {
                ChatRole::User => TranscriptRole::User,
                ChatRole::Assistant => TranscriptRole::Assistant,
            },
            content: message.content.clone(),
        }));
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            transcript.push(TranscriptTurn {
                role: TranscriptRole::User,
                content: prompt.to_string(),
            });
        }
        transcript
    }

    /// Never fails; a source error becomes [`APOLOGY`].
    pub async fn suggest(
        &self,
        history: &[ChatMessage],
        prompt: Option<&str>,
        context: &ReplyContext,
    ) -> String {
        let transcript = Self::build_transcript(history, prompt);
        debug!(turns = transcript.len(), "requesting assistant reply");

        tokio::time::sleep(self.latency).await;

        match self.source.reply(&transcript, context) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "assistant reply failed");
                APOLOGY.to_string()
            }
        }
    }
}
