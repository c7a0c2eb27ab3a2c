// ABOUTME: Parameterized writing-template registry feeding the streaming coordinator
// ABOUTME: Built-in template set, placeholder rendering, and usage counting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Template Registry
//!
//! A keyed store of parameterized prompt templates. `{name}` placeholders in
//! a template's prompt body are substituted from caller parameters merged
//! over declared defaults (caller value wins when present). Substitution is
//! single-pass: no recursion, no escaping of literal braces.
//!
//! [`TemplateRegistry::generate`] renders a template, streams the call
//! through the coordinator, forwards each token to an optional callback, and
//! increments the template's usage counter exactly once per successful
//! generation.

use std::collections::HashMap;

use dashmap::DashMap;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::coordinator::GenerationEngine;
use crate::errors::{AppError, AppResult};
use crate::provider::ChatMessage;

/// System instruction sent with every template-driven generation
const WRITER_SYSTEM_PROMPT: &str =
    "你是一位经验丰富的网络小说作家，文笔流畅，擅长节奏把控与情绪渲染。按要求创作，直接输出正文，不要解释。";

/// One declared parameter of a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateParam {
    /// Placeholder name as it appears inside `{}` in the prompt
    pub name: String,
    /// What the parameter controls
    pub description: String,
    /// Value used when the caller supplies none
    pub default: Option<String>,
    /// Whether a caller value (or default) must be present
    pub required: bool,
}

impl TemplateParam {
    fn new(name: &str, description: &str, default: Option<&str>, required: bool) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            default: default.map(str::to_owned),
            required,
        }
    }
}

/// A parameterized writing prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingTemplate {
    /// Stable identifier used for lookup
    pub id: String,
    /// Display name
    pub name: String,
    /// Grouping category (e.g. "chapter", "planning")
    pub category: String,
    /// Target genre key, matching [`crate::quality::genre_keywords`]
    pub genre: String,
    /// Prompt body with `{name}` placeholders
    pub prompt: String,
    /// Declared parameters, in display order
    pub params: Vec<TemplateParam>,
    /// Example of a good output
    pub example: String,
    /// Search tags
    pub tags: Vec<String>,
    /// Successful generations using this template
    pub usage_count: u64,
}

/// Keyed store of writing templates
pub struct TemplateRegistry {
    templates: DashMap<String, WritingTemplate>,
}

impl TemplateRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Create a registry seeded with the built-in template set
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for template in builtin_templates() {
            registry.register(template);
        }
        registry
    }

    /// Insert or replace a template
    pub fn register(&self, template: WritingTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Look up a template by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<WritingTemplate> {
        self.templates.get(id).map(|t| t.clone())
    }

    /// All templates, in arbitrary order
    #[must_use]
    pub fn list(&self) -> Vec<WritingTemplate> {
        self.templates.iter().map(|t| t.clone()).collect()
    }

    /// Render a template's prompt with merged parameters
    ///
    /// Caller values win over declared defaults when present. Placeholders
    /// without a value are left as-is.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` for an unknown id, or `InvalidInput` when
    /// a required parameter has neither a caller value nor a default.
    pub fn render(&self, id: &str, params: &HashMap<String, String>) -> AppResult<String> {
        let template = self
            .get(id)
            .ok_or_else(|| AppError::template_not_found(id))?;

        let mut rendered = template.prompt.clone();
        for declared in &template.params {
            let value = params
                .get(&declared.name)
                .map(String::as_str)
                .or(declared.default.as_deref());

            match value {
                Some(v) => {
                    rendered = rendered.replace(&format!("{{{}}}", declared.name), v);
                }
                None if declared.required => {
                    return Err(AppError::invalid_input(format!(
                        "template '{id}' requires parameter '{}'",
                        declared.name
                    )));
                }
                None => {}
            }
        }

        debug!(template = id, chars = rendered.chars().count(), "template rendered");
        Ok(rendered)
    }

    /// Generate text from a template through the streaming coordinator
    ///
    /// Fails before any network call for an unknown id or missing required
    /// parameter. On success the template's usage counter is incremented
    /// exactly once; failures leave it untouched.
    ///
    /// # Errors
    ///
    /// Returns template, provider, or stream errors.
    pub async fn generate(
        &self,
        engine: &GenerationEngine,
        id: &str,
        params: &HashMap<String, String>,
        config: &GenerationConfig,
        mut on_token: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> AppResult<String> {
        let rendered = self.render(id, params)?;

        let messages = vec![
            ChatMessage::system(WRITER_SYSTEM_PROMPT),
            ChatMessage::user(rendered),
        ];

        let (mut stream, _metrics) = engine.stream_generate(messages, config).await?;

        let mut text = String::new();
        while let Some(token) = stream.next().await {
            let token = token?;
            if let Some(callback) = on_token.as_mut() {
                callback(&token);
            }
            text.push_str(&token);
        }

        self.record_usage(id);
        info!(template = id, chars = text.chars().count(), "template generation complete");
        Ok(text)
    }

    /// Usage counter for a template, if it exists
    #[must_use]
    pub fn usage_count(&self, id: &str) -> Option<u64> {
        self.templates.get(id).map(|t| t.usage_count)
    }

    fn record_usage(&self, id: &str) {
        if let Some(mut template) = self.templates.get_mut(id) {
            template.usage_count += 1;
        }
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// The fixed built-in template set created at process start
fn builtin_templates() -> Vec<WritingTemplate> {
    vec![
        WritingTemplate {
            id: "chapter-continue".to_owned(),
            name: "章节续写".to_owned(),
            category: "chapter".to_owned(),
            genre: "urban".to_owned(),
            prompt: "以下是小说《{title}》的最新内容：\n\n{context}\n\n请续写约{length}字，保持人物性格与叙事节奏一致。".to_owned(),
            params: vec![
                TemplateParam::new("title", "作品标题", None, true),
                TemplateParam::new("context", "最近的正文片段", None, true),
                TemplateParam::new("length", "目标字数", Some("1000"), false),
            ],
            example: "夜色渐深，写字楼的灯一盏盏熄灭……".to_owned(),
            tags: vec!["续写".to_owned(), "正文".to_owned()],
            usage_count: 0,
        },
        WritingTemplate {
            id: "chapter-opening".to_owned(),
            name: "开篇冷启动".to_owned(),
            category: "chapter".to_owned(),
            genre: "fantasy".to_owned(),
            prompt: "为一部{genre}题材的小说写一个抓人的开篇，主角是{protagonist}，核心冲突是{conflict}。约{length}字。".to_owned(),
            params: vec![
                TemplateParam::new("genre", "题材", Some("玄幻"), false),
                TemplateParam::new("protagonist", "主角设定", None, true),
                TemplateParam::new("conflict", "核心冲突", None, true),
                TemplateParam::new("length", "目标字数", Some("800"), false),
            ],
            example: "那一夜，宗门上空的灵气忽然断了……".to_owned(),
            tags: vec!["开篇".to_owned()],
            usage_count: 0,
        },
        WritingTemplate {
            id: "outline-arc".to_owned(),
            name: "剧情大纲".to_owned(),
            category: "planning".to_owned(),
            genre: "mystery".to_owned(),
            prompt: "基于以下设定生成一条包含{points}个关键节点的剧情大纲：\n\n{premise}".to_owned(),
            params: vec![
                TemplateParam::new("premise", "故事设定", None, true),
                TemplateParam::new("points", "节点数量", Some("8"), false),
            ],
            example: "1. 深夜来电；2. 现场的第二枚钥匙……".to_owned(),
            tags: vec!["大纲".to_owned(), "规划".to_owned()],
            usage_count: 0,
        },
        WritingTemplate {
            id: "dialogue-polish".to_owned(),
            name: "对话润色".to_owned(),
            category: "revision".to_owned(),
            genre: "romance".to_owned(),
            prompt: "润色以下对话，使人物语气更鲜明、信息密度更高，保留原意：\n\n{dialogue}".to_owned(),
            params: vec![TemplateParam::new("dialogue", "待润色对话", None, true)],
            example: "\u{201c}你迟到了四十分钟。\u{201d}她没有抬头。".to_owned(),
            tags: vec!["润色".to_owned(), "对话".to_owned()],
            usage_count: 0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_present() {
        let registry = TemplateRegistry::with_builtins();
        assert!(registry.get("chapter-continue").is_some());
        assert_eq!(registry.usage_count("chapter-continue"), Some(0));
        assert!(registry.list().len() >= 4);
    }

    #[test]
    fn test_render_merges_defaults_and_caller_params() {
        let registry = TemplateRegistry::with_builtins();
        let mut params = HashMap::new();
        params.insert("title".to_owned(), "都市之光".to_owned());
        params.insert("context".to_owned(), "他走出地铁站。".to_owned());

        let rendered = registry.render("chapter-continue", &params).unwrap();
        assert!(rendered.contains("都市之光"));
        assert!(rendered.contains("他走出地铁站。"));
        // Default applied for the unspecified length
        assert!(rendered.contains("1000"));
        assert!(!rendered.contains("{title}"));
    }

    #[test]
    fn test_render_caller_value_wins_over_default() {
        let registry = TemplateRegistry::with_builtins();
        let mut params = HashMap::new();
        params.insert("title".to_owned(), "t".to_owned());
        params.insert("context".to_owned(), "c".to_owned());
        params.insert("length".to_owned(), "2500".to_owned());

        let rendered = registry.render("chapter-continue", &params).unwrap();
        assert!(rendered.contains("2500"));
        assert!(!rendered.contains("1000"));
    }

    #[test]
    fn test_render_missing_required_param() {
        let registry = TemplateRegistry::with_builtins();
        let err = registry
            .render("chapter-continue", &HashMap::new())
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_render_unknown_template() {
        let registry = TemplateRegistry::with_builtins();
        let err = registry.render("no-such-template", &HashMap::new()).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::TemplateNotFound);
    }
}
