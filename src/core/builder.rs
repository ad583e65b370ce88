//! 编排器构建器：统一的初始化逻辑
//!
//! HTTP、WebSocket 与测试共用同一套组件装配；各组件可替换（分类器、内容生产者、缓存、工具）。

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, MemoryCache};
use crate::config::AppConfig;
use crate::core::Orchestrator;
use crate::dialogue::{
    ContentGenerator, ContentProducer, KeywordClassifier, MessageClassifier, TaskEngine,
    TemplateContentProducer,
};
use crate::session::SessionStore;
use crate::tools::{
    CalculatorTool, CodeHelperTool, DictionaryTool, ImageTool, Tool, ToolExecutor, ToolRegistry,
    TranslatorTool, WeatherTool,
};

/// 编排器构建器
pub struct OrchestratorBuilder {
    config: AppConfig,
    classifier: Arc<dyn MessageClassifier>,
    producer: Arc<dyn ContentProducer>,
    cache: Option<Arc<dyn Cache>>,
    extra_tools: Vec<Arc<dyn Tool>>,
    default_tools: bool,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            classifier: Arc::new(KeywordClassifier::new()),
            producer: Arc::new(TemplateContentProducer),
            cache: None,
            extra_tools: Vec::new(),
            default_tools: true,
        }
    }

    /// 替换消息分类策略
    pub fn with_classifier(mut self, classifier: Arc<dyn MessageClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// 替换内容生产者（如接入大模型）
    pub fn with_content_producer(mut self, producer: Arc<dyn ContentProducer>) -> Self {
        self.producer = producer;
        self
    }

    /// 共享缓存；不设置时使用独立的 MemoryCache，过期条目由 Orchestrator::purge_cache 清理
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 追加工具；与内置工具同名时覆盖内置工具
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.extra_tools.push(Arc::new(tool));
        self
    }

    pub fn without_default_tools(mut self) -> Self {
        self.default_tools = false;
        self
    }

    /// 构建工具注册表（所有接入方式共享同一套工具）
    pub fn build_tool_registry(&self) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        let cfg = &self.config.tools;

        if self.default_tools {
            tools.register(CalculatorTool);
            tools.register(TranslatorTool);
            tools.register(DictionaryTool::new(cfg.dictionary_url.clone()));
            tools.register(WeatherTool::new(
                cfg.weather_geocoding_url.clone(),
                cfg.weather_forecast_url.clone(),
            ));
            tools.register(ImageTool::new(cfg.image_url.clone()));
            tools.register(CodeHelperTool);
        }

        for tool in &self.extra_tools {
            tools.register_arc(Arc::clone(tool));
        }

        tools
    }

    pub fn build(self) -> Orchestrator {
        let cache: Arc<dyn Cache> = match &self.cache {
            Some(cache) => Arc::clone(cache),
            None => Arc::new(MemoryCache::new()),
        };
        let registry = self.build_tool_registry();
        tracing::info!(tools = ?registry.tool_names(), "tool registry ready");

        let cfg = &self.config;
        let sessions = Arc::new(SessionStore::new(
            cfg.sessions.capacity,
            cfg.sessions.eviction_policy(),
        ));
        let tasks = TaskEngine::new(
            Arc::clone(&cache),
            Duration::from_secs(cfg.cache.steps_ttl_secs),
            cfg.dialogue.auto_advance,
        );
        let tools = ToolExecutor::new(
            registry,
            Arc::clone(&cache),
            Duration::from_secs(cfg.cache.tool_ttl_secs),
        );

        Orchestrator::new(
            self.classifier,
            tasks,
            ContentGenerator::new(self.producer),
            tools,
            sessions,
            cache,
            cfg.sessions.max_history,
        )
    }
}
