// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};

use inpage_translator::parsers::html::dom::{find_nodes, get_body, html_to_dom, text_leaves};
use inpage_translator::parsers::html::serializer::inner_html;
use inpage_translator::translation::{
    MemorySettingsStore, SettingsStore, TranslateRequest, TranslationBackend, TranslationConfig,
    TranslationError, TranslationResult, TranslationService,
};

/// 可编排的模拟翻译后端
///
/// 译文为 `[目标语言] 原文`；可指定包含某些片段的文本失败，
/// 可为每段文本设置延迟，并记录每次调用的开始与结束。
#[derive(Default)]
pub struct MockBackend {
    failures: Mutex<Vec<(String, TranslationError)>>,
    delays: Mutex<HashMap<String, Duration>>,
    events: Mutex<Vec<String>>,
    requests: Mutex<Vec<TranslateRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 文本包含 `needle` 时返回指定错误
    pub fn fail_on(&self, needle: &str, error: TranslationError) {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), error));
    }

    /// 文本包含 `needle` 时延迟返回
    pub fn delay_on(&self, needle: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(needle.to_string(), delay);
    }

    pub fn expected(text: &str) -> String {
        format!("[Chinese] {}", text)
    }

    /// 按调用顺序记录的请求文本
    pub fn requested_texts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<TranslateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `start:<text>` / `end:<text>` 事件序列
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self, text: &str) -> Option<TranslationError> {
        self.failures
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, error)| error.clone())
    }

    fn scripted_delay(&self, text: &str) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, delay)| *delay)
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(&self, request: &TranslateRequest) -> TranslationResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{}", request.text));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.scripted_delay(&request.text) {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(format!("end:{}", request.text));

        match self.scripted_failure(&request.text) {
            Some(error) => Err(error),
            None => Ok(format!("[{}] {}", request.target_language, request.text)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// HTML测试工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 创建测试用的DOM结构
    pub fn create_test_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    /// 按路径查找第一个元素
    pub fn first(root: &Handle, path: &[&str]) -> Handle {
        find_nodes(root, path)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("element {:?} not found", path))
    }

    pub fn text_leaves_of(root: &Handle) -> Vec<Handle> {
        text_leaves(root)
    }

    pub fn body_html(document: &Handle) -> String {
        inner_html(&get_body(document).expect("document has a body")).unwrap()
    }

    /// 三个段落组成的文章
    pub fn create_article_page() -> String {
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Test Page</title>
    <meta charset="UTF-8">
    <style>p { margin: 0 }</style>
</head>
<body>
    <h1>Welcome to Test</h1>
    <p>This is a test paragraph with some <strong>important</strong> text.</p>
    <div>
        <p>Read <a href="https://example.com/docs">the docs</a> first.</p>
    </div>
    <pre>cargo build --release</pre>
    <script>var greeting = "hello";</script>
    <p style="display: none">Hidden paragraph</p>
    <p>Last paragraph here.</p>
</body>
</html>"#
            .to_string()
    }
}

/// 使用内存设置和模拟后端创建服务
pub fn service_for(html: &str, backend: Arc<MockBackend>) -> TranslationService {
    let settings: Arc<dyn SettingsStore> =
        Arc::new(MemorySettingsStore::new(TranslationConfig::default()));
    TranslationService::from_html(html.as_bytes(), "utf-8", backend, settings).unwrap()
}
