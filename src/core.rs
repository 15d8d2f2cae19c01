//! 页面处理核心
//!
//! 命令行使用的整页流程：读取输入、确定编码、解析文档、执行翻译命令、序列化输出。

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;
use tracing::{debug, info, warn};

use crate::messaging::{handle_message, Message, Response};
use crate::parsers::html::dom::{get_charset, html_to_dom};
use crate::translation::backend::TranslationBackend;
use crate::translation::config::SettingsStore;
use crate::translation::core::{PageReport, TranslationService};
use crate::translation::error::{TranslationError, TranslationResult};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

const DEFAULT_DOCUMENT_ENCODING: &str = "utf-8";

/// 页面处理选项
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    /// 输入文档的编码，未指定时读取文档声明
    pub encoding: Option<String>,
    pub silent: bool,
}

/// 页面处理器，负责协调整个页面处理流程
pub struct PageProcessor {
    options: PageOptions,
    backend: Arc<dyn TranslationBackend>,
    settings: Arc<dyn SettingsStore>,
}

impl PageProcessor {
    pub fn new(
        options: PageOptions,
        backend: Arc<dyn TranslationBackend>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            options,
            backend,
            settings,
        }
    }

    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// 解析页面并创建翻译服务，同时返回序列化时使用的编码
    pub fn load(&self, input_data: &[u8]) -> TranslationResult<(TranslationService, String)> {
        // 1. 验证配置
        EncodingValidator::new().validate_options(&self.options)?;

        // 2. 确定编码并解析
        let (dom, document_encoding) =
            EncodingProcessor::new().process_encoding(input_data, self.options.encoding.clone())?;

        let service = TranslationService::new(dom, self.backend.clone(), self.settings.clone());
        Ok((service, document_encoding))
    }

    /// 整页翻译并返回序列化后的文档
    pub async fn translate_page(
        &self,
        input_data: &[u8],
    ) -> TranslationResult<(Vec<u8>, PageReport)> {
        let (service, document_encoding) = self.load(input_data)?;

        let report = service.translate_whole_page().await?;
        if !report.sequence.is_complete_success() {
            warn!(
                "部分单元未翻译，成功率 {:.0}%",
                service.get_stats().snapshot().success_rate() * 100.0
            );
        }
        if !self.options.silent {
            print_info_message(&format!(
                "Translated {} of {} units ({} failed, {} skipped)",
                report.sequence.translated,
                report.sequence.total,
                report.sequence.failed,
                report.sequence.skipped
            ));
        }

        let output = service.serialize(&document_encoding)?;
        Ok((output, report))
    }

    /// 按顺序对同一文档执行多条宿主消息
    pub async fn apply_messages(
        &self,
        input_data: &[u8],
        messages: Vec<Message>,
    ) -> TranslationResult<(Vec<u8>, Vec<Response>)> {
        let (service, document_encoding) = self.load(input_data)?;

        let mut responses = Vec::with_capacity(messages.len());
        for message in messages {
            let action = message.action();
            let response = handle_message(&service, message).await;
            debug!("消息 {} 处理完成: success={}", action, response.success);
            responses.push(response);
        }
        info!("共处理 {} 条消息", responses.len());

        let output = service.serialize(&document_encoding)?;
        Ok((output, responses))
    }
}

/// 编码验证器
pub struct EncodingValidator;

impl EncodingValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_options(&self, options: &PageOptions) -> TranslationResult<()> {
        if let Some(encoding) = &options.encoding {
            if Encoding::for_label_no_replacement(encoding.as_bytes()).is_none() {
                return Err(TranslationError::ConfigError(format!(
                    "unknown encoding \"{}\"",
                    encoding
                )));
            }
        }
        Ok(())
    }
}

impl Default for EncodingValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 编码处理器
pub struct EncodingProcessor;

impl EncodingProcessor {
    pub fn new() -> Self {
        Self
    }

    /// 先按给定编码解析；未指定编码时，若文档声明了有效字符集则按其重新解析
    pub fn process_encoding(
        &self,
        input_data: &[u8],
        input_encoding: Option<String>,
    ) -> TranslationResult<(RcDom, String)> {
        if let Some(encoding) = input_encoding {
            let dom = html_to_dom(input_data, &encoding)?;
            return Ok((dom, encoding));
        }

        let mut document_encoding = DEFAULT_DOCUMENT_ENCODING.to_string();
        let mut dom = html_to_dom(input_data, &document_encoding)?;

        if let Some(html_charset) = get_charset(&dom.document) {
            if let Some(charset) = Encoding::for_label_no_replacement(html_charset.as_bytes()) {
                if charset.name() != "UTF-8" {
                    debug!("按文档声明的编码重新解析: {}", charset.name());
                    dom = html_to_dom(input_data, charset.name())?;
                }
                document_encoding = charset.name().to_string();
            }
        }

        Ok((dom, document_encoding))
    }
}

impl Default for EncodingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 读取输入文件，`-` 表示标准输入
pub fn read_input(target: &str) -> TranslationResult<Vec<u8>> {
    if target == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        return Ok(data);
    }

    fs::read(target).map_err(|e| {
        TranslationError::IoError(format!("could not read \"{}\": {}", target, e))
    })
}

/// 写入输出文件，未指定或为 `-` 时写到标准输出
pub fn write_output(path: Option<&Path>, data: &[u8]) -> TranslationResult<()> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::write(path, data).map_err(|e| {
                TranslationError::IoError(format!(
                    "could not write \"{}\": {}",
                    path.display(),
                    e
                ))
            })?;
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Prints an error message to stderr
pub fn print_error_message(msg: &str, no_color: bool) {
    if no_color {
        eprintln!("{msg}");
    } else {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    }
}

/// Prints an info message to stderr, keeping stdout for document output
pub fn print_info_message(msg: &str) {
    eprintln!("{msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unknown_encoding() {
        let options = PageOptions {
            encoding: Some("klingon".to_string()),
            ..Default::default()
        };
        let result = EncodingValidator::new().validate_options(&options);
        assert!(matches!(result, Err(TranslationError::ConfigError(_))));
    }

    #[test]
    fn test_validate_known_encoding() {
        let options = PageOptions {
            encoding: Some("windows-1252".to_string()),
            ..Default::default()
        };
        assert!(EncodingValidator::new().validate_options(&options).is_ok());
        assert!(EncodingValidator::new()
            .validate_options(&PageOptions::default())
            .is_ok());
    }

    #[test]
    fn test_process_encoding_uses_declared_charset() {
        let html = b"<html><head><meta charset=\"windows-1252\"></head><body><p>caf\xe9</p></body></html>";
        let (dom, encoding) = EncodingProcessor::new()
            .process_encoding(html, None)
            .unwrap();

        assert_eq!(encoding, "windows-1252");
        let text = crate::parsers::html::dom::text_content(&dom.document);
        assert!(text.contains("café"));
    }

    #[test]
    fn test_process_encoding_defaults_to_utf8() {
        let (_, encoding) = EncodingProcessor::new()
            .process_encoding("<p>你好</p>".as_bytes(), None)
            .unwrap();
        assert_eq!(encoding, "utf-8");
    }

    #[test]
    fn test_process_encoding_explicit_wins() {
        let html = b"<html><head><meta charset=\"windows-1252\"></head></html>";
        let (_, encoding) = EncodingProcessor::new()
            .process_encoding(html, Some("utf-8".to_string()))
            .unwrap();
        assert_eq!(encoding, "utf-8");
    }
}
