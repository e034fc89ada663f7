//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use once_cell::sync::OnceCell;
use rat_embed_lang::register_translations;
use std::collections::HashMap;

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();

        // 必填配置项缺失
        let mut field_required = HashMap::new();
        field_required.insert("zh-CN".to_string(), "配置项 {name} 必须显式设置".to_string());
        field_required.insert("en-US".to_string(), "Configuration field {name} must be set explicitly".to_string());
        field_required.insert("ja-JP".to_string(), "設定項目 {name} は明示的に設定する必要があります".to_string());
        translations.insert("error.field_required".to_string(), field_required);

        // 资源池容量为零
        let mut pool_max_size_zero = HashMap::new();
        pool_max_size_zero.insert("zh-CN".to_string(), "最大资源数必须大于零".to_string());
        pool_max_size_zero.insert("en-US".to_string(), "Pool max_size must be greater than zero".to_string());
        pool_max_size_zero.insert("ja-JP".to_string(), "最大リソース数はゼロより大きくなければなりません".to_string());
        translations.insert("error.pool_max_size_zero".to_string(), pool_max_size_zero);

        // 时限为零
        let mut timeout_zero = HashMap::new();
        timeout_zero.insert("zh-CN".to_string(), "{name} 不能为零".to_string());
        timeout_zero.insert("en-US".to_string(), "{name} must not be zero".to_string());
        timeout_zero.insert("ja-JP".to_string(), "{name} はゼロにできません".to_string());
        translations.insert("error.timeout_zero".to_string(), timeout_zero);

        // 最大租用次数为零
        let mut max_uses_zero = HashMap::new();
        max_uses_zero.insert("zh-CN".to_string(), "max_uses 不能为零".to_string());
        max_uses_zero.insert("en-US".to_string(), "max_uses must not be zero".to_string());
        max_uses_zero.insert("ja-JP".to_string(), "max_uses はゼロにできません".to_string());
        translations.insert("error.max_uses_zero".to_string(), max_uses_zero);

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        INITIALIZED.get_or_init(|| {
            Self::register_all_translations();

            // 从环境变量获取语言设置，默认为zh-CN
            let lang = std::env::var("RAT_LANG")
                .or_else(|_| std::env::var("LANG"))
                .unwrap_or_else(|_| "zh-CN".to_string());

            // 标准化语言代码
            use rat_embed_lang::normalize_language_code;
            let normalized_lang = normalize_language_code(&lang);
            set_language(&normalized_lang);
        });
    }
}

/// 获取翻译文本，首次调用时注册翻译
pub fn t(key: &str) -> String {
    ErrorMessageI18n::init();
    rat_embed_lang::t(key)
}

/// 获取带参数的翻译文本，首次调用时注册翻译
pub fn tf(key: &str, args: &[(&str, &str)]) -> String {
    ErrorMessageI18n::init();
    rat_embed_lang::tf(key, args)
}

/// 重新导出rat_embed_lang的语言切换函数
pub use rat_embed_lang::{current_language, set_language};
