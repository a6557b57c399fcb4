//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PERSONA__*` 覆盖（双下划线表示嵌套，如 `PERSONA__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::{DEFAULT_STRUCTURED_TEMPERATURE, DEFAULT_TEXT_TEMPERATURE};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub pipeline: PipelineSection,
    pub formatter: FormatterSection,
    pub storage: StorageSection,
}

/// [app] 段：应用名（启动日志）、数据目录（运行记录库的默认位置）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "persona-factory".to_string(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl AppConfig {
    /// 运行记录库路径：显式 [storage].db_path 优先，否则为 data_dir/persona_runs.db
    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join(DEFAULT_DB_FILE))
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；deepseek / openai 还需要对应的 API Key
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
    #[serde(default)]
    pub temperature: LlmTemperatureSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
            temperature: LlmTemperatureSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [llm.timeouts]：单次网关调用超时（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [llm.temperature]：自由文本与结构化调用各自的采样温度
#[derive(Debug, Clone, Deserialize)]
pub struct LlmTemperatureSection {
    #[serde(default = "default_text_temperature")]
    pub text: f32,
    #[serde(default = "default_structured_temperature")]
    pub structured: f32,
}

impl Default for LlmTemperatureSection {
    fn default() -> Self {
        Self {
            text: default_text_temperature(),
            structured: default_structured_temperature(),
        }
    }
}

fn default_text_temperature() -> f32 {
    DEFAULT_TEXT_TEMPERATURE
}

fn default_structured_temperature() -> f32 {
    DEFAULT_STRUCTURED_TEMPERATURE
}

/// [pipeline] 段：校验重试次数、成功后是否落库
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub persist_results: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            persist_results: true,
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

/// [formatter] 段：Character 名称与发送账号
#[derive(Debug, Clone, Deserialize)]
pub struct FormatterSection {
    #[serde(default = "default_character_name")]
    pub character_name: String,
    #[serde(default = "default_telegram_user")]
    pub telegram_user: String,
}

impl Default for FormatterSection {
    fn default() -> Self {
        Self {
            character_name: default_character_name(),
            telegram_user: default_telegram_user(),
        }
    }
}

fn default_character_name() -> String {
    "Generated Character".to_string()
}

fn default_telegram_user() -> String {
    "default_sender_account".to_string()
}

const DEFAULT_DB_FILE: &str = "persona_runs.db";

/// [storage] 段：运行记录 SQLite 路径；未设置时落在 [app].data_dir 下
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageSection {
    pub db_path: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 PERSONA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PERSONA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("config file {} not found, skipping", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PERSONA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载失败时回退到默认配置并告警
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        AppConfig::default()
    })
}

/// 重新从磁盘与环境变量加载配置（Web 服务每次请求前调用，配置改动无需重启）
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.pipeline.max_retries, 2);
        assert!(cfg.pipeline.persist_results);
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert_eq!(cfg.formatter.character_name, "Generated Character");
        assert_eq!(cfg.llm.temperature.text, 0.7);
        assert_eq!(cfg.llm.temperature.structured, 0.3);
        assert_eq!(cfg.app.name, "persona-factory");
        assert_eq!(cfg.db_path(), PathBuf::from("./data").join("persona_runs.db"));
    }

    #[test]
    fn test_explicit_file_overrides_and_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[pipeline]\nmax_retries = 5\n\n[llm]\nprovider = \"mock\"\n\n[formatter]\ntelegram_user = \"launch_bot\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.pipeline.max_retries, 5);
        assert!(cfg.pipeline.persist_results);
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert_eq!(cfg.formatter.telegram_user, "launch_bot");
        assert_eq!(cfg.formatter.character_name, "Generated Character");
    }

    #[test]
    fn test_db_path_follows_data_dir_unless_set() {
        let mut cfg = AppConfig::default();
        cfg.app.data_dir = PathBuf::from("/var/lib/personas");
        assert_eq!(cfg.db_path(), PathBuf::from("/var/lib/personas/persona_runs.db"));

        cfg.storage.db_path = Some(PathBuf::from("runs.db"));
        assert_eq!(cfg.db_path(), PathBuf::from("runs.db"));
    }
}
