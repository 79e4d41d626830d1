//! 설정 관리 -- reportgate.toml 파싱 및 런타임 설정
//!
//! [`GateConfig`]는 애플리케이션 동작(로깅, 탐지 마감 시간, 번들, 피드 경로)을
//! 담는 최상위 구조체입니다. 정책 임계값은 이 파일이 아니라 별도의 정책 YAML
//! 문서에서 읽습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`REPORTGATE_DETECT_TIMEOUT_MS=2000` 형식)
//! 3. 설정 파일 (`reportgate.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), reportgate_core::error::GateError> {
//! use reportgate_core::config::GateConfig;
//!
//! let config = GateConfig::load("reportgate.toml").await?;
//! let config = GateConfig::parse("[detect]\ntimeout_ms = 2000")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, GateError};

/// 기본 설정 파일 이름
pub const DEFAULT_CONFIG_FILE: &str = "reportgate.toml";

/// 기본 번들 파일 이름
pub const DEFAULT_BUNDLE_FILENAME: &str = "reportgate-bundle.gz";

/// 번들 압축 해제 최대 크기 기본값 (512 MiB)
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: u64 = 512 * 1024 * 1024;

/// Reportgate 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 형식 탐지 설정
    #[serde(default)]
    pub detect: DetectConfig,
    /// 번들 설정
    #[serde(default)]
    pub bundle: BundleConfig,
    /// 인텔리전스 피드 설정
    #[serde(default)]
    pub feeds: FeedConfig,
}

impl GateConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에 환경변수 오버라이드만 적용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = path.as_ref();
        let mut config = match tokio::fs::try_exists(path).await {
            Ok(true) => Self::from_file(path).await?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GateError::file_access(path.display(), e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, GateError> {
        toml::from_str(toml_str).map_err(|e| {
            GateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `REPORTGATE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "REPORTGATE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "REPORTGATE_GENERAL_LOG_FORMAT");

        override_u64(&mut self.detect.timeout_ms, "REPORTGATE_DETECT_TIMEOUT_MS");

        override_string(
            &mut self.bundle.default_filename,
            "REPORTGATE_BUNDLE_DEFAULT_FILENAME",
        );
        override_u64(
            &mut self.bundle.max_decompressed_bytes,
            "REPORTGATE_BUNDLE_MAX_DECOMPRESSED_BYTES",
        );

        override_opt_string(&mut self.feeds.kev_file, "REPORTGATE_FEEDS_KEV_FILE");
        override_opt_string(&mut self.feeds.epss_file, "REPORTGATE_FEEDS_EPSS_FILE");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), GateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.detect.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "detect.timeout_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.bundle.default_filename.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bundle.default_filename".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.bundle.max_decompressed_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bundle.max_decompressed_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
///
/// 로깅 설정 객체입니다. 바이너리가 이 값을 구독자 초기화에 직접 전달하며,
/// 전역 verbosity 플래그는 없습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 형식 탐지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// 탐지 마감 시간 (밀리초)
    pub timeout_ms: u64,
}

impl DetectConfig {
    /// 마감 시간을 `Duration`으로 반환합니다.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

/// 번들 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// 출력 경로가 주어지지 않았을 때 사용할 번들 파일 이름
    pub default_filename: String,
    /// 압축 해제 허용 최대 바이트
    pub max_decompressed_bytes: u64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            default_filename: DEFAULT_BUNDLE_FILENAME.to_owned(),
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

/// 인텔리전스 피드 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// 로컬 KEV 카탈로그 파일 (JSON 또는 CSV)
    pub kev_file: Option<String>,
    /// 로컬 EPSS 점수 파일 (CSV)
    pub epss_file: Option<String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
