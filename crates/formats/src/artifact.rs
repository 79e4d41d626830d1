//! 산출물 -- 레이블, 다이제스트, 추론된 종류가 붙은 불변 바이트
//!
//! 종류는 호출자가 선언하지 않고 [`FormatDetector`]가 추론합니다.
//! 다이제스트는 생성 시 한 번만 계산합니다.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use reportgate_core::types::{Digest, ReportKind};

use crate::detector::FormatDetector;
use crate::error::FormatError;

/// 레이블이 붙은 산출물
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    label: String,
    digest: Digest,
    kind: ReportKind,
    content: Bytes,
}

impl Artifact {
    /// 내용을 분류하고 다이제스트를 계산하여 산출물을 생성합니다.
    ///
    /// 어떤 형식과도 일치하지 않는 내용은 [`ReportKind::Generic`]이 됩니다.
    /// 탐지 마감 시간 초과는 에러로 전파됩니다.
    pub async fn new(
        label: impl Into<String>,
        content: Bytes,
        detector: &FormatDetector,
        timeout: Duration,
    ) -> Result<Self, FormatError> {
        let kind = detector.classify(content.clone(), timeout).await?.kind();
        Ok(Self {
            label: label.into(),
            digest: Digest::sha256(&content),
            kind,
            content,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) [{}] {}",
            self.label,
            self.kind.display_name(),
            self.digest,
            human_size(self.size())
        )
    }
}

/// 파일 경로에서 레이블(basename)을 만듭니다.
pub fn label_from_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// SI 단위 크기 문자열 (`512 B`, `1.5 kB`, `12 MB`)
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
    let mut exponent = 0;
    let mut scale = 1u64;
    while exponent + 1 < UNITS.len() && bytes / scale >= 1000 {
        scale *= 1000;
        exponent += 1;
    }
    if exponent == 0 {
        return format!("{bytes} B");
    }
    let value = bytes as f64 / scale as f64;
    if value < 10.0 {
        format!("{value:.1} {}", UNITS[exponent])
    } else {
        format!("{value:.0} {}", UNITS[exponent])
    }
}
