//! 번들 아카이브 -- 여러 산출물을 담는 gzip 압축 컨테이너
//!
//! [`Bundle`]은 버전 문자열과 `레이블 -> 원본 바이트` 매핑입니다. 직렬화는
//! 자기 기술적 바이너리 형식인 CBOR를 gzip(deflate) 스트림에 바로 흘려 쓰므로,
//! 압축 전 전체 스트림을 메모리에 만들지 않습니다.
//!
//! 디코딩은 압축 해제 크기를 `max_decompressed_bytes`로 제한한 뒤 최상위 형태
//! (`version` 문자열, `artifacts` 바이트 맵, 그 외 필드 없음)를 검사하고 나서야
//! 산출물을 노출합니다.
//!
//! # 사용 예시
//! ```ignore
//! let mut bundle = Bundle::new();
//! bundle.add("grype.json", Bytes::from(grype_bytes));
//! let encoded = bundle.to_bytes()?;
//! let decoded = Bundle::from_bytes(&encoded, DEFAULT_MAX_DECOMPRESSED_BYTES)?;
//! assert_eq!(bundle, decoded);
//! ```

mod summary;

pub use summary::{BundleSummary, SummaryEntry};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reportgate_core::metrics as m;
use reportgate_core::types::ReportKind;

use crate::artifact::{Artifact, label_from_path};
use crate::error::FormatError;
use crate::report::{Report, ReportFormat};

/// 현재 번들 버전
pub const BUNDLE_VERSION: &str = "1";

const FORMAT: &str = "bundle";

/// 인코딩용 직렬화 형태. 산출물 바이트를 복사하지 않고 빌려 씁니다.
#[derive(Serialize)]
struct WireBundleRef<'a> {
    version: &'a str,
    artifacts: BTreeMap<&'a str, &'a serde_bytes::Bytes>,
}

/// 디코딩용 직렬화 형태
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireBundle {
    version: String,
    artifacts: BTreeMap<String, serde_bytes::ByteBuf>,
}

/// 레이블이 붙은 산출물 모음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    version: String,
    artifacts: BTreeMap<String, Bytes>,
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundle {
    /// 빈 번들을 생성합니다.
    pub fn new() -> Self {
        Self {
            version: BUNDLE_VERSION.to_owned(),
            artifacts: BTreeMap::new(),
        }
    }

    /// 산출물 목록으로 번들을 생성합니다. 같은 레이블은 뒤의 것이 이깁니다.
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let mut bundle = Self::new();
        for artifact in artifacts {
            bundle.add(artifact.label().to_owned(), artifact.content().clone());
        }
        bundle
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 산출물을 추가합니다. 같은 레이블이 있으면 덮어쓰고 이전 내용을 반환합니다.
    pub fn add(&mut self, label: impl Into<String>, content: Bytes) -> Option<Bytes> {
        let label = label.into();
        let previous = self.artifacts.insert(label.clone(), content);
        if previous.is_some() {
            debug!(label = %label, "bundle artifact overwritten");
        }
        previous
    }

    /// 파일을 읽어 basename 레이블로 추가하고 레이블을 반환합니다.
    pub fn add_file(&mut self, path: &Path) -> Result<String, FormatError> {
        let content = std::fs::read(path).map_err(|source| FormatError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let label = label_from_path(path);
        self.add(label.clone(), Bytes::from(content));
        Ok(label)
    }

    /// 레이블을 제거하고 내용을 반환합니다.
    pub fn remove(&mut self, label: &str) -> Result<Bytes, FormatError> {
        self.artifacts
            .remove(label)
            .ok_or_else(|| FormatError::LabelNotFound {
                label: label.to_owned(),
            })
    }

    pub fn get(&self, label: &str) -> Option<&Bytes> {
        self.artifacts.get(label)
    }

    /// 레이블의 내용을 꺼냅니다. 없으면 [`FormatError::LabelNotFound`].
    pub fn extract(&self, label: &str) -> Result<&Bytes, FormatError> {
        self.get(label).ok_or_else(|| FormatError::LabelNotFound {
            label: label.to_owned(),
        })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.artifacts.contains_key(label)
    }

    /// 정렬된 레이블 목록
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.artifacts.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// 모든 산출물 크기의 합
    pub fn total_size(&self) -> u64 {
        self.artifacts.values().map(|b| b.len() as u64).sum()
    }

    /// gzip 압축 스트림으로 인코딩하고 writer를 돌려줍니다.
    pub fn encode<W: Write>(&self, writer: W) -> Result<W, FormatError> {
        let wire = WireBundleRef {
            version: &self.version,
            artifacts: self
                .artifacts
                .iter()
                .map(|(label, content)| (label.as_str(), serde_bytes::Bytes::new(content)))
                .collect(),
        };

        let mut encoder = GzEncoder::new(writer, Compression::default());
        ciborium::into_writer(&wire, &mut encoder)
            .map_err(|e| FormatError::wire(format!("serialization failed: {e}")))?;
        let writer = encoder
            .finish()
            .map_err(|e| FormatError::wire(format!("compression failed: {e}")))?;

        metrics::counter!(m::BUNDLE_ENCODED_TOTAL).increment(1);
        debug!(artifacts = self.artifacts.len(), "bundle encoded");
        Ok(writer)
    }

    /// 메모리 버퍼로 인코딩합니다.
    pub fn to_bytes(&self) -> Result<Bytes, FormatError> {
        self.encode(Vec::new()).map(Bytes::from)
    }

    /// 압축 스트림에서 번들을 디코딩하고 검사합니다.
    pub fn decode<R: Read>(reader: R, max_decompressed_bytes: u64) -> Result<Self, FormatError> {
        let format = BundleFormat::new(max_decompressed_bytes);
        let bundle = format.parse_reader(reader)?;
        format.check(&bundle)?;
        Ok(bundle)
    }

    pub fn from_bytes(raw: &[u8], max_decompressed_bytes: u64) -> Result<Self, FormatError> {
        Self::decode(raw, max_decompressed_bytes)
    }

    /// 파일에서 번들을 읽습니다.
    pub fn read_file(path: &Path, max_decompressed_bytes: u64) -> Result<Self, FormatError> {
        let file = File::open(path).map_err(|source| FormatError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::decode(BufReader::new(file), max_decompressed_bytes)
    }

    /// 파일에 번들을 씁니다. 기존 파일은 덮어씁니다.
    pub fn write_file(&self, path: &Path) -> Result<(), FormatError> {
        let io_err = |source| FormatError::Io {
            path: path.display().to_string(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = self.encode(BufWriter::new(file))?;
        writer.flush().map_err(io_err)
    }
}

/// 번들 디코더
///
/// 탐지기에 등록되어 gzip 번들 입력을 인식합니다.
#[derive(Debug, Clone, Copy)]
pub struct BundleFormat {
    max_decompressed_bytes: u64,
}

impl BundleFormat {
    pub fn new(max_decompressed_bytes: u64) -> Self {
        Self {
            max_decompressed_bytes,
        }
    }

    fn parse_reader<R: Read>(&self, reader: R) -> Result<Bundle, FormatError> {
        let stream = decompress(reader, self.max_decompressed_bytes)?;
        let wire: WireBundle = ciborium::from_reader(&stream[..])
            .map_err(|e| FormatError::wire(format!("deserialization failed: {e}")))?;

        let artifacts = wire
            .artifacts
            .into_iter()
            .map(|(label, content)| (label, Bytes::from(content.into_vec())))
            .collect();

        metrics::counter!(m::BUNDLE_DECODED_TOTAL).increment(1);
        Ok(Bundle {
            version: wire.version,
            artifacts,
        })
    }
}

impl ReportFormat for BundleFormat {
    type Output = Bundle;

    fn kind(&self) -> ReportKind {
        ReportKind::Bundle
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, raw: &[u8]) -> Result<Bundle, FormatError> {
        self.parse_reader(raw)
    }

    fn check(&self, bundle: &Bundle) -> Result<(), FormatError> {
        if bundle.version != BUNDLE_VERSION {
            return Err(FormatError::UnsupportedVersion {
                format: FORMAT.to_owned(),
                found: bundle.version.clone(),
                expected: BUNDLE_VERSION.to_owned(),
            });
        }
        Ok(())
    }

    fn into_report(parsed: Bundle) -> Report {
        Report::Bundle(parsed)
    }
}

/// 압축 해제 크기를 제한하며 gzip 스트림을 풉니다.
fn decompress<R: Read>(reader: R, max: u64) -> Result<Bytes, FormatError> {
    let mut out = Vec::new();
    GzDecoder::new(reader)
        .take(max.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| FormatError::wire(format!("decompression failed: {e}")))?;
    if out.len() as u64 > max {
        return Err(FormatError::TooLarge { max });
    }
    Ok(Bytes::from(out))
}
