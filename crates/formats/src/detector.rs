//! 동시 형식 탐지기 -- 등록된 디코더를 같은 입력에 대해 경쟁시킵니다.
//!
//! # 동작
//!
//! 1. 입력 [`Bytes`]를 복제 없이 공유하여 디코더마다 blocking 태스크를 띄웁니다.
//! 2. 파싱과 구조 검사를 모두 통과한 첫 결과가 이깁니다. 나머지는 기다리지 않습니다.
//! 3. 모든 디코더가 실패하면 [`FormatError::NoMatchingFormat`].
//! 4. 마감 시간 전에 승자가 없으면 [`FormatError::Cancelled`].
//!
//! 종료 시 취소 토큰을 발동하고 남은 태스크를 중단하므로, 늦게 끝난 디코더의
//! 결과는 버려집니다. 마감 시간이 지난 뒤 도착한 성공도 취소로 처리합니다.
//!
//! 구조 검사가 서로 배타적이므로 두 디코더가 동시에 성공하는 경우는 없다고 보고,
//! 먼저 완료된 쪽을 택합니다.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use reportgate_core::config::BundleConfig;
use reportgate_core::metrics as m;

use crate::error::FormatError;
use crate::report::{Report, ReportDecoder, default_decoders};

/// 형식 탐지기
#[derive(Clone, Default)]
pub struct FormatDetector {
    decoders: Vec<Arc<dyn ReportDecoder>>,
}

impl std::fmt::Debug for FormatDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.decoders.iter().map(|d| d.format_name()).collect();
        f.debug_struct("FormatDetector")
            .field("decoders", &names)
            .finish()
    }
}

impl FormatDetector {
    /// 디코더가 없는 탐지기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 디코더 세트로 탐지기를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::from_config(&BundleConfig::default())
    }

    /// 번들 설정의 압축 해제 한도를 반영한 기본 탐지기
    pub fn from_config(config: &BundleConfig) -> Self {
        Self {
            decoders: default_decoders(config.max_decompressed_bytes),
        }
    }

    /// 디코더를 추가합니다.
    pub fn register(mut self, decoder: Arc<dyn ReportDecoder>) -> Self {
        self.decoders.push(decoder);
        self
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// 입력 형식을 탐지하고 디코딩된 리포트를 반환합니다.
    ///
    /// # Errors
    /// - 모든 디코더가 거부하면 [`FormatError::NoMatchingFormat`]
    /// - `timeout` 안에 성공이 없으면 [`FormatError::Cancelled`]
    pub async fn detect(&self, content: Bytes, timeout: Duration) -> Result<Report, FormatError> {
        let deadline = Instant::now() + timeout;
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for decoder in &self.decoders {
            let decoder = Arc::clone(decoder);
            let content = content.clone();
            let cancel = cancel.clone();
            tasks.spawn_blocking(move || {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(decoder.decode(&content))
            });
        }

        let outcome = race(&mut tasks, deadline, timeout, self.decoders.len()).await;
        cancel.cancel();
        tasks.abort_all();

        match &outcome {
            Ok(report) => {
                metrics::counter!(m::DETECT_MATCHED_TOTAL, m::LABEL_KIND => report.kind().as_label())
                    .increment(1);
                debug!(kind = %report.kind(), size = content.len(), "format detected");
            }
            Err(FormatError::Cancelled { .. }) => {
                metrics::counter!(m::DETECT_CANCELLED_TOTAL).increment(1);
                debug!(timeout_ms = timeout.as_millis() as u64, "format detection cancelled");
            }
            Err(e) => {
                metrics::counter!(m::DETECT_UNMATCHED_TOTAL).increment(1);
                debug!(error = %e, size = content.len(), "no decoder matched");
            }
        }
        outcome
    }

    /// [`detect`](Self::detect)와 같지만 일치하는 형식이 없으면 [`Report::Generic`]을 반환합니다.
    pub async fn classify(&self, content: Bytes, timeout: Duration) -> Result<Report, FormatError> {
        match self.detect(content, timeout).await {
            Err(FormatError::NoMatchingFormat { .. }) => Ok(Report::Generic),
            other => other,
        }
    }
}

async fn race(
    tasks: &mut JoinSet<Option<Result<Report, FormatError>>>,
    deadline: Instant,
    timeout: Duration,
    tried: usize,
) -> Result<Report, FormatError> {
    let cancelled = || FormatError::Cancelled {
        timeout_ms: timeout.as_millis(),
    };

    loop {
        if Instant::now() >= deadline {
            return Err(cancelled());
        }
        tokio::select! {
            biased;

            _ = sleep_until(deadline) => return Err(cancelled()),

            joined = tasks.join_next() => match joined {
                None if Instant::now() >= deadline => return Err(cancelled()),
                None => return Err(FormatError::NoMatchingFormat { tried }),
                Some(Ok(Some(Ok(report)))) => {
                    if Instant::now() >= deadline {
                        return Err(cancelled());
                    }
                    return Ok(report);
                }
                Some(Ok(Some(Err(e)))) => trace!(error = %e, "decoder rejected input"),
                Some(Ok(None)) => {}
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => warn!(error = %e, "decoder task failed"),
            },
        }
    }
}
