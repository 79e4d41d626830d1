//! 리포트/번들 검증기
//!
//! 한 리포트의 검증 순서는 다음과 같습니다.
//!
//! ```text
//! bytes --detect--> Report --(VulnScan only)--> KEV match --> EPSS apply --> RuleRegistry
//!                                                  |              |               |
//!                                                  +-- failures --+---------------+--> Combined
//! ```
//!
//! EPSS 적용은 리포트를 변경하므로 항상 정책 평가보다 먼저, 같은 태스크에서
//! 수행됩니다. 번들은 산출물마다 태스크 하나로 펼쳐 검증하고 실패를 레이블별로
//! 모읍니다. 피드 에러(`Api`)는 집계하지 않고 즉시 전파합니다.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use reportgate_core::config::DetectConfig;
use reportgate_core::error::ErrorKind;
use reportgate_core::metrics as m;
use reportgate_core::types::ReportKind;
use reportgate_formats::{Bundle, FormatDetector, FormatError, GrypeReport, PolicyConfig, Report};

use crate::engine::Verdict;
use crate::epss::{self, EpssOutcome, EpssSource};
use crate::error::PolicyError;
use crate::kev::{KevCatalog, KevReport};
use crate::registry::RuleRegistry;
use crate::rules;

/// 리포트 하나의 검증 결과
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub kind: ReportKind,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kev: Option<KevReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epss: Option<EpssOutcome>,
}

/// 번들 검증 결과 (모든 산출물 통과)
#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleOutcome {
    /// 레이블별 통과 결과
    pub reports: BTreeMap<String, ReportOutcome>,
    /// 정책 대상이 아니어서 건너뛴 레이블
    pub skipped: Vec<String>,
}

/// 검증 결과
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Report(ReportOutcome),
    Bundle(BundleOutcome),
}

/// 리포트 검증기
///
/// 탐지기, 규칙 레지스트리, 선택적 KEV 카탈로그와 EPSS 공급원을 묶습니다.
/// 복제 비용이 작아 번들 팬아웃 태스크마다 복제해 넘깁니다.
#[derive(Clone)]
pub struct ReportValidator {
    detector: FormatDetector,
    registry: Arc<RuleRegistry>,
    kev: Option<Arc<KevCatalog>>,
    epss: Option<Arc<dyn EpssSource>>,
    timeout: Duration,
}

impl ReportValidator {
    pub fn new(detector: FormatDetector, timeout: Duration) -> Self {
        Self {
            detector,
            registry: Arc::new(RuleRegistry::with_defaults()),
            kev: None,
            epss: None,
            timeout,
        }
    }

    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// KEV 카탈로그 매칭을 켭니다.
    pub fn with_kev(mut self, catalog: KevCatalog) -> Self {
        self.kev = Some(Arc::new(catalog));
        self
    }

    /// EPSS 점수 적용을 켭니다.
    pub fn with_epss(mut self, source: Arc<dyn EpssSource>) -> Self {
        self.epss = Some(source);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// 입력을 탐지하고 검증합니다. 번들이면 번들 검증으로 넘깁니다.
    ///
    /// # Errors
    /// - 어떤 형식과도 맞지 않으면 [`FormatError::NoMatchingFormat`]
    /// - 정책 위반, KEV 매칭, EPSS 거부가 하나라도 있으면 해당 실패 (여러 개면 [`PolicyError::Combined`])
    /// - 번들 산출물 실패는 [`PolicyError::BundleViolations`]
    pub async fn validate(
        &self,
        content: Bytes,
        config: &PolicyConfig,
    ) -> Result<ValidationOutcome, PolicyError> {
        let report = self.detector.detect(content, self.timeout).await?;
        match report {
            Report::Bundle(bundle) => self
                .validate_bundle(&bundle, config)
                .await
                .map(ValidationOutcome::Bundle),
            report => self.evaluate(report, config).map(ValidationOutcome::Report),
        }
    }

    /// 디코딩된 리포트에 인리치먼트와 정책을 차례로 적용합니다.
    pub fn evaluate(
        &self,
        mut report: Report,
        config: &PolicyConfig,
    ) -> Result<ReportOutcome, PolicyError> {
        let kind = report.kind();
        let (kev, epss) = match &mut report {
            Report::VulnScan(grype) => self.enrich(grype, config)?,
            _ => (None, None),
        };

        let verdict = self.registry.evaluate(&report, config)?;

        let mut failures = Vec::new();
        if let Err(e) = verdict.check() {
            failures.push(e);
        }
        if let Some(Err(e)) = kev.as_ref().map(KevReport::check) {
            failures.push(e);
        }
        if let Some(Err(e)) = epss.as_ref().map(EpssOutcome::check) {
            failures.push(e);
        }

        info!(
            kind = %kind,
            passed = failures.is_empty(),
            failures = failures.len(),
            "report evaluated"
        );

        match PolicyError::combine(failures) {
            Some(err) => Err(err),
            None => Ok(ReportOutcome {
                kind,
                verdict,
                kev,
                epss,
            }),
        }
    }

    fn enrich(
        &self,
        grype: &mut GrypeReport,
        config: &PolicyConfig,
    ) -> Result<(Option<KevReport>, Option<EpssOutcome>), PolicyError> {
        let kev = self.kev.as_ref().map(|catalog| catalog.matches(grype));

        let epss = match &self.epss {
            Some(source) => {
                let section = config.grype.as_ref().ok_or_else(|| PolicyError::MissingConfig {
                    field: rules::GRYPE_FIELD.to_owned(),
                })?;
                Some(epss::apply(grype, section, source.as_ref())?)
            }
            None => None,
        };
        Ok((kev, epss))
    }

    /// 번들의 모든 산출물을 병렬로 검증합니다.
    ///
    /// 스캔 리포트가 아닌 산출물(generic, 정책 설정, 중첩 번들)은 건너뜁니다.
    /// `required`로 선언된 종류가 번들에 없으면 `required:<field>` 레이블로 실패합니다.
    pub async fn validate_bundle(
        &self,
        bundle: &Bundle,
        config: &PolicyConfig,
    ) -> Result<BundleOutcome, PolicyError> {
        let config = Arc::new(config.clone());
        let mut tasks = JoinSet::new();

        for (label, content) in bundle.iter() {
            let this = self.clone();
            let config = Arc::clone(&config);
            let label = label.to_owned();
            let content = content.clone();
            tasks.spawn(async move {
                let (kind, result) = this.evaluate_artifact(&label, content, &config).await;
                (label, kind, result)
            });
        }

        let mut outcome = BundleOutcome::default();
        let mut failures = BTreeMap::new();
        let mut present = HashSet::new();

        while let Some(joined) = tasks.join_next().await {
            let (label, kind, result) = joined.map_err(|e| FormatError::Task(e.to_string()))?;
            if let Some(kind) = kind {
                present.insert(kind);
            }
            match result {
                Ok(Some(report)) => {
                    outcome.reports.insert(label, report);
                }
                Ok(None) => outcome.skipped.push(label),
                Err(e) if e.kind() == ErrorKind::Api => {
                    tasks.abort_all();
                    warn!(label = %label, error = %e, "feed error aborted bundle validation");
                    return Err(e);
                }
                Err(e) => {
                    debug!(label = %label, error = %e, "bundle artifact failed");
                    failures.insert(label, e);
                }
            }
        }

        for kind in config.required_kinds() {
            if present.contains(&kind) {
                continue;
            }
            let field = self
                .registry
                .get(kind)
                .map(|entry| entry.field())
                .unwrap_or_else(|| kind.as_label());
            failures.insert(
                format!("required:{field}"),
                PolicyError::MissingRequired {
                    field: field.to_owned(),
                },
            );
        }

        outcome.skipped.sort();
        info!(
            artifacts = bundle.len(),
            passed = outcome.reports.len(),
            skipped = outcome.skipped.len(),
            failed = failures.len(),
            "bundle validated"
        );

        if failures.is_empty() {
            Ok(outcome)
        } else {
            Err(PolicyError::BundleViolations(failures))
        }
    }

    async fn evaluate_artifact(
        &self,
        label: &str,
        content: Bytes,
        config: &PolicyConfig,
    ) -> (Option<ReportKind>, Result<Option<ReportOutcome>, PolicyError>) {
        let report = match self.detector.classify(content, self.timeout).await {
            Ok(report) => report,
            Err(e) => return (None, Err(e.into())),
        };

        let kind = report.kind();
        if !kind.is_scan_report() {
            debug!(label = %label, kind = %kind, "artifact skipped");
            metrics::counter!(m::POLICY_SKIPPED_TOTAL).increment(1);
            return (Some(kind), Ok(None));
        }

        (Some(kind), self.evaluate(report, config).map(Some))
    }
}

impl Default for ReportValidator {
    fn default() -> Self {
        Self::new(FormatDetector::with_defaults(), DetectConfig::default().timeout())
    }
}

impl std::fmt::Debug for ReportValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportValidator")
            .field("detector", &self.detector)
            .field("registry", &self.registry)
            .field("kev", &self.kev.as_ref().map(|c| c.catalog_version.as_str()))
            .field("epss", &self.epss.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
