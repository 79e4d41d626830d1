//! 규칙 레지스트리 -- 리포트 종류를 (설정 필드, 비교 함수)로 대응
//!
//! 스캐너 계열을 추가하려면 [`RuleEntry`] 하나를 등록하면 됩니다.

use reportgate_core::metrics as m;
use reportgate_core::types::ReportKind;
use reportgate_formats::{PolicyConfig, Report};

use crate::engine::Verdict;
use crate::error::PolicyError;
use crate::rules;

/// 리포트와 정책 설정을 받아 평가하는 함수
pub type CompareFn = fn(&Report, &PolicyConfig) -> Result<Verdict, PolicyError>;

/// 레지스트리 항목
#[derive(Debug, Clone)]
pub struct RuleEntry {
    kind: ReportKind,
    field: &'static str,
    compare: CompareFn,
}

impl RuleEntry {
    pub fn new(kind: ReportKind, field: &'static str, compare: CompareFn) -> Self {
        Self {
            kind,
            field,
            compare,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// 정책 설정의 필드 이름
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// 디코딩된 리포트를 평가합니다. 위반은 `Ok(verdict)`에 담겨 반환됩니다.
    pub fn evaluate(&self, report: &Report, config: &PolicyConfig) -> Result<Verdict, PolicyError> {
        let verdict = (self.compare)(report, config)?;
        let result = if verdict.passed() { "pass" } else { "fail" };
        metrics::counter!(
            m::POLICY_EVALUATIONS_TOTAL,
            m::LABEL_KIND => self.kind.as_label(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        Ok(verdict)
    }
}

/// 규칙 레지스트리
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    entries: Vec<RuleEntry>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grype, Semgrep, Gitleaks, CycloneDX 규칙을 등록한 레지스트리
    pub fn with_defaults() -> Self {
        Self::new()
            .register(RuleEntry::new(
                ReportKind::VulnScan,
                rules::GRYPE_FIELD,
                compare_grype,
            ))
            .register(RuleEntry::new(
                ReportKind::StaticScan,
                rules::SEMGREP_FIELD,
                compare_semgrep,
            ))
            .register(RuleEntry::new(
                ReportKind::SecretScan,
                rules::GITLEAKS_FIELD,
                compare_gitleaks,
            ))
            .register(RuleEntry::new(
                ReportKind::Sbom,
                rules::CYCLONEDX_FIELD,
                compare_cyclonedx,
            ))
    }

    /// 항목을 등록합니다. 같은 종류가 있으면 교체합니다.
    pub fn register(mut self, entry: RuleEntry) -> Self {
        self.entries.retain(|e| e.kind != entry.kind);
        self.entries.push(entry);
        self
    }

    pub fn get(&self, kind: ReportKind) -> Option<&RuleEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    /// 등록된 (종류, 필드) 목록
    pub fn fields(&self) -> impl Iterator<Item = (ReportKind, &'static str)> + '_ {
        self.entries.iter().map(|e| (e.kind, e.field))
    }

    /// 리포트 종류에 맞는 규칙으로 평가합니다.
    pub fn evaluate(&self, report: &Report, config: &PolicyConfig) -> Result<Verdict, PolicyError> {
        let kind = report.kind();
        let entry = self.get(kind).ok_or_else(|| PolicyError::Unsupported {
            kind: kind.display_name().to_owned(),
        })?;
        entry.evaluate(report, config)
    }
}

fn missing(field: &str) -> PolicyError {
    PolicyError::MissingConfig {
        field: field.to_owned(),
    }
}

fn mismatched(expected: ReportKind, report: &Report) -> PolicyError {
    PolicyError::Unsupported {
        kind: format!(
            "{} (rule expects {})",
            report.kind().display_name(),
            expected.display_name()
        ),
    }
}

fn compare_grype(report: &Report, config: &PolicyConfig) -> Result<Verdict, PolicyError> {
    let Report::VulnScan(report) = report else {
        return Err(mismatched(ReportKind::VulnScan, report));
    };
    let section = config.grype.as_ref().ok_or_else(|| missing(rules::GRYPE_FIELD))?;
    Ok(rules::grype(report, section))
}

fn compare_semgrep(report: &Report, config: &PolicyConfig) -> Result<Verdict, PolicyError> {
    let Report::StaticScan(report) = report else {
        return Err(mismatched(ReportKind::StaticScan, report));
    };
    let section = config.semgrep.as_ref().ok_or_else(|| missing(rules::SEMGREP_FIELD))?;
    Ok(rules::semgrep(report, section))
}

fn compare_gitleaks(report: &Report, config: &PolicyConfig) -> Result<Verdict, PolicyError> {
    let Report::SecretScan(report) = report else {
        return Err(mismatched(ReportKind::SecretScan, report));
    };
    let section = config.gitleaks.as_ref().ok_or_else(|| missing(rules::GITLEAKS_FIELD))?;
    Ok(rules::gitleaks(report, section))
}

fn compare_cyclonedx(report: &Report, config: &PolicyConfig) -> Result<Verdict, PolicyError> {
    let Report::Sbom(report) = report else {
        return Err(mismatched(ReportKind::Sbom, report));
    };
    let section = config.cyclonedx.as_ref().ok_or_else(|| missing(rules::CYCLONEDX_FIELD))?;
    Ok(rules::cyclonedx(report, section))
}
