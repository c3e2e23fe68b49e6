use quest_algo::{level_progress, Profile};
use serde::{Deserialize, Serialize};

use super::journals::{self, JournalEntry};
use super::missions::{self, Mission};
use super::{now_ms, profile, require_teacher, ServiceResult};
use crate::auth::Account;
use crate::generative::ContentGenerator;
use crate::store::StoreProxy;

pub const REPORT_FALLBACK: &str = "지금은 분석 보고서를 만들 수 없습니다. 잠시 후 다시 시도해 주세요.";

const RECENT_JOURNALS: usize = 5;
const JOURNAL_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub student_id: String,
    pub requested_by: String,
    pub status: ReportStatus,
    #[serde(default)]
    pub content: String,
    pub updated_at: i64,
}

fn report_prompt(student: &Profile, missions: &[Mission], journals: &[JournalEntry]) -> String {
    let progress = level_progress(student);
    let skills = student
        .skills
        .iter()
        .map(|(name, score)| format!("- {name}: {score}"))
        .collect::<Vec<_>>()
        .join("\n");

    let completed = missions.iter().filter(|m| m.state.is_completed()).count();
    let mission_lines = missions
        .iter()
        .map(|m| format!("- [{}] {} ({})", m.state.as_str(), m.title, m.category.label()))
        .collect::<Vec<_>>()
        .join("\n");

    let journal_lines = journals
        .iter()
        .take(RECENT_JOURNALS)
        .map(|j| {
            let excerpt: String = j.content.chars().take(JOURNAL_EXCERPT_CHARS).collect();
            let quiz = j
                .quiz_result
                .as_ref()
                .map(|r| format!(" (퀴즈 {}/{})", r.correct, r.total))
                .unwrap_or_default();
            format!("- {excerpt}{quiz}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "당신은 초등학교 담임 선생님을 돕는 학습 분석가입니다. 아래 자료로 학생의 강점, \
         보완할 점, 다음 주에 해 볼 만한 활동을 각각 두세 문장으로 정리해 주세요.\n\n\
         이름: {name}\n레벨: {level} (다음 레벨까지 {to_next} XP)\n골드: {gold}\n\
         능력치:\n{skills}\n\n미션 ({completed}/{total} 완료):\n{mission_lines}\n\n최근 일기:\n{journal_lines}",
        name = student.display_name,
        level = progress.level,
        to_next = progress.xp_to_next_level,
        gold = student.gold,
        total = missions.len(),
    )
}

/// Writes `PENDING`, then `READY` with the generated text or `FAILED` with
/// the fallback message.
pub async fn generate_report(
    proxy: &StoreProxy,
    generator: &dyn ContentGenerator,
    actor: &Account,
    student_id: &str,
) -> ServiceResult<AnalysisReport> {
    require_teacher(actor)?;
    let student = profile::get_public(proxy, student_id).await?;
    let path = proxy.paths().report(student_id);

    let mut report = AnalysisReport {
        student_id: student_id.to_string(),
        requested_by: actor.user_id.clone(),
        status: ReportStatus::Pending,
        content: String::new(),
        updated_at: now_ms(),
    };
    proxy.write(&path, &report).await?;

    let missions = missions::list_for_student(proxy, actor, student_id).await?;
    let journals = journals::list(proxy, actor, student_id).await?;
    let prompt = report_prompt(&student, &missions, &journals);

    match generator.generate_text(&prompt).await {
        Ok(text) => {
            report.status = ReportStatus::Ready;
            report.content = text.trim().to_string();
        }
        Err(err) => {
            tracing::warn!(student_id, error = %err, "analysis report generation failed");
            report.status = ReportStatus::Failed;
            report.content = REPORT_FALLBACK.to_string();
        }
    }
    report.updated_at = now_ms();
    proxy.write(&path, &report).await?;

    tracing::info!(student_id, teacher_id = %actor.user_id, status = ?report.status, "analysis report written");
    Ok(report)
}

pub async fn get_report(proxy: &StoreProxy, actor: &Account, student_id: &str) -> ServiceResult<Option<AnalysisReport>> {
    require_teacher(actor)?;
    Ok(proxy.read(&proxy.paths().report(student_id)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::MockGenerator;
    use crate::services::profile::ensure_profile;
    use crate::services::testing::{proxy, student, teacher};
    use crate::services::ServiceError;

    #[tokio::test]
    async fn test_report_ready() {
        let proxy = proxy();
        let owner = student("s1");
        ensure_profile(&proxy, &owner).await.unwrap();
        let generator = MockGenerator::new("m").with_default_text("  꾸준히 성장하고 있어요.  ");
        journals::create_entry(&proxy, &generator, &owner, "오늘 줄넘기를 했다").await.unwrap();

        let report = generate_report(&proxy, &generator, &teacher(), "s1").await.unwrap();
        assert_eq!(report.status, ReportStatus::Ready);
        assert_eq!(report.content, "꾸준히 성장하고 있어요.");
        assert_eq!(get_report(&proxy, &teacher(), "s1").await.unwrap(), Some(report));

        let prompt = generator.prompts().pop().unwrap();
        assert!(prompt.contains("오늘 줄넘기를 했다"));
    }

    #[tokio::test]
    async fn test_report_failure_is_recorded() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();
        let generator = MockGenerator::default();
        generator.push_failure("quota");

        let report = generate_report(&proxy, &generator, &teacher(), "s1").await.unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.content, REPORT_FALLBACK);
    }

    #[tokio::test]
    async fn test_report_access() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();
        let generator = MockGenerator::default();

        assert!(matches!(
            generate_report(&proxy, &generator, &student("s1"), "s1").await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            generate_report(&proxy, &generator, &teacher(), "missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(get_report(&proxy, &teacher(), "s1").await.unwrap(), None);
    }
}
