use quest_algo::rewards::{journal_entry_reward, quiz_reward};
use quest_algo::Profile;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{now_ms, profile, require_owner_or_teacher, ServiceError, ServiceResult};
use crate::auth::Account;
use crate::generative::{ContentGenerator, GenerationError};
use crate::store::{Precondition, StoreError, StoreProxy};

pub const QUESTIONS_PER_QUIZ: usize = 3;
pub const MAX_CONTENT_CHARS: usize = 5_000;
pub const FEEDBACK_FALLBACK: &str = "AI 선생님이 지금은 답장을 쓸 수 없어요. 그래도 오늘 일기를 쓴 건 정말 멋져요!";
pub const QUIZ_FALLBACK: &str = "지금은 퀴즈를 만들 수 없어요. 잠시 후 다시 시도해 주세요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Choices, multiple choice only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    fn is_usable(&self) -> bool {
        let has_text = !self.question.trim().is_empty() && !self.answer.trim().is_empty();
        match self.kind {
            QuestionType::ShortAnswer => has_text,
            QuestionType::MultipleChoice => {
                has_text && self.options.len() >= 2 && self.options.iter().any(|o| answers_match(o, &self.answer))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub answers: Vec<String>,
    pub correct: usize,
    pub total: usize,
    pub graded_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: i64,
    #[serde(default)]
    pub ai_feedback: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_result: Option<QuizResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalOutcome {
    pub entry: JournalEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

/// Trimmed, case-insensitive comparison.
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

pub async fn list(proxy: &StoreProxy, actor: &Account, owner_id: &str) -> ServiceResult<Vec<JournalEntry>> {
    require_owner_or_teacher(actor, owner_id)?;

    let mut entries: Vec<JournalEntry> = proxy.list(&proxy.paths().journals(owner_id), None).await?;
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    Ok(entries)
}

async fn load(proxy: &StoreProxy, owner_id: &str, entry_id: &str) -> ServiceResult<JournalEntry> {
    proxy
        .read(&proxy.paths().journal(owner_id, entry_id))
        .await?
        .ok_or(ServiceError::NotFound("일기"))
}

fn feedback_prompt(content: &str) -> String {
    format!(
        "당신은 초등학생의 일기에 답장하는 다정한 선생님입니다. \
         아래 일기를 읽고 칭찬 한 가지와 생각을 넓혀 줄 질문 한 가지를 \
         세 문장 이내로 써 주세요.\n\n일기:\n{content}"
    )
}

pub async fn create_entry(
    proxy: &StoreProxy,
    generator: &dyn ContentGenerator,
    owner: &Account,
    content: &str,
) -> ServiceResult<JournalOutcome> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("일기 내용을 입력해 주세요".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ServiceError::Validation(format!(
            "일기는 {MAX_CONTENT_CHARS}자 이하로 써 주세요"
        )));
    }

    let ai_feedback = match generator.generate_text(&feedback_prompt(content)).await {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            tracing::warn!(owner_id = %owner.user_id, error = %err, "journal feedback unavailable");
            FEEDBACK_FALLBACK.to_string()
        }
    };

    let entry = JournalEntry {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner.user_id.clone(),
        content: content.to_string(),
        created_at: now_ms(),
        ai_feedback,
        questions: Vec::new(),
        quiz_result: None,
    };
    proxy
        .write(&proxy.paths().journal(&owner.user_id, &entry.id), &entry)
        .await?;

    let profile = profile::apply_reward(proxy, &owner.user_id, &owner.user_id, &journal_entry_reward()).await?;

    tracing::info!(owner_id = %owner.user_id, entry_id = %entry.id, "journal entry created");
    Ok(JournalOutcome { entry, profile })
}

pub fn quiz_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": ["MULTIPLE_CHOICE", "SHORT_ANSWER"] },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "answer": { "type": "STRING" },
                        "explanation": { "type": "STRING" }
                    },
                    "required": ["question", "type", "answer", "explanation"]
                }
            }
        },
        "required": ["questions"]
    })
}

fn quiz_prompt(content: &str) -> String {
    format!(
        "아래 초등학생 일기를 바탕으로 내용을 잘 이해했는지 확인하는 퀴즈 {QUESTIONS_PER_QUIZ}문제를 만들어 주세요. \
         객관식(MULTIPLE_CHOICE)은 보기 4개를 주고 정답은 보기 중 하나와 똑같이 쓰세요. \
         주관식(SHORT_ANSWER)은 한두 단어로 답할 수 있게 하세요.\n\n일기:\n{content}"
    )
}

fn parse_questions(value: &Value) -> Vec<QuizQuestion> {
    value
        .get("questions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<QuizQuestion>(item.clone()).ok())
                .filter(QuizQuestion::is_usable)
                .take(QUESTIONS_PER_QUIZ)
                .collect()
        })
        .unwrap_or_default()
}

async fn write_if_ungraded(
    proxy: &StoreProxy,
    owner_id: &str,
    entry_id: &str,
    patch: Map<String, Value>,
) -> ServiceResult<()> {
    let applied = proxy
        .store()
        .merge_if(
            &proxy.paths().journal(owner_id, entry_id),
            Precondition::field_missing("quizResult"),
            patch,
        )
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => ServiceError::NotFound("일기"),
            other => other.into(),
        })?;

    if applied {
        Ok(())
    } else {
        Err(ServiceError::Conflict("이미 채점된 퀴즈입니다".to_string()))
    }
}

/// Attaches freshly generated questions, replacing earlier ones while the
/// quiz is still ungraded.
pub async fn generate_quiz(
    proxy: &StoreProxy,
    generator: &dyn ContentGenerator,
    owner: &Account,
    entry_id: &str,
) -> ServiceResult<JournalEntry> {
    let entry = load(proxy, &owner.user_id, entry_id).await?;
    if entry.quiz_result.is_some() {
        return Err(ServiceError::Conflict("이미 채점된 퀴즈입니다".to_string()));
    }

    let value = generator
        .generate_structured(&quiz_prompt(&entry.content), &quiz_schema())
        .await
        .map_err(|source| ServiceError::Generation {
            fallback: QUIZ_FALLBACK,
            source,
        })?;

    let questions = parse_questions(&value);
    if questions.is_empty() {
        return Err(ServiceError::Generation {
            fallback: QUIZ_FALLBACK,
            source: GenerationError::Malformed("no usable questions in response".to_string()),
        });
    }

    let mut patch = Map::new();
    patch.insert("questions".into(), serde_json::to_value(&questions).map_err(StoreError::from)?);
    write_if_ungraded(proxy, &owner.user_id, entry_id, patch).await?;

    tracing::info!(owner_id = %owner.user_id, entry_id, count = questions.len(), "quiz attached");
    Ok(JournalEntry { questions, ..entry })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub result: QuizResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

/// Grades one attempt; later attempts on the same entry are rejected.
pub async fn grade_quiz(
    proxy: &StoreProxy,
    owner: &Account,
    entry_id: &str,
    answers: Vec<String>,
) -> ServiceResult<QuizOutcome> {
    let entry = load(proxy, &owner.user_id, entry_id).await?;
    if entry.questions.is_empty() {
        return Err(ServiceError::Validation("아직 퀴즈가 없습니다".to_string()));
    }
    if answers.len() != entry.questions.len() {
        return Err(ServiceError::Validation(format!(
            "답을 {}개 입력해 주세요",
            entry.questions.len()
        )));
    }
    if entry.quiz_result.is_some() {
        return Err(ServiceError::Conflict("이미 채점된 퀴즈입니다".to_string()));
    }

    let correct = entry
        .questions
        .iter()
        .zip(&answers)
        .filter(|(question, given)| answers_match(given, &question.answer))
        .count();
    let result = QuizResult {
        total: entry.questions.len(),
        correct,
        answers,
        graded_at: now_ms(),
    };

    let mut patch = Map::new();
    patch.insert("quizResult".into(), serde_json::to_value(&result).map_err(StoreError::from)?);
    write_if_ungraded(proxy, &owner.user_id, entry_id, patch).await?;

    let delta = quiz_reward(correct);
    let profile = if delta.is_empty() {
        None
    } else {
        profile::apply_reward(proxy, &owner.user_id, &owner.user_id, &delta).await?
    };

    tracing::info!(owner_id = %owner.user_id, entry_id, correct, total = result.total, "quiz graded");
    Ok(QuizOutcome { result, profile })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::MockGenerator;
    use crate::services::profile::{ensure_profile, get};
    use crate::services::testing::{proxy, student, teacher};

    fn quiz_reply() -> String {
        json!({ "questions": [
            { "question": "누구와 놀았나요?", "type": "SHORT_ANSWER", "answer": "지호", "explanation": "" },
            { "question": "어디에 갔나요?", "type": "MULTIPLE_CHOICE", "options": ["공원", "바다", "산", "학교"], "answer": "공원", "explanation": "" },
            { "question": "보기가 없는 객관식", "type": "MULTIPLE_CHOICE", "options": [], "answer": "x", "explanation": "" },
            { "question": "무엇을 먹었나요?", "type": "SHORT_ANSWER", "answer": "Ice cream", "explanation": "" }
        ]})
        .to_string()
    }

    async fn entry_with_quiz(proxy: &StoreProxy, generator: &MockGenerator) -> JournalEntry {
        let owner = student("s1");
        let created = create_entry(proxy, generator, &owner, "지호와 공원에서 놀았다.").await.unwrap();
        generator.push_reply(quiz_reply());
        generate_quiz(proxy, generator, &owner, &created.entry.id).await.unwrap()
    }

    #[test]
    fn test_answers_match_ignores_case_and_space() {
        assert!(answers_match("  ICE cream ", "ice Cream"));
        assert!(!answers_match("ice", "ice cream"));
    }

    #[tokio::test]
    async fn test_create_entry_rewards_owner() {
        let proxy = proxy();
        let owner = student("s1");
        ensure_profile(&proxy, &owner).await.unwrap();
        let generator = MockGenerator::new("m").with_default_text("잘 했어요");

        let outcome = create_entry(&proxy, &generator, &owner, "  오늘은 비가 왔다.  ").await.unwrap();
        assert_eq!(outcome.entry.content, "오늘은 비가 왔다.");
        assert_eq!(outcome.entry.ai_feedback, "잘 했어요");

        let profile = get(&proxy, "s1").await.unwrap();
        assert_eq!(profile.xp, 10);
        assert_eq!(profile.skill("문해력"), 1);
    }

    #[tokio::test]
    async fn test_feedback_failure_uses_fallback() {
        let proxy = proxy();
        let generator = MockGenerator::default();
        generator.push_failure("timeout");

        let outcome = create_entry(&proxy, &generator, &student("s1"), "일기").await.unwrap();
        assert_eq!(outcome.entry.ai_feedback, FEEDBACK_FALLBACK);
        // no profile yet: the reward is skipped, the entry still exists
        assert!(outcome.profile.is_none());
        assert_eq!(list(&proxy, &student("s1"), "s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_entry_rejected() {
        let proxy = proxy();
        let err = create_entry(&proxy, &MockGenerator::default(), &student("s1"), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_quiz_keeps_usable_questions() {
        let proxy = proxy();
        let generator = MockGenerator::default();
        let entry = entry_with_quiz(&proxy, &generator).await;

        assert_eq!(entry.questions.len(), QUESTIONS_PER_QUIZ);
        assert!(entry.questions.iter().all(QuizQuestion::is_usable));
        assert_eq!(entry.questions[2].answer, "Ice cream");
    }

    #[tokio::test]
    async fn test_grade_quiz_once() {
        let proxy = proxy();
        let owner = student("s1");
        ensure_profile(&proxy, &owner).await.unwrap();
        let generator = MockGenerator::default();
        let entry = entry_with_quiz(&proxy, &generator).await;

        let answers = vec!["지호".to_string(), "바다".to_string(), " ice CREAM".to_string()];
        let outcome = grade_quiz(&proxy, &owner, &entry.id, answers.clone()).await.unwrap();
        assert_eq!(outcome.result.correct, 2);
        assert_eq!(outcome.result.total, 3);

        let profile = get(&proxy, "s1").await.unwrap();
        assert_eq!(profile.xp, 10 + 2 * 5);
        assert_eq!(profile.skill("문해력"), 1 + 2);

        let err = grade_quiz(&proxy, &owner, &entry.id, answers).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(get(&proxy, "s1").await.unwrap().xp, 20);

        generator.push_reply(quiz_reply());
        assert!(matches!(
            generate_quiz(&proxy, &generator, &owner, &entry.id).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_grade_requires_matching_answer_count() {
        let proxy = proxy();
        let generator = MockGenerator::default();
        let entry = entry_with_quiz(&proxy, &generator).await;

        let err = grade_quiz(&proxy, &student("s1"), &entry.id, vec!["지호".into()]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_quiz_generation_failure() {
        let proxy = proxy();
        let generator = MockGenerator::default();
        let owner = student("s1");
        let created = create_entry(&proxy, &generator, &owner, "일기").await.unwrap();

        generator.push_reply(json!({ "questions": [] }).to_string());
        let err = generate_quiz(&proxy, &generator, &owner, &created.entry.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Generation { fallback: QUIZ_FALLBACK, .. }));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_access() {
        let proxy = proxy();
        let generator = MockGenerator::default();
        let owner = student("s1");
        let first = create_entry(&proxy, &generator, &owner, "하나").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = create_entry(&proxy, &generator, &owner, "둘").await.unwrap();

        let entries = list(&proxy, &teacher(), "s1").await.unwrap();
        assert_eq!(entries[0].id, second.entry.id);
        assert_eq!(entries[1].id, first.entry.id);

        assert!(matches!(
            list(&proxy, &student("s2"), "s1").await,
            Err(ServiceError::Forbidden)
        ));
    }
}
