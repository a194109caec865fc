use folio_core::model::{
    AttemptId, Difficulty, InstanceId, NewQuizAttempt, ProjectTemplate, QuestionId, QuizAttempt,
    QuizQuestion, ShowcaseSubmission, StartedProject, Step, StepId, SubmissionId, TemplateId,
    UserId,
};
use folio_core::scoring::Score;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Any sqlx failure other than a uniqueness violation is a connection problem.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StorageError::NotFound
        }
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_col(row: &SqliteRow, col: &'static str) -> Result<u32, StorageError> {
    let v: i64 = row.try_get(col).map_err(ser)?;
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {col}: {v}")))
}

pub(crate) fn json_text<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

fn json_col<T: serde::de::DeserializeOwned>(
    row: &SqliteRow,
    col: &'static str,
) -> Result<T, StorageError> {
    let raw: String = row.try_get(col).map_err(ser)?;
    serde_json::from_str(&raw).map_err(ser)
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn template_id_from_i64(v: i64) -> Result<TemplateId, StorageError> {
    Ok(TemplateId::new(i64_to_u64("template_id", v)?))
}

pub(crate) fn step_id_from_i64(v: i64) -> Result<StepId, StorageError> {
    Ok(StepId::new(i64_to_u64("step_id", v)?))
}

pub(crate) fn map_template_row(row: &SqliteRow) -> Result<ProjectTemplate, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    ProjectTemplate::from_persisted(
        template_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get("slug").map_err(ser)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        Difficulty::parse(&difficulty).map_err(ser)?,
        json_col(row, "technologies")?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_step_row(row: &SqliteRow) -> Result<Step, StorageError> {
    Ok(Step {
        id: step_id_from_i64(row.try_get("id").map_err(ser)?)?,
        template_id: template_id_from_i64(row.try_get("template_id").map_err(ser)?)?,
        position: u32_col(row, "position")?,
        title: row.try_get("title").map_err(ser)?,
        body: row.try_get("body").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<QuizQuestion, StorageError> {
    Ok(QuizQuestion {
        id: QuestionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        step_id: step_id_from_i64(row.try_get("step_id").map_err(ser)?)?,
        position: u32_col(row, "position")?,
        prompt: row.try_get("prompt").map_err(ser)?,
        options: json_col(row, "options")?,
        correct_index: u32_col(row, "correct_index")?,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let score = Score::new(u32_col(row, "score")?).map_err(ser)?;
    let passed: bool = row.try_get("passed").map_err(ser)?;
    if passed != score.is_passing() {
        return Err(StorageError::Serialization(format!(
            "attempt passed flag disagrees with score {}",
            score.value()
        )));
    }
    let attempt = NewQuizAttempt::new(
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        step_id_from_i64(row.try_get("step_id").map_err(ser)?)?,
        json_col(row, "answers")?,
        score,
        row.try_get("attempted_at").map_err(ser)?,
    );
    Ok(attempt.assign_id(AttemptId::new(i64_to_u64(
        "id",
        row.try_get("id").map_err(ser)?,
    )?)))
}

/// Map a `started_projects` row plus its completed-step rows.
pub(crate) fn map_instance_row(
    row: &SqliteRow,
    completed: Vec<StepId>,
) -> Result<StartedProject, StorageError> {
    StartedProject::from_persisted(
        InstanceId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        template_id_from_i64(row.try_get("template_id").map_err(ser)?)?,
        completed,
        row.try_get("progress").map_err(ser)?,
        row.try_get("certificate_eligible").map_err(ser)?,
        row.try_get("certificate_issued_at").map_err(ser)?,
        row.try_get("in_progress_since").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
        i64_to_u64("version", row.try_get("version").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_submission_row(row: &SqliteRow) -> Result<ShowcaseSubmission, StorageError> {
    let repo_url: String = row.try_get("repo_url").map_err(ser)?;
    let demo_url: Option<String> = row.try_get("demo_url").map_err(ser)?;
    Ok(ShowcaseSubmission {
        id: SubmissionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        instance_id: InstanceId::new(i64_to_u64(
            "instance_id",
            row.try_get("instance_id").map_err(ser)?,
        )?),
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        template_id: template_id_from_i64(row.try_get("template_id").map_err(ser)?)?,
        repo_url: url::Url::parse(&repo_url).map_err(ser)?,
        demo_url: demo_url
            .map(|d| url::Url::parse(&d).map_err(ser))
            .transpose()?,
        description: row.try_get("description").map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}
