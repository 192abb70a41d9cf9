use chrono::Utc;
use registrar_core::{AppError, AppResult};
use registrar_db::{StoreTx, constraints};
use registrar_models::{CreateSubjectDto, Subject, SubjectId};
use tracing::{info, instrument};
use validator::Validate;

use crate::modules::people::PeopleService;
use crate::state::AppState;
use crate::utils::retry::with_retry;

pub struct SubjectService;

impl SubjectService {
    pub(crate) async fn require_subject(tx: &mut dyn StoreTx, id: SubjectId) -> AppResult<Subject> {
        tx.subject(id)
            .await?
            .ok_or_else(|| AppError::not_found("Subject", id))
    }

    #[instrument(skip(state))]
    pub async fn create_subject(state: &AppState, dto: CreateSubjectDto) -> AppResult<Subject> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "create_subject", || async move {
            let mut tx = state.begin().await?;
            if let Some(teacher_id) = dto.default_teacher_id {
                PeopleService::require_teacher(tx.as_mut(), teacher_id).await?;
            }

            let now = Utc::now();
            let subject = Subject {
                id: SubjectId::new(),
                name: dto.name.clone(),
                code: dto.code.clone(),
                description: dto.description.clone(),
                coefficient: dto.coefficient,
                default_teacher_id: dto.default_teacher_id,
                is_active: dto.is_active,
                created_at: now,
                updated_at: now,
            };
            tx.insert_subject(&subject)
                .await
                .map_err(|e| match e.violated_constraint() {
                    Some(constraints::SUBJECTS_NAME) => AppError::conflict(format!(
                        "A subject named {} already exists",
                        dto.name
                    )),
                    Some(constraints::SUBJECTS_CODE) => AppError::conflict(format!(
                        "A subject with code {} already exists",
                        dto.code
                    )),
                    _ => e.into(),
                })?;
            tx.commit().await?;

            info!(subject_id = %subject.id, code = %subject.code, "Subject created");
            Ok(subject)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn get_subject(state: &AppState, id: SubjectId) -> AppResult<Subject> {
        let mut tx = state.begin().await?;
        Self::require_subject(tx.as_mut(), id).await
    }

    #[instrument(skip(state))]
    pub async fn list_subjects(state: &AppState) -> AppResult<Vec<Subject>> {
        let mut tx = state.begin().await?;
        Ok(tx.subjects().await?)
    }
}
