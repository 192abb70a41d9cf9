use chrono::Utc;
use registrar_core::{AppError, AppResult, RuleViolation};
use registrar_db::{StoreTx, constraints};
use registrar_models::{
    AcademicYearId, Class, ClassId, ClassWithStats, CreateClassDto, UpdateClassDto,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::modules::calendar::CalendarService;
use crate::state::AppState;
use crate::utils::retry::{on_constraint, with_retry};

pub struct ClassService;

fn name_taken(name: &str) -> AppError {
    AppError::conflict(format!(
        "A class named {} already exists in this academic year",
        name
    ))
}

impl ClassService {
    pub(crate) async fn require_class(tx: &mut dyn StoreTx, id: ClassId) -> AppResult<Class> {
        tx.class(id)
            .await?
            .ok_or_else(|| AppError::not_found("Class", id))
    }

    /// Like [`Self::require_class`], holding the class against concurrent
    /// capacity changes until the transaction ends.
    pub(crate) async fn lock_class(tx: &mut dyn StoreTx, id: ClassId) -> AppResult<Class> {
        tx.lock_class(id)
            .await?
            .ok_or_else(|| AppError::not_found("Class", id))
    }

    #[instrument(skip(state))]
    pub async fn create_class(state: &AppState, dto: CreateClassDto) -> AppResult<Class> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "create_class", || async move {
            let mut tx = state.begin().await?;
            CalendarService::require_year(tx.as_mut(), dto.academic_year_id).await?;

            let now = Utc::now();
            let class = Class {
                id: ClassId::new(),
                name: dto.name.clone(),
                level: dto.level.clone(),
                capacity: dto.capacity,
                academic_year_id: dto.academic_year_id,
                created_at: now,
                updated_at: now,
            };
            tx.insert_class(&class).await.map_err(|e| {
                on_constraint(e, constraints::CLASSES_NAME_YEAR, || name_taken(&dto.name))
            })?;
            tx.commit().await?;

            info!(class_id = %class.id, name = %class.name, "Class created");
            Ok(class)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn get_class(state: &AppState, id: ClassId) -> AppResult<Class> {
        let mut tx = state.begin().await?;
        Self::require_class(tx.as_mut(), id).await
    }

    /// Classes of one academic year, with their current occupancy.
    #[instrument(skip(state))]
    pub async fn list_classes(
        state: &AppState,
        year: AcademicYearId,
    ) -> AppResult<Vec<ClassWithStats>> {
        let mut tx = state.begin().await?;
        CalendarService::require_year(tx.as_mut(), year).await?;

        let classes = tx.classes_for_year(year).await?;
        let mut stats = Vec::with_capacity(classes.len());
        for class in classes {
            let occupancy = tx.count_seated_enrollments(class.id).await?;
            stats.push(ClassWithStats::new(class, occupancy));
        }
        Ok(stats)
    }

    /// Renames a class or changes its level or capacity. Capacity can never
    /// drop below the number of seats taken.
    #[instrument(skip(state))]
    pub async fn update_class(
        state: &AppState,
        id: ClassId,
        dto: UpdateClassDto,
    ) -> AppResult<Class> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "update_class", || async move {
            let mut tx = state.begin().await?;
            let mut class = Self::lock_class(tx.as_mut(), id).await?;

            if let Some(capacity) = dto.capacity {
                let occupancy = tx.count_seated_enrollments(id).await?;
                if occupancy > i64::from(capacity) {
                    return Err(RuleViolation::CapacityExceeded {
                        class_id: id.into_inner(),
                        capacity,
                        occupancy,
                    }
                    .into());
                }
                class.capacity = capacity;
            }
            if let Some(name) = &dto.name {
                class.name = name.clone();
            }
            if let Some(level) = &dto.level {
                class.level = level.clone();
            }
            class.updated_at = Utc::now();

            tx.update_class(&class).await.map_err(|e| {
                on_constraint(e, constraints::CLASSES_NAME_YEAR, || name_taken(&class.name))
            })?;
            tx.commit().await?;

            info!(class_id = %id, "Class updated");
            Ok(class)
        })
        .await
    }
}
