//! Academic Calendar Authority.
//!
//! Owns the "current" academic year and the current period of each year.
//! Promotion always demotes the previous holder in the same transaction, so
//! a failure leaves the old selection in place.

use chrono::{NaiveDate, Utc};
use registrar_core::{AppError, AppResult, RuleViolation};
use registrar_db::{StoreTx, constraints};
use registrar_models::{
    AcademicYear, AcademicYearId, CreateAcademicYearDto, CreatePeriodDto, Period, PeriodId,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::state::AppState;
use crate::utils::retry::{on_constraint, with_retry};

pub struct CalendarService;

impl CalendarService {
    /// Fails with [`RuleViolation::InvalidRange`] unless `end > start`.
    pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), RuleViolation> {
        if end > start {
            Ok(())
        } else {
            Err(RuleViolation::InvalidRange { start, end })
        }
    }

    pub(crate) async fn require_year(
        tx: &mut dyn StoreTx,
        id: AcademicYearId,
    ) -> AppResult<AcademicYear> {
        tx.academic_year(id)
            .await?
            .ok_or_else(|| AppError::not_found("Academic year", id))
    }

    pub(crate) async fn require_period(tx: &mut dyn StoreTx, id: PeriodId) -> AppResult<Period> {
        tx.period(id)
            .await?
            .ok_or_else(|| AppError::not_found("Period", id))
    }

    #[instrument(skip(state))]
    pub async fn create_academic_year(
        state: &AppState,
        dto: CreateAcademicYearDto,
    ) -> AppResult<AcademicYear> {
        dto.validate()?;
        Self::validate_range(dto.start_date, dto.end_date)?;

        let dto = &dto;
        with_retry(&state.transactions, "create_academic_year", || async move {
            let mut tx = state.begin().await?;
            let now = Utc::now();
            if dto.is_current {
                tx.demote_academic_years(now).await?;
            }

            let year = AcademicYear {
                id: AcademicYearId::new(),
                start_date: dto.start_date,
                end_date: dto.end_date,
                is_current: dto.is_current,
                created_at: now,
                updated_at: now,
            };
            tx.insert_academic_year(&year).await.map_err(|e| {
                on_constraint(e, constraints::ACADEMIC_YEARS_ONE_CURRENT, || {
                    AppError::conflict("Another academic year was made current concurrently")
                })
            })?;
            tx.commit().await?;

            info!(year_id = %year.id, label = %year.label(), "Academic year created");
            Ok(year)
        })
        .await
    }

    /// Makes `id` the only current academic year.
    #[instrument(skip(state))]
    pub async fn set_current_year(state: &AppState, id: AcademicYearId) -> AppResult<AcademicYear> {
        with_retry(&state.transactions, "set_current_year", || async move {
            let mut tx = state.begin().await?;
            Self::require_year(tx.as_mut(), id).await?;

            let now = Utc::now();
            tx.demote_academic_years(now).await?;
            let year = tx
                .promote_academic_year(id, now)
                .await
                .map_err(|e| {
                    on_constraint(e, constraints::ACADEMIC_YEARS_ONE_CURRENT, || {
                        AppError::conflict("Another academic year was made current concurrently")
                    })
                })?
                .ok_or_else(|| AppError::not_found("Academic year", id))?;
            tx.commit().await?;

            info!(year_id = %id, "Current academic year changed");
            Ok(year)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn current_year(state: &AppState) -> AppResult<Option<AcademicYear>> {
        let mut tx = state.begin().await?;
        Ok(tx.current_academic_year().await?)
    }

    #[instrument(skip(state))]
    pub async fn list_years(state: &AppState) -> AppResult<Vec<AcademicYear>> {
        let mut tx = state.begin().await?;
        Ok(tx.academic_years().await?)
    }

    #[instrument(skip(state))]
    pub async fn get_year(state: &AppState, id: AcademicYearId) -> AppResult<AcademicYear> {
        let mut tx = state.begin().await?;
        Self::require_year(tx.as_mut(), id).await
    }

    /// Creates a period inside its academic year.
    ///
    /// Periods of one year may touch but never overlap. The period is not
    /// required to fall inside the year's own dates.
    #[instrument(skip(state))]
    pub async fn create_period(state: &AppState, dto: CreatePeriodDto) -> AppResult<Period> {
        dto.validate()?;
        Self::validate_range(dto.start_date, dto.end_date)?;

        let dto = &dto;
        with_retry(&state.transactions, "create_period", || async move {
            let mut tx = state.begin().await?;
            Self::require_year(tx.as_mut(), dto.academic_year_id).await?;

            let siblings = tx.periods_for_year(dto.academic_year_id).await?;
            if let Some(existing) = siblings
                .iter()
                .find(|p| p.overlaps(dto.start_date, dto.end_date))
            {
                return Err(RuleViolation::PeriodOverlap {
                    existing: existing.name.clone(),
                    start: dto.start_date,
                    end: dto.end_date,
                }
                .into());
            }

            let now = Utc::now();
            if dto.is_current {
                tx.demote_periods(dto.academic_year_id, now).await?;
            }

            let period = Period {
                id: PeriodId::new(),
                name: dto.name.clone(),
                academic_year_id: dto.academic_year_id,
                start_date: dto.start_date,
                end_date: dto.end_date,
                is_current: dto.is_current,
                created_at: now,
                updated_at: now,
            };
            tx.insert_period(&period).await.map_err(|e| {
                on_constraint(e, constraints::PERIODS_ONE_CURRENT_PER_YEAR, || {
                    AppError::conflict("Another period of this year was made current concurrently")
                })
            })?;
            tx.commit().await?;

            info!(period_id = %period.id, name = %period.name, "Period created");
            Ok(period)
        })
        .await
    }

    /// Makes `id` the current period of its own academic year. Periods of
    /// other years are left alone.
    #[instrument(skip(state))]
    pub async fn set_current_period(state: &AppState, id: PeriodId) -> AppResult<Period> {
        with_retry(&state.transactions, "set_current_period", || async move {
            let mut tx = state.begin().await?;
            let period = Self::require_period(tx.as_mut(), id).await?;

            let now = Utc::now();
            tx.demote_periods(period.academic_year_id, now).await?;
            let period = tx
                .promote_period(id, now)
                .await
                .map_err(|e| {
                    on_constraint(e, constraints::PERIODS_ONE_CURRENT_PER_YEAR, || {
                        AppError::conflict("Another period of this year was made current concurrently")
                    })
                })?
                .ok_or_else(|| AppError::not_found("Period", id))?;
            tx.commit().await?;

            info!(period_id = %id, year_id = %period.academic_year_id, "Current period changed");
            Ok(period)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn current_period(
        state: &AppState,
        year: AcademicYearId,
    ) -> AppResult<Option<Period>> {
        let mut tx = state.begin().await?;
        Self::require_year(tx.as_mut(), year).await?;
        Ok(tx.current_period(year).await?)
    }

    #[instrument(skip(state))]
    pub async fn list_periods(state: &AppState, year: AcademicYearId) -> AppResult<Vec<Period>> {
        let mut tx = state.begin().await?;
        Self::require_year(tx.as_mut(), year).await?;
        Ok(tx.periods_for_year(year).await?)
    }

    #[instrument(skip(state))]
    pub async fn get_period(state: &AppState, id: PeriodId) -> AppResult<Period> {
        let mut tx = state.begin().await?;
        Self::require_period(tx.as_mut(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

        assert!(CalendarService::validate_range(start, end).is_ok());
        assert_eq!(
            CalendarService::validate_range(end, start),
            Err(RuleViolation::InvalidRange {
                start: end,
                end: start
            })
        );
        assert!(CalendarService::validate_range(start, start).is_err());
    }
}
