//! Names of the uniqueness constraints both stores enforce.
//!
//! The PostgreSQL schema uses these exact names, so a violation reported by
//! either store can be matched against the same constants.

pub const ACADEMIC_YEARS_ONE_CURRENT: &str = "academic_years_one_current_idx";
pub const PERIODS_ONE_CURRENT_PER_YEAR: &str = "periods_one_current_per_year_idx";
pub const CLASSES_NAME_YEAR: &str = "classes_name_academic_year_key";
pub const SUBJECTS_NAME: &str = "subjects_name_key";
pub const SUBJECTS_CODE: &str = "subjects_code_key";
pub const PROFILES_EMAIL: &str = "profiles_email_key";
pub const TEACHERS_EMPLOYEE_ID: &str = "teachers_employee_id_key";
pub const STUDENTS_STUDENT_NUMBER: &str = "students_student_number_key";
pub const CLASS_SUBJECTS_CLASS_SUBJECT_PERIOD: &str = "class_subjects_class_subject_period_key";
/// One enrollment record per student and year, whatever its status.
pub const ENROLLMENTS_STUDENT_YEAR: &str = "enrollments_student_academic_year_key";
pub const ATTENDANCE_ENROLLMENT_SUBJECT_DATE: &str = "attendance_enrollment_subject_date_key";
