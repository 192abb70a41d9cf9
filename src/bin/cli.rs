use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use dotenvy::dotenv;
use registrar::AppState;
use registrar::cli::seeder::{SeedConfig, clear_seeded_data, seed_database};
use registrar::cli::{connect, format_report_card, format_timetable, migrate};
use registrar::modules::{CalendarService, CurriculumService, EnrollmentService, GradingService};
use registrar_config::{DatabaseConfig, LoggingConfig};
use registrar_db::PgPool;
use registrar_models::{
    AcademicYearId, ClassId, CreateEnrollmentDto, EnrollmentId, EnrollmentStatus, PeriodId,
    StudentId, TransitionEnrollmentDto,
};
use registrar_observability::init_logging;

#[derive(Parser)]
#[command(name = "registrar-cli")]
#[command(about = "Registrar CLI - Administrative tools for the Registrar rules engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Seed the database with a fake academic year
    Seed {
        /// Number of classes to create
        #[arg(short = 'c', long, default_value = "3")]
        classes: usize,

        /// Number of students per class (also the class capacity)
        #[arg(short = 's', long, default_value = "10")]
        students: usize,

        /// Number of teachers
        #[arg(short = 't', long, default_value = "4")]
        teachers: usize,

        /// Number of grades per student and subject
        #[arg(short = 'g', long, default_value = "2")]
        grades: usize,
    },
    /// Make an academic year the current one
    SetCurrentYear {
        /// Academic year id
        id: AcademicYearId,
    },
    /// Make a period the current one of its academic year
    SetCurrentPeriod {
        /// Period id
        id: PeriodId,
    },
    /// Enroll a student into a class
    Enroll {
        #[arg(long)]
        student: StudentId,

        #[arg(long)]
        class: ClassId,

        #[arg(long)]
        year: AcademicYearId,

        /// Enrollment date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Move an enrollment to transferred, graduated or withdrawn
    Transition {
        /// Enrollment id
        enrollment: EnrollmentId,

        /// New status
        #[arg(long)]
        status: EnrollmentStatus,

        /// Target class of a transfer
        #[arg(long)]
        target_class: Option<ClassId>,

        /// Effective date of a transfer (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the report card of an enrollment
    ReportCard {
        /// Enrollment id
        enrollment: EnrollmentId,

        /// Restrict to one period
        #[arg(long)]
        period: Option<PeriodId>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the weekly timetable of a class
    Timetable {
        /// Class id
        class: ClassId,
    },
    /// Clear all seeded data
    ClearSeed {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging(&LoggingConfig::from_env());

    let cli = Cli::parse();

    let (pool, state) = match connect(&DatabaseConfig::from_env()).await {
        Ok(connected) => connected,
        Err(e) => fail("Error connecting to database", format!("{:#}", e)),
    };

    match cli.command {
        Commands::Migrate => handle_migrate(&pool).await,
        Commands::Seed {
            classes,
            students,
            teachers,
            grades,
        } => {
            let config = SeedConfig {
                classes,
                students_per_class: students,
                teachers,
                grades_per_subject: grades,
            };
            handle_seed(&state, config).await
        }
        Commands::SetCurrentYear { id } => handle_set_current_year(&state, id).await,
        Commands::SetCurrentPeriod { id } => handle_set_current_period(&state, id).await,
        Commands::Enroll {
            student,
            class,
            year,
            date,
        } => {
            let dto = CreateEnrollmentDto {
                student_id: student,
                class_id: class,
                academic_year_id: year,
                enrollment_date: date,
            };
            handle_enroll(&state, dto).await
        }
        Commands::Transition {
            enrollment,
            status,
            target_class,
            date,
        } => {
            let dto = TransitionEnrollmentDto {
                status,
                target_class_id: target_class,
                effective_date: date,
            };
            handle_transition(&state, enrollment, dto).await
        }
        Commands::ReportCard {
            enrollment,
            period,
            json,
        } => handle_report_card(&state, enrollment, period, json).await,
        Commands::Timetable { class } => handle_timetable(&state, class).await,
        Commands::ClearSeed { yes } => handle_clear_seed(&pool, yes).await,
    }
}

async fn handle_migrate(pool: &PgPool) {
    match migrate(pool).await {
        Ok(()) => println!("✅ Migrations applied"),
        Err(e) => fail("Error running migrations", format!("{:#}", e)),
    }
}

async fn handle_seed(state: &AppState, config: SeedConfig) {
    if let Err(e) = seed_database(state, config).await {
        fail("Error seeding database", format!("{:#}", e));
    }
}

async fn handle_set_current_year(state: &AppState, id: AcademicYearId) {
    match CalendarService::set_current_year(state, id).await {
        Ok(year) => println!("✅ Academic year {} is now current", year.label()),
        Err(e) => fail("Error setting current year", e),
    }
}

async fn handle_set_current_period(state: &AppState, id: PeriodId) {
    match CalendarService::set_current_period(state, id).await {
        Ok(period) => println!("✅ Period {} is now current", period.name),
        Err(e) => fail("Error setting current period", e),
    }
}

async fn handle_enroll(state: &AppState, dto: CreateEnrollmentDto) {
    match EnrollmentService::enroll(state, dto).await {
        Ok(enrollment) => {
            println!("✅ Student enrolled");
            println!("   Enrollment: {}", enrollment.id);
            println!("   Date: {}", enrollment.enrollment_date);
        }
        Err(e) => fail("Error enrolling student", e),
    }
}

async fn handle_transition(state: &AppState, id: EnrollmentId, dto: TransitionEnrollmentDto) {
    match EnrollmentService::transition_status(state, id, dto).await {
        Ok(outcome) => {
            let enrollment = outcome.enrollment;
            println!("✅ Enrollment {} is now {}", enrollment.id, enrollment.status);
            if let Some(transfer) = outcome.transfer {
                println!(
                    "   Moved from class {} to {} on {}",
                    transfer.from_class_id, transfer.to_class_id, transfer.effective_date
                );
            }
        }
        Err(e) => fail("Error changing enrollment status", e),
    }
}

async fn handle_report_card(
    state: &AppState,
    enrollment: EnrollmentId,
    period: Option<PeriodId>,
    json: bool,
) {
    let card = match GradingService::report_card(state, enrollment, period).await {
        Ok(card) => card,
        Err(e) => fail("Error building report card", e),
    };

    if json {
        match serde_json::to_string_pretty(&card) {
            Ok(text) => println!("{}", text),
            Err(e) => fail("Error serializing report card", e),
        }
    } else {
        print!("{}", format_report_card(&card));
    }
}

async fn handle_timetable(state: &AppState, class: ClassId) {
    match CurriculumService::class_timetable(state, class).await {
        Ok(slots) if slots.is_empty() => println!("No lessons scheduled"),
        Ok(slots) => print!("{}", format_timetable(&slots)),
        Err(e) => fail("Error loading timetable", e),
    }
}

async fn handle_clear_seed(pool: &PgPool, yes: bool) {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete every academic year, subject and seeded profile?")
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("Aborted.");
            return;
        }
    }

    if let Err(e) = clear_seeded_data(pool).await {
        fail("Error clearing seeded data", format!("{:#}", e));
    }
}
