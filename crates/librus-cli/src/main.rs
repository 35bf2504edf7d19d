use std::fmt::Display;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use librus::scraper;
use librus::{Credentials, Session};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "librus")]
#[command(about = "Read grades and calendar events from Librus Synergia", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text",
        global = true,
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(long, env = "LIBRUS_LOGIN", global = true, help = "Librus Synergia login")]
    login: Option<String>,

    #[arg(
        long,
        env = "LIBRUS_PASS",
        hide_env_values = true,
        global = true,
        help = "Librus Synergia password"
    )]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the student's name, class, register number, educator and login
    Profile,
    /// List every recorded grade in page order
    Grades,
    /// List subjects with their raw grade cells
    Subjects,
    /// Show the final grade of every subject
    FinalGrades,
    /// List teachers who recorded at least one grade
    Teachers,
    /// Split one subject's grades into first and second semester
    Semester {
        #[arg(help = "Subject name as shown on the grades page")]
        subject: String,
    },
    /// Show this month's calendar
    Calendar,
    /// Show today's calendar events
    Today,
    /// Check whether a test is scheduled today
    TestToday,
    /// Collect profile, grades and calendar into one export bundle
    Summary {
        #[arg(
            long,
            default_value = "Matematyka",
            help = "Subject to include as a semester view"
        )]
        subject: String,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| {
        log::error!("Error {}: {}", context, e);
        process::exit(1);
    })
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let credentials = match (cli.login.as_deref(), cli.password.as_deref()) {
        (Some(login), Some(password)) => Credentials::new(login, password),
        _ => {
            log::error!(
                "Missing credentials: pass --login/--password or set LIBRUS_LOGIN/LIBRUS_PASS"
            );
            process::exit(1);
        }
    };

    let mut session = or_exit(Session::new(), "creating session");
    or_exit(session.login(&credentials), "logging in");
    drop(credentials);

    let format = cli.format;
    match cli.command {
        Commands::Profile => {
            let profile = or_exit(scraper::fetch_profile(&session), "fetching profile");
            match format {
                OutputFormat::Json => serialize_json(&profile),
                OutputFormat::Text => println!("{}", profile),
            }
        }

        Commands::Grades => {
            let page = or_exit(scraper::fetch_grades(&session), "fetching grades");
            match format {
                OutputFormat::Json => serialize_json(&page.entries),
                OutputFormat::Text => {
                    if page.entries.is_empty() {
                        println!("No grades to display.");
                    }
                    for (i, entry) in page.entries.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, entry);
                    }
                }
            }
        }

        Commands::Subjects => {
            let page = or_exit(scraper::fetch_grades(&session), "fetching grades");
            match format {
                OutputFormat::Json => serialize_json(&page.sheet),
                OutputFormat::Text => {
                    for subject in page.sheet.iter() {
                        let cells: Vec<String> =
                            subject.grades.iter().map(|g| g.replace('\n', ",")).collect();
                        println!("{}: {}", subject.name, cells.join(" | "));
                    }
                }
            }
        }

        Commands::FinalGrades => {
            let page = or_exit(scraper::fetch_grades(&session), "fetching grades");
            let finals = page.final_grades();
            match format {
                OutputFormat::Json => serialize_json(&finals),
                OutputFormat::Text => {
                    for fin in &finals {
                        println!("{:<30} {}", fin.subject, fin.grade);
                    }
                }
            }
        }

        Commands::Teachers => {
            let page = or_exit(scraper::fetch_grades(&session), "fetching grades");
            let teachers = page.teachers();
            match format {
                OutputFormat::Json => serialize_json(&teachers),
                OutputFormat::Text => {
                    for teacher in &teachers {
                        println!(
                            "{} ({} grade(s))",
                            teacher,
                            page.entries_by_teacher(teacher).len()
                        );
                    }
                }
            }
        }

        Commands::Semester { subject } => {
            let page = or_exit(scraper::fetch_grades(&session), "fetching grades");
            let view = or_exit(page.semester_view(&subject), "building semester view");
            match format {
                OutputFormat::Json => serialize_json(&view),
                OutputFormat::Text => println!("{}\n{}", subject, view),
            }
        }

        Commands::Calendar => {
            let month = or_exit(scraper::fetch_calendar(&session), "fetching calendar");
            match format {
                OutputFormat::Json => serialize_json(&month),
                OutputFormat::Text => println!("{}", month),
            }
        }

        Commands::Today => {
            let month = or_exit(scraper::fetch_calendar(&session), "fetching calendar");
            let events = or_exit(month.today_events(), "reading today's events");
            match format {
                OutputFormat::Json => serialize_json(&events),
                OutputFormat::Text => {
                    if events.is_empty() {
                        println!("No events today.");
                    }
                    for event in events {
                        println!("- {}", event);
                    }
                }
            }
        }

        Commands::TestToday => {
            let month = or_exit(scraper::fetch_calendar(&session), "fetching calendar");
            let test_today = or_exit(month.is_test_today(), "checking today's events");
            match format {
                OutputFormat::Json => serialize_json(&test_today),
                OutputFormat::Text => println!("{}", if test_today { "yes" } else { "no" }),
            }
        }

        Commands::Summary { subject } => {
            let bundle = or_exit(scraper::fetch_bundle(&session, &subject), "collecting summary");
            match format {
                OutputFormat::Json => serialize_json(&bundle),
                OutputFormat::Text => {
                    println!("{}", bundle.profile);
                    println!("Teachers: {}", bundle.teachers.join(", "));
                    println!("Subjects: {}", bundle.grades.names().join(", "));
                    if let Some(view) = &bundle.subject_semester_view {
                        println!("\n{}\n{}", subject, view);
                    }
                    println!("\n{}", bundle.calendar_month);
                    match &bundle.today_events {
                        Some(events) => println!("Today: {} event(s)", events.len()),
                        None => println!("Today: no calendar entry"),
                    }
                }
            }
        }
    }
}
