use std::fmt;

use chrono::{DateTime, Utc};
use folio_core::model::{Difficulty, QuestionDraft, StepDraft, TemplateDraft, User, UserId};
use storage::repository::{Storage, StorageError};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    user_name: String,
    slug: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidSlug { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSlug { raw } => write!(f, "invalid --slug value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("BUILDFOLIO_DB_URL")
            .unwrap_or_else(|_| "sqlite://buildfolio.sqlite3?mode=rwc".into());
        let mut user_id = std::env::var("BUILDFOLIO_SEED_USER")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let mut user_name = "Demo Learner".to_owned();
        let mut slug = "todo-api".to_owned();
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = UserId::new(parsed);
                }
                "--user-name" => {
                    user_name = require_value(&mut args, "--user-name")?;
                }
                "--slug" => {
                    let value = require_value(&mut args, "--slug")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidSlug { raw: value });
                    }
                    slug = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            user_name,
            slug,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://buildfolio.sqlite3?mode=rwc)");
    eprintln!("  --user-id <id>            Demo user id (default: 1)");
    eprintln!("  --user-name <name>        Demo user display name (default: Demo Learner)");
    eprintln!("  --slug <slug>             Template slug to create (default: todo-api)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  BUILDFOLIO_DB_URL, BUILDFOLIO_SEED_USER");
}

/// Seven steps, two questions each; the correct answer is always option 0.
const STEPS: [(&str, &str); 7] = [
    ("Project setup", "Create the workspace and pick a web framework."),
    ("Data model", "Define the todo item and its states."),
    ("Persistence", "Store todos in SQLite."),
    ("HTTP routes", "Expose create, list, update and delete."),
    ("Validation", "Reject empty titles and unknown ids."),
    ("Testing", "Cover the routes with integration tests."),
    ("Deployment", "Ship a container image."),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    storage
        .users
        .upsert_user(&User::new(args.user_id, args.user_name.clone())?)
        .await?;

    if storage.templates.get_template_by_slug(&args.slug).await?.is_some() {
        println!("Template {} already exists in {}", args.slug, args.db_url);
        return Ok(());
    }

    let draft = TemplateDraft {
        slug: args.slug.clone(),
        title: "Todo API".into(),
        description: Some("Build a small REST service from scratch.".into()),
        difficulty: Difficulty::Beginner,
        technologies: vec!["rust".into(), "sqlite".into(), "http".into()],
    };
    let template = match storage.templates.insert_template(draft.validate(now)?).await {
        Ok(template) => template,
        Err(StorageError::Conflict) => {
            println!("Template {} was created concurrently", args.slug);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    for (title, body) in STEPS {
        let step = storage
            .templates
            .append_step(
                StepDraft {
                    template_id: template.id(),
                    title: title.into(),
                    body: body.into(),
                }
                .validate()?,
            )
            .await?;
        for n in 1..=2 {
            storage
                .quizzes
                .add_question(
                    QuestionDraft {
                        step_id: step.id,
                        prompt: format!("{title}: check {n}"),
                        options: vec!["Right".into(), "Wrong".into(), "Also wrong".into()],
                        correct_index: 0,
                    }
                    .validate()?,
                )
                .await?;
        }
    }

    storage
        .instances
        .start_instance(args.user_id, template.id(), now)
        .await?;

    println!(
        "Seeded template {} ({} steps) and user {} into {}",
        template.slug(),
        STEPS.len(),
        args.user_id.value(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
