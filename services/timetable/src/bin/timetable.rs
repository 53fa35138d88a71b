//! services/timetable/src/bin/timetable.rs

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use timetable_core::domain::{NewTask, Slot, Subject, SubjectId, SubjectInput, TaskId};
use timetable_core::ports::PersistenceService;
use timetable_lib::{
    adapters::{DbAdapter, LocalNotifier},
    config::Config,
    error::AppError,
    file_format::{export_to_path, import_from_path},
    grid::{WeeklyGrid, DAY_NAMES},
    tasks::TaskPlanner,
    transfer::{ReceiveController, SendController},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_COLOR: &str = "#4caf50";

#[derive(Parser)]
#[command(name = "timetable", about = "Weekly class timetable with tasks and code-based transfer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the weekly grid.
    Show,
    #[command(subcommand)]
    Subject(SubjectCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    /// Send or receive the timetable as a sequence of codes.
    #[command(subcommand)]
    Qr(QrCommand),
    #[command(subcommand)]
    File(FileCommand),
    /// Keep running and print task reminders as they come due.
    Watch,
}

#[derive(Args)]
struct SubjectFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    teacher: Option<String>,
    #[arg(long)]
    room: Option<String>,
    #[arg(long, default_value = DEFAULT_COLOR)]
    color: String,
    /// 0 = Monday ... 6 = Sunday
    #[arg(long)]
    day: u8,
    /// Starts at 1
    #[arg(long)]
    period: u32,
}

#[derive(Subcommand)]
enum SubjectCommand {
    Add(SubjectFields),
    Edit {
        id: SubjectId,
        #[command(flatten)]
        fields: SubjectFields,
    },
    Remove {
        id: SubjectId,
    },
    List,
}

#[derive(Subcommand)]
enum TaskCommand {
    Add {
        #[arg(long)]
        subject: SubjectId,
        #[arg(long)]
        due: NaiveDate,
        content: String,
    },
    List {
        #[arg(long)]
        subject: Option<SubjectId>,
    },
    Done {
        id: TaskId,
    },
    Reopen {
        id: TaskId,
    },
    Edit {
        id: TaskId,
        #[arg(long)]
        due: NaiveDate,
        content: String,
    },
    Remove {
        id: TaskId,
    },
}

#[derive(Subcommand)]
enum QrCommand {
    /// Page through the frames of the stored timetable.
    Send,
    /// Read scanned frames from stdin, one per line.
    Receive,
}

#[derive(Subcommand)]
enum FileCommand {
    Export { path: Option<PathBuf> },
    Import { path: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db = Arc::new(DbAdapter::connect(&config.database_url).await?);
    db.run_migrations().await?;

    // --- 3. Wire the Services ---
    let (reminder_tx, mut reminder_rx) = mpsc::unbounded_channel();
    let notifier = Arc::new(LocalNotifier::with_delivery(reminder_tx));
    let planner = TaskPlanner::new(db.clone(), notifier, config.reminder_hour);

    // --- 4. Run the Command ---
    match cli.command {
        Command::Show => {
            let timetable = db.export_all().await?;
            print!("{}", WeeklyGrid::build(&timetable));
            println!("Open tasks: {}", planner.incomplete_task_count().await?);
        }
        Command::Subject(command) => run_subject(&planner, db.as_ref(), command).await?,
        Command::Task(command) => run_task(&planner, command).await?,
        Command::Qr(QrCommand::Send) => {
            let sender = SendController::prepare(db.as_ref(), config.fragment_size).await?;
            page_frames(sender).await?;
        }
        Command::Qr(QrCommand::Receive) => {
            let mut receiver = ReceiveController::new(planner);
            let stdin = BufReader::new(tokio::io::stdin());
            receiver.run_console(stdin, &mut std::io::stdout()).await?;
        }
        Command::File(FileCommand::Export { path }) => {
            let path = path.unwrap_or(config.export_path);
            export_to_path(db.as_ref(), &path).await?;
            println!("Timetable written to {}", path.display());
        }
        Command::File(FileCommand::Import { path }) => {
            let path = path.unwrap_or(config.export_path);
            let expanded = import_from_path(&planner, &path).await?;
            println!(
                "Imported {} subjects and {} classes ({} left out).",
                expanded.data.subjects.len(),
                expanded.data.classes.len(),
                expanded.skipped.len()
            );
        }
        Command::Watch => {
            let armed = planner.rearm_reminders().await?;
            println!("Watching {armed} reminders. Press Ctrl-C to stop.");
            loop {
                tokio::select! {
                    Some(reminder) = reminder_rx.recv() => {
                        println!("[{}] {}: {}", reminder.at, reminder.title, reminder.body);
                        if let Err(e) = planner.reminder_delivered(&reminder.handle).await {
                            warn!(handle = %reminder.handle, "Failed to clear delivered reminder: {}", e);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            info!("Stopped watching reminders.");
        }
    }
    Ok(())
}

async fn run_subject(
    planner: &TaskPlanner,
    db: &dyn PersistenceService,
    command: SubjectCommand,
) -> Result<(), AppError> {
    match command {
        SubjectCommand::Add(fields) => {
            let slot = Slot {
                day_of_week: fields.day,
                period: fields.period,
            };
            let id = planner.add_subject(subject_input(fields), slot).await?;
            println!("Added subject {id}.");
        }
        SubjectCommand::Edit { id, fields } => {
            let slot = Slot {
                day_of_week: fields.day,
                period: fields.period,
            };
            let input = subject_input(fields);
            let subject = Subject {
                id,
                name: input.name,
                teacher: input.teacher,
                room: input.room,
                color: input.color,
            };
            planner.update_subject(subject, slot).await?;
            println!("Updated subject {id}.");
        }
        SubjectCommand::Remove { id } => {
            planner.delete_subject(id).await?;
            println!("Removed subject {id} with its classes and tasks.");
        }
        SubjectCommand::List => {
            let timetable = db.export_all().await?;
            let open = planner.incomplete_counts_by_subject().await?;
            for subject in &timetable.subjects {
                let slots: Vec<String> = timetable
                    .classes
                    .iter()
                    .filter(|c| c.subject_id == subject.id)
                    .map(|c| format!("{} {}", day_name(c.day_of_week), c.period))
                    .collect();
                println!(
                    "{:>4}  {:<24} {:<16} {:<8} [{}] open tasks: {}",
                    subject.id,
                    subject.name,
                    subject.teacher.as_deref().unwrap_or("-"),
                    subject.room.as_deref().unwrap_or("-"),
                    slots.join(", "),
                    open.get(&subject.id).copied().unwrap_or(0)
                );
            }
        }
    }
    Ok(())
}

async fn run_task(planner: &TaskPlanner, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add {
            subject,
            due,
            content,
        } => {
            let id = planner
                .add_task(NewTask {
                    subject_id: subject,
                    content,
                    due_date: due,
                })
                .await?;
            println!("Added task {id}.");
        }
        TaskCommand::List { subject: Some(id) } => {
            for task in planner.tasks_for_subject(id).await? {
                println!(
                    "{:>4}  [{}] {}  {}",
                    task.id,
                    if task.is_done { "x" } else { " " },
                    task.due_date,
                    task.content
                );
            }
        }
        TaskCommand::List { subject: None } => {
            for entry in planner.all_tasks().await? {
                println!(
                    "{:>4}  [{}] {}  {:<20} {}",
                    entry.task.id,
                    if entry.task.is_done { "x" } else { " " },
                    entry.task.due_date,
                    entry.subject_name,
                    entry.task.content
                );
            }
        }
        TaskCommand::Done { id } => planner.set_done(id, true).await?,
        TaskCommand::Reopen { id } => planner.set_done(id, false).await?,
        TaskCommand::Edit { id, due, content } => planner.edit_task(id, &content, due).await?,
        TaskCommand::Remove { id } => planner.delete_task(id).await?,
    }
    Ok(())
}

fn subject_input(fields: SubjectFields) -> SubjectInput {
    SubjectInput {
        name: fields.name,
        teacher: fields.teacher,
        room: fields.room,
        color: fields.color,
    }
}

fn day_name(day_of_week: u8) -> &'static str {
    match DAY_NAMES.get(usize::from(day_of_week)).copied() {
        Some(name) => name,
        None if day_of_week == 5 => "Sat",
        None => "Sun",
    }
}

/// `n` (or enter) shows the next frame, `p` the previous one, `q` stops.
async fn page_frames(mut sender: SendController) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let (position, total) = sender.position();
        println!("--- {position} / {total} ---");
        println!("{}", sender.current());

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "q" => break,
            "p" => {
                sender.previous_frame();
            }
            _ => {
                sender.next_frame();
            }
        }
    }
    Ok(())
}
