use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::sync::Arc;
use studio_fees::{
    config::{self, database},
    core::{
        dispatch::{DispatchOutcome, DispatchResult, Dispatcher},
        fee::{self, FeeQuery},
        ledger::BillingPeriod,
        message::format_amount,
        reminder::ReminderLedger,
        report, student,
    },
    entities::FeeStatus,
    errors::Result,
    notify::LogSender,
    store::{FeeStore, NewStudent, SeaOrmStore},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fee ledger and payment reminders for the studio
#[derive(Debug, Parser)]
#[command(name = "studio-fees", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Month and year; either defaults to the current one.
#[derive(Debug, Clone, Copy, clap::Args)]
struct PeriodArgs {
    /// Billing month (1-12)
    #[arg(long)]
    month: Option<u32>,
    /// Billing year
    #[arg(long)]
    year: Option<i32>,
}

impl PeriodArgs {
    fn resolve(self) -> Result<BillingPeriod> {
        BillingPeriod::resolve(self.month, self.year)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dashboard figures: head count, amounts due, outstanding and received
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// List students with pending fees and whether they were reminded
    Unpaid {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Send one payment reminder
    Remind {
        admission_number: String,
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Remind every student with a pending balance
    RemindAll {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// List or search students
    Students {
        #[arg(long)]
        query: Option<String>,
        /// Include deactivated students
        #[arg(long)]
        all: bool,
    },
    /// Enrol a student
    AddStudent {
        admission_number: String,
        first_name: String,
        last_name: String,
        phone_number: String,
        #[arg(long, default_value = "+91")]
        country_code: String,
        #[arg(long)]
        parent_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Soft-remove a student; their fee history is kept
    Deactivate { admission_number: String },
    /// Restore a deactivated student
    Reactivate { admission_number: String },
    /// List fee records, newest first
    Fees {
        #[arg(long)]
        search: Option<String>,
        /// pending or settled
        #[arg(long)]
        status: Option<FeeStatus>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Charge a student for a billing period
    AddFee {
        admission_number: String,
        amount: f64,
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Flip a fee record between pending and settled
    ToggleFee { id: i64 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Initialize database
    let db = database::create_connection(&app_config.database_url).await?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;
    let store: Arc<dyn FeeStore> = Arc::new(SeaOrmStore::new(db));

    // 5. Seed configured students
    student::seed_students(store.as_ref(), &app_config.studio.students).await?;

    // 6. Wire the dispatcher
    let sender = LogSender::from_config(&app_config.studio.notifier)?;
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        Arc::new(sender),
        Arc::new(ReminderLedger::new()),
        app_config.studio.reminder.clone(),
    );

    run(cli.command, store.as_ref(), &dispatcher).await
}

async fn run(command: Command, store: &dyn FeeStore, dispatcher: &Dispatcher) -> Result<()> {
    match command {
        Command::Summary { period } => {
            let summary = report::dashboard(store, period.resolve()?).await?;
            println!("Summary for {}", summary.period);
            println!("  Active students:     {}", summary.active_students);
            println!(
                "  Due this month:      {}",
                format_amount(summary.due_this_period)
            );
            println!(
                "  Total outstanding:   {}",
                format_amount(summary.total_outstanding)
            );
            println!(
                "  Received this month: {}",
                format_amount(summary.received_this_period)
            );
        }
        Command::Unpaid { period } => {
            let period = period.resolve()?;
            let pending = dispatcher.pending_reminders(period).await?;
            println!("Unpaid fees for {period}: {} students", pending.len());
            for row in pending {
                let reminded = row
                    .reminder
                    .sent_at
                    .map_or_else(|| "not reminded".to_string(), |at| format!("reminded {at}"));
                println!(
                    "{:<12} {:<28} {}{} {:>10}  {}",
                    row.balance.admission_number,
                    row.balance.student_name,
                    row.balance.mobile_number.country_code,
                    row.balance.mobile_number.number,
                    format_amount(row.balance.amount_due),
                    reminded
                );
            }
        }
        Command::Remind {
            admission_number,
            period,
        } => {
            let period = period.resolve()?;
            let target = student::get_student(store, &admission_number).await?;
            let result = dispatcher.send_one(target.id, period).await;
            print_result(&target.admission_number, &result);
        }
        Command::RemindAll { period } => {
            let period = period.resolve()?;
            let results = dispatcher.send_all_pending(period).await?;
            let roster = store.list_students().await?;
            for result in &results {
                let label = roster
                    .iter()
                    .find(|s| s.id == result.student_id)
                    .map_or_else(|| result.student_id.to_string(), |s| s.admission_number.clone());
                print_result(&label, result);
            }
            let delivered = results.iter().filter(|r| r.success).count();
            println!("{delivered} of {} reminders delivered", results.len());
        }
        Command::Students { query, all } => {
            let students =
                student::search_students(store, query.as_deref().unwrap_or_default(), all).await?;
            for s in students {
                println!(
                    "{:<12} {:<28} {}{}{}",
                    s.admission_number,
                    s.full_name(),
                    s.country_code,
                    s.phone_number,
                    if s.is_active { "" } else { "  (inactive)" }
                );
            }
        }
        Command::AddStudent {
            admission_number,
            first_name,
            last_name,
            phone_number,
            country_code,
            parent_name,
            email,
        } => {
            let created = student::add_student(
                store,
                NewStudent {
                    admission_number,
                    first_name,
                    last_name,
                    country_code,
                    phone_number,
                    parent_name,
                    email,
                },
            )
            .await?;
            println!(
                "Enrolled {} ({})",
                created.full_name(),
                created.admission_number
            );
        }
        Command::Deactivate { admission_number } => {
            let updated = student::deactivate_student(store, &admission_number).await?;
            println!("{} deactivated", updated.admission_number);
        }
        Command::Reactivate { admission_number } => {
            let updated = student::reactivate_student(store, &admission_number).await?;
            println!("{} reactivated", updated.admission_number);
        }
        Command::Fees {
            search,
            status,
            month,
            year,
        } => {
            let query = FeeQuery {
                search,
                status,
                month,
                year,
            };
            for view in fee::list_fees(store, &query).await? {
                println!(
                    "{} {:<12} {:<28} {:>10} {:<8} {} {}",
                    view.reference,
                    view.admission_number,
                    view.student_name,
                    format_amount(view.amount),
                    view.status,
                    fee::month_name(view.month).unwrap_or("?"),
                    view.year
                );
            }
        }
        Command::AddFee {
            admission_number,
            amount,
            period,
        } => {
            let period = period.resolve()?;
            let record = fee::add_fee(store, &admission_number, amount, period).await?;
            println!(
                "{} added: {} for {}",
                fee::fee_reference(record.id),
                format_amount(record.amount),
                period
            );
        }
        Command::ToggleFee { id } => {
            let record = fee::toggle_fee_status(store, id).await?;
            println!("{} is now {}", fee::fee_reference(record.id), record.status);
        }
    }
    Ok(())
}

fn print_result(label: &str, result: &DispatchResult) {
    match &result.outcome {
        DispatchOutcome::Sent => println!(
            "{label}: sent ({})",
            result.delivery_id.as_deref().unwrap_or_default()
        ),
        DispatchOutcome::AlreadySent => println!(
            "{label}: already reminded ({})",
            result.delivery_id.as_deref().unwrap_or_default()
        ),
        DispatchOutcome::NothingDue => println!("{label}: nothing due"),
        DispatchOutcome::InFlight => println!("{label}: reminder already in progress"),
        DispatchOutcome::Failed { kind, message } => {
            println!("{label}: failed ({kind:?}): {message}");
        }
    }
}
