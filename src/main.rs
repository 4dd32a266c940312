use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use stadeplan::config::Config;
use stadeplan::hierarchy::Hierarchy;
use stadeplan::model::fmt_minute;
use stadeplan::notify::NotifyHub;
use stadeplan::repository::FileRepository;
use stadeplan::scheduler::grid::{Cell, DayGrid, NoCategories};
use stadeplan::scheduler::Scheduler;

/// Print the week containing the given date (default: today) as text grids.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    stadeplan::observability::init(config.metrics_port);

    let day = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")?,
        None => chrono::Local::now().date_naive(),
    };

    let hierarchy = Hierarchy::load_json(&config.hierarchy_path)?;
    let notify = Arc::new(NotifyHub::new());
    let repo = Arc::new(FileRepository::open(&config.data_dir, &config.store, notify)?);
    info!("store: {}", repo.path().display());

    let scheduler = Scheduler::open(hierarchy, repo, config.scheduler)?;
    for (a, b) in scheduler.overlaps() {
        tracing::warn!("overlapping bookings {a} and {b}");
    }

    let week = scheduler.week_grid(day, &NoCategories);
    for plan in &week.days {
        println!("== {}", plan.training.date.format("%A %Y-%m-%d"));
        print_grid("entrainement", &plan.training);
        if !plan.matches.slots.is_empty() {
            print_grid("match", &plan.matches);
        }
    }
    Ok(())
}

fn print_grid(title: &str, grid: &DayGrid) {
    const WIDTH: usize = 14;
    print!("{title:<8}");
    for column in &grid.columns {
        print!("|{:<WIDTH$.WIDTH$}", column.header);
    }
    println!();
    for (row, slot) in grid.slots.iter().enumerate() {
        print!("{:<8}", fmt_minute(*slot));
        for cell in &grid.cells[row] {
            let text = match cell {
                Cell::Empty => String::new(),
                Cell::Start { style, row_span, .. } => format!("{} ({row_span})", style.label),
                Cell::Covered { .. } => "  \"".to_string(),
            };
            print!("|{text:<WIDTH$.WIDTH$}");
        }
        println!();
    }
}
