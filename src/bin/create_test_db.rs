use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use ledger_ingest::{create_transactions, initialize_db, parse_csv};

/// A utility for creating a test database for the REST API server of ledger_ingest.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// A transaction CSV file to seed the database with.
    #[arg(long, short)]
    csv_path: Option<String>,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    if let Some(csv_path) = args.csv_path {
        println!("Importing transactions from {csv_path:?}...");

        let transactions = parse_csv(File::open(&csv_path)?)?;
        let count = create_transactions(&transactions, &conn)?;

        println!("Imported {count} transactions");
    }

    println!("Success!");

    Ok(())
}
